//! Shared builders for domain unit tests.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use mockable::Clock;

use super::{
    AuditStamp, Branch, BranchCode, BranchDraft, BranchId, Counter, CounterId, CounterNumber,
    DeviceId,
};

pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 0)
        .single()
        .expect("fixture timestamp is valid")
}

pub(crate) fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

pub(crate) struct FixtureClock {
    pub(crate) utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_timestamp(),
    })
}

pub(crate) fn branch_draft(code: &str) -> BranchDraft {
    BranchDraft {
        name: "Main Branch".to_owned(),
        code: code.to_owned(),
        address: "12 MG Road".to_owned(),
        phone: "+91 80 5555 0100".to_owned(),
        email: Some("main@clinic.test".to_owned()),
        city: Some("Bengaluru".to_owned()),
        state: Some("Karnataka".to_owned()),
        latitude: None,
        longitude: None,
        opening_time: hm(9, 0),
        closing_time: hm(18, 0),
        is_active: true,
    }
}

pub(crate) fn branch(code: &str) -> Branch {
    let draft = branch_draft(code);
    Branch {
        id: BranchId::random(),
        name: draft.name,
        code: BranchCode::parse(code).expect("fixture code is valid"),
        address: draft.address,
        phone: draft.phone,
        email: draft.email,
        city: draft.city,
        state: draft.state,
        latitude: None,
        longitude: None,
        opening_time: draft.opening_time,
        closing_time: draft.closing_time,
        is_active: true,
        eod_lock: None,
        last_locked_at: None,
        audit: AuditStamp::created(fixture_timestamp(), None),
        deleted_at: None,
    }
}

pub(crate) fn counter(branch_id: BranchId, number: i64, device: Option<&str>) -> Counter {
    Counter {
        id: CounterId::random(),
        branch_id,
        number: CounterNumber::new(number).expect("fixture number is valid"),
        name: format!("Counter {number}"),
        device_id: device.map(|raw| DeviceId::parse(raw).expect("fixture device is valid")),
        is_active: true,
        created_at: fixture_timestamp(),
        updated_at: fixture_timestamp(),
    }
}
