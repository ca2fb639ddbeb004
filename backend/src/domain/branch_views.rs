//! Read-side projections of branches.
//!
//! Derived fields sourced from external collaborators (staff memberships,
//! appointments, payments) are carried as [`Derived`] so adapters can decide
//! how to render a missing source.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use super::{Branch, BranchCode, BranchId, Derived, EodLock, UserSummary};

/// Fractional digits used for money amounts.
pub const MONEY_SCALE: u32 = 2;
/// Fractional digits used for coordinates.
pub const COORDINATE_SCALE: u32 = 6;

/// Round (half away from zero) and pad `value` to exactly `scale` fractional
/// digits.
///
/// # Examples
/// ```
/// use backend::domain::fixed_point;
/// use rust_decimal::Decimal;
///
/// let value: Decimal = "18".parse().expect("decimal");
/// assert_eq!(fixed_point(value, 2).to_string(), "18.00");
/// ```
pub fn fixed_point(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// Human-readable lock state, `"Locked at <RFC 3339>"` or `"Open"`.
pub fn eod_status_text(lock: Option<&EodLock>) -> String {
    match lock {
        Some(lock) => format!("Locked at {}", lock.locked_at.to_rfc3339()),
        None => "Open".to_owned(),
    }
}

/// Whole days between the last lock and `today`; `None` if never locked.
pub fn days_since_lock(last_locked_at: Option<DateTime<Utc>>, today: NaiveDate) -> Option<i64> {
    last_locked_at.map(|at| (today - at.date_naive()).num_days().max(0))
}

/// Full projection of a branch.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchDetail {
    pub branch: Branch,
    /// `None` when not locked or when the actor cannot be resolved.
    pub locked_by: Option<UserSummary>,
    pub active_counters: u64,
    pub active_staff: Derived<u64>,
    pub appointments_today: Derived<u64>,
}

impl BranchDetail {
    pub fn eod_status(&self) -> String {
        eod_status_text(self.branch.eod_lock.as_ref())
    }
}

/// Structured lock state used by the list projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EodStatus {
    pub locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by: Option<String>,
}

/// Lighter projection used by listings and nested inside counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchListItem {
    pub branch: Branch,
    pub locked_by_email: Option<String>,
    pub active_counters: u64,
}

impl BranchListItem {
    pub fn eod_status(&self) -> EodStatus {
        let lock = self.branch.eod_lock.as_ref();
        EodStatus {
            locked: lock.is_some(),
            locked_at: lock.map(|lock| lock.locked_at),
            locked_by: lock.and(self.locked_by_email.clone()),
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

/// Patient and appointment aggregates for one branch.
///
/// `appointments_today` counts the same statuses as the detail projection
/// (scheduled and confirmed); the week and thirty-day figures count every
/// booking regardless of status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentTotals {
    pub total_patients: u64,
    pub appointments_today: u64,
    pub appointments_week: u64,
    pub occupancy_rate: f64,
    pub average_daily_appointments: f64,
}

/// Payment aggregates for one branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentTotals {
    pub revenue_today: Decimal,
    pub revenue_week: Decimal,
    pub pending_payments: Decimal,
}

/// Stats projection of a branch.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchStats {
    pub id: BranchId,
    pub name: String,
    pub code: BranchCode,
    pub appointments: Derived<AppointmentTotals>,
    pub payments: Derived<PaymentTotals>,
    pub active_staff: Derived<u64>,
    pub active_counters: u64,
    pub is_eod_locked: bool,
    pub last_locked_at: Option<DateTime<Utc>>,
    pub days_since_last_lock: Option<i64>,
}

/// Geo projection of a branch.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchGeo {
    pub branch: Branch,
    pub appointments_today: Derived<u64>,
    pub active_staff: Derived<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::domain::fixtures::{branch, fixture_timestamp};
    use chrono::Duration;
    use rstest::rstest;

    #[rstest]
    #[case("18", 2, "18.00")]
    #[case("12.345", 2, "12.35")]
    #[case("12.355", 2, "12.36")]
    #[case("-12.345", 2, "-12.35")]
    #[case("12.344", 2, "12.34")]
    #[case("77.5946", 6, "77.594600")]
    fn fixed_point_pads_and_rounds(#[case] raw: &str, #[case] scale: u32, #[case] expected: &str) {
        let value: Decimal = raw.parse().expect("decimal");
        assert_eq!(fixed_point(value, scale).to_string(), expected);
    }

    #[rstest]
    fn status_text_reflects_lock() {
        assert_eq!(eod_status_text(None), "Open");
        let lock = EodLock {
            locked_at: fixture_timestamp(),
            locked_by: None,
        };
        assert_eq!(
            eod_status_text(Some(&lock)),
            format!("Locked at {}", fixture_timestamp().to_rfc3339())
        );
    }

    #[rstest]
    fn days_since_lock_counts_calendar_days() {
        let locked_at = fixture_timestamp() - Duration::days(3);
        let today = fixture_timestamp().date_naive();
        assert_eq!(days_since_lock(Some(locked_at), today), Some(3));
        assert_eq!(days_since_lock(None, today), None);
    }

    #[rstest]
    fn list_status_hides_email_when_open() {
        let item = BranchListItem {
            branch: branch("BR1"),
            locked_by_email: Some("stale@clinic.test".to_owned()),
            active_counters: 0,
        };
        assert_eq!(
            item.eod_status(),
            EodStatus {
                locked: false,
                locked_at: None,
                locked_by: None,
            }
        );
    }

    #[rstest]
    fn list_status_reports_lock_actor_email() {
        let mut locked = branch("BR1");
        locked.eod_lock = Some(EodLock {
            locked_at: fixture_timestamp(),
            locked_by: Some(UserId::random()),
        });
        let item = BranchListItem {
            branch: locked,
            locked_by_email: Some("manager@clinic.test".to_owned()),
            active_counters: 2,
        };

        let status = item.eod_status();
        assert!(status.locked);
        assert_eq!(status.locked_by.as_deref(), Some("manager@clinic.test"));
    }
}
