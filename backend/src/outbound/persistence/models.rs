//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions back into domain types
//! re-validate the stored values so a corrupted row surfaces as a query
//! error rather than an invalid aggregate.

use chrono::{DateTime, NaiveTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    AuditStamp, Branch, BranchCode, BranchConfiguration, BranchId, Counter, CounterId,
    CounterNumber, DeviceId, EodLock, StoredBranchConfiguration, UserId,
};

use super::schema::{branch_configurations, branches, counters};

/// A stored row that no longer satisfies the domain invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored {table} row {id} is invalid: {reason}")]
pub(crate) struct InvalidRow {
    table: &'static str,
    id: Uuid,
    reason: String,
}

impl InvalidRow {
    fn new(table: &'static str, id: Uuid, reason: impl ToString) -> Self {
        Self {
            table,
            id,
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

/// Full branch row, used for reads, inserts and whole-row updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = branches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct BranchRow {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub address: String,
    pub phone: String,
    pub email: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub is_active: bool,
    pub eod_locked_at: Option<DateTime<Utc>>,
    pub eod_locked_by: Option<Uuid>,
    pub last_eod_locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<&Branch> for BranchRow {
    fn from(branch: &Branch) -> Self {
        let (eod_locked_at, eod_locked_by) = match &branch.eod_lock {
            Some(lock) => (Some(lock.locked_at), lock.locked_by.map(|id| *id.as_uuid())),
            None => (None, None),
        };
        Self {
            id: *branch.id.as_uuid(),
            name: branch.name.clone(),
            code: branch.code.as_str().to_owned(),
            address: branch.address.clone(),
            phone: branch.phone.clone(),
            email: branch.email.clone(),
            city: branch.city.clone(),
            state: branch.state.clone(),
            latitude: branch.latitude,
            longitude: branch.longitude,
            opening_time: branch.opening_time,
            closing_time: branch.closing_time,
            is_active: branch.is_active,
            eod_locked_at,
            eod_locked_by,
            last_eod_locked_at: branch.last_locked_at,
            created_at: branch.audit.created_at,
            updated_at: branch.audit.updated_at,
            created_by: branch.audit.created_by.map(|id| *id.as_uuid()),
            updated_by: branch.audit.updated_by.map(|id| *id.as_uuid()),
            deleted_at: branch.deleted_at,
        }
    }
}

impl TryFrom<BranchRow> for Branch {
    type Error = InvalidRow;

    fn try_from(row: BranchRow) -> Result<Self, Self::Error> {
        let code = BranchCode::parse(&row.code).map_err(|err| InvalidRow::new("branches", row.id, err))?;
        let eod_lock = row.eod_locked_at.map(|locked_at| EodLock {
            locked_at,
            locked_by: row.eod_locked_by.map(UserId::from_uuid),
        });
        Ok(Self {
            id: BranchId::new(row.id),
            name: row.name,
            code,
            address: row.address,
            phone: row.phone,
            email: row.email,
            city: row.city,
            state: row.state,
            latitude: row.latitude,
            longitude: row.longitude,
            opening_time: row.opening_time,
            closing_time: row.closing_time,
            is_active: row.is_active,
            eod_lock,
            last_locked_at: row.last_eod_locked_at,
            audit: AuditStamp {
                created_at: row.created_at,
                updated_at: row.updated_at,
                created_by: row.created_by.map(UserId::from_uuid),
                updated_by: row.updated_by.map(UserId::from_uuid),
            },
            deleted_at: row.deleted_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = counters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct CounterRow {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub counter_number: i32,
    pub name: String,
    pub device_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Counter> for CounterRow {
    fn from(counter: &Counter) -> Self {
        Self {
            id: *counter.id.as_uuid(),
            branch_id: *counter.branch_id.as_uuid(),
            counter_number: counter.number.get(),
            name: counter.name.clone(),
            device_id: counter.device_id.as_ref().map(|id| id.as_str().to_owned()),
            is_active: counter.is_active,
            created_at: counter.created_at,
            updated_at: counter.updated_at,
        }
    }
}

impl TryFrom<CounterRow> for Counter {
    type Error = InvalidRow;

    fn try_from(row: CounterRow) -> Result<Self, Self::Error> {
        let number = CounterNumber::new(i64::from(row.counter_number))
            .map_err(|err| InvalidRow::new("counters", row.id, err))?;
        let device_id = row
            .device_id
            .as_deref()
            .map(DeviceId::parse)
            .transpose()
            .map_err(|err| InvalidRow::new("counters", row.id, err))?;
        Ok(Self {
            id: CounterId::new(row.id),
            branch_id: BranchId::new(row.branch_id),
            number,
            name: row.name,
            device_id,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Branch configurations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = branch_configurations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(primary_key(branch_id))]
pub(crate) struct ConfigurationRow {
    pub branch_id: Uuid,
    pub configuration: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl ConfigurationRow {
    pub(crate) fn from_stored(
        stored: &StoredBranchConfiguration,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            branch_id: *stored.branch_id.as_uuid(),
            configuration: serde_json::to_value(&stored.configuration)?,
            updated_at: stored.updated_at,
        })
    }
}

impl TryFrom<ConfigurationRow> for StoredBranchConfiguration {
    type Error = InvalidRow;

    fn try_from(row: ConfigurationRow) -> Result<Self, Self::Error> {
        let configuration: BranchConfiguration = serde_json::from_value(row.configuration)
            .map_err(|err| InvalidRow::new("branch_configurations", row.branch_id, err))?;
        Ok(Self {
            branch_id: BranchId::new(row.branch_id),
            configuration,
            updated_at: row.updated_at,
        })
    }
}
