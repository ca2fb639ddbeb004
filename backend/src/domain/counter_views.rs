//! Read-side projections of counters.

use chrono::{DateTime, Duration, Utc};

use super::{BranchCode, BranchId, BranchListItem, Counter, CounterId, CounterNumber, Derived, DeviceId, UserId};

/// How recently a device must have been seen for its user to count as current.
pub const CURRENT_USER_WINDOW_MINUTES: i64 = 30;

/// Latest session reported for a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSession {
    pub user_id: UserId,
    pub user_email: String,
    pub user_name: String,
    pub last_seen: DateTime<Utc>,
}

/// Keep `session` only if it was seen within the current-user window.
///
/// # Examples
/// ```
/// use backend::domain::{DeviceSession, UserId, current_session};
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let session = DeviceSession {
///     user_id: UserId::random(),
///     user_email: "desk@clinic.test".into(),
///     user_name: "Desk".into(),
///     last_seen: now - Duration::minutes(45),
/// };
/// assert!(current_session(Some(session), now).is_none());
/// ```
pub fn current_session(session: Option<DeviceSession>, now: DateTime<Utc>) -> Option<DeviceSession> {
    let cutoff = now - Duration::minutes(CURRENT_USER_WINDOW_MINUTES);
    session.filter(|session| session.last_seen >= cutoff)
}

/// Full projection of a counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterDetail {
    pub counter: Counter,
    pub branch: BranchListItem,
    pub current_user: Derived<Option<DeviceSession>>,
}

/// Lighter projection used by listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterListItem {
    pub counter: Counter,
    pub branch_name: String,
    pub branch_code: BranchCode,
}

/// Device assignment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterAssignment {
    pub device_id: DeviceId,
    pub force: bool,
}

/// Usage aggregates reported by the transactions collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterUsage {
    pub transactions_today: u64,
    pub transactions_week: u64,
    pub transactions_total: u64,
    pub current_user_id: Option<UserId>,
    pub last_user_id: Option<UserId>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub average_transaction_seconds: f64,
    pub peak_usage_hour: Option<String>,
}

/// Stats projection of a counter.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterStats {
    pub id: CounterId,
    pub number: CounterNumber,
    pub name: String,
    pub branch_id: BranchId,
    pub usage: Derived<CounterUsage>,
}
