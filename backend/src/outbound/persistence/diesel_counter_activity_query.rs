//! Raw SQL reads of device sessions and counter transactions.
//!
//! Tables read here:
//! - `device_sessions(device_id, user_id, last_seen)`
//! - `counter_transactions(counter_id, user_id, started_at, completed_at)`
//! - `users(id, email, first_name, last_name)`

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Date, Double, Integer, Nullable, Text, Timestamptz, Uuid as SqlUuid};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{CounterActivityQuery, CounterActivityQueryError};
use crate::domain::{CounterId, CounterUsage, DeviceId, DeviceSession, UserId};

use super::diesel_error_mapping::StoreFailure;
use super::pool::DbPool;

const LATEST_SESSION_SQL: &str = "\
SELECT s.user_id,
       u.email AS user_email,
       COALESCE(NULLIF(TRIM(CONCAT_WS(' ', u.first_name, u.last_name)), ''), u.email) AS user_name,
       s.last_seen
FROM device_sessions s
JOIN users u ON u.id = s.user_id
WHERE s.device_id = $1
ORDER BY s.last_seen DESC
LIMIT 1";

const USAGE_SQL: &str = "\
SELECT
  (SELECT COUNT(*) FROM counter_transactions
    WHERE counter_id = $1 AND (started_at AT TIME ZONE 'UTC')::date = $2)
    AS transactions_today,
  (SELECT COUNT(*) FROM counter_transactions
    WHERE counter_id = $1
      AND (started_at AT TIME ZONE 'UTC')::date BETWEEN $2 - 6 AND $2)
    AS transactions_week,
  (SELECT COUNT(*) FROM counter_transactions WHERE counter_id = $1)
    AS transactions_total,
  (SELECT user_id FROM counter_transactions
    WHERE counter_id = $1 AND completed_at IS NULL
    ORDER BY started_at DESC LIMIT 1)
    AS current_user_id,
  (SELECT user_id FROM counter_transactions
    WHERE counter_id = $1 ORDER BY started_at DESC LIMIT 1)
    AS last_user_id,
  (SELECT MAX(started_at) FROM counter_transactions WHERE counter_id = $1)
    AS last_used_at,
  (SELECT COALESCE(AVG(EXTRACT(EPOCH FROM completed_at - started_at)), 0)::float8
    FROM counter_transactions
    WHERE counter_id = $1 AND completed_at IS NOT NULL)
    AS average_transaction_seconds,
  (SELECT EXTRACT(HOUR FROM started_at AT TIME ZONE 'UTC')::int4
    FROM counter_transactions WHERE counter_id = $1
    GROUP BY 1 ORDER BY COUNT(*) DESC, 1 LIMIT 1)
    AS peak_hour";

#[derive(Debug, QueryableByName)]
struct SessionRow {
    #[diesel(sql_type = SqlUuid)]
    user_id: Uuid,
    #[diesel(sql_type = Text)]
    user_email: String,
    #[diesel(sql_type = Text)]
    user_name: String,
    #[diesel(sql_type = Timestamptz)]
    last_seen: DateTime<Utc>,
}

impl From<SessionRow> for DeviceSession {
    fn from(row: SessionRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            user_email: row.user_email,
            user_name: row.user_name,
            last_seen: row.last_seen,
        }
    }
}

#[derive(Debug, QueryableByName)]
struct UsageRow {
    #[diesel(sql_type = BigInt)]
    transactions_today: i64,
    #[diesel(sql_type = BigInt)]
    transactions_week: i64,
    #[diesel(sql_type = BigInt)]
    transactions_total: i64,
    #[diesel(sql_type = Nullable<SqlUuid>)]
    current_user_id: Option<Uuid>,
    #[diesel(sql_type = Nullable<SqlUuid>)]
    last_user_id: Option<Uuid>,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    last_used_at: Option<DateTime<Utc>>,
    #[diesel(sql_type = Double)]
    average_transaction_seconds: f64,
    #[diesel(sql_type = Nullable<Integer>)]
    peak_hour: Option<i32>,
}

/// Render an hour of day as `HH:00`.
fn hour_label(hour: i32) -> String {
    format!("{hour:02}:00")
}

impl From<UsageRow> for CounterUsage {
    fn from(row: UsageRow) -> Self {
        let count = |value: i64| u64::try_from(value).unwrap_or_default();
        Self {
            transactions_today: count(row.transactions_today),
            transactions_week: count(row.transactions_week),
            transactions_total: count(row.transactions_total),
            current_user_id: row.current_user_id.map(UserId::from_uuid),
            last_user_id: row.last_user_id.map(UserId::from_uuid),
            last_used_at: row.last_used_at,
            average_transaction_seconds: row.average_transaction_seconds,
            peak_usage_hour: row.peak_hour.map(hour_label),
        }
    }
}

/// Diesel-backed implementation of the `CounterActivityQuery` port.
#[derive(Clone)]
pub struct DieselCounterActivityQuery {
    pool: DbPool,
}

impl DieselCounterActivityQuery {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_error(error: impl Into<StoreFailure>) -> CounterActivityQueryError {
    match error.into() {
        StoreFailure::Connection(message) | StoreFailure::MissingRelation(message) => {
            CounterActivityQueryError::unavailable(message)
        }
        StoreFailure::Query(message) => CounterActivityQueryError::query(message),
        StoreFailure::UniqueViolation { .. } => {
            CounterActivityQueryError::query("unexpected unique violation on read")
        }
    }
}

#[async_trait]
impl CounterActivityQuery for DieselCounterActivityQuery {
    async fn latest_session(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<DeviceSession>, CounterActivityQueryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let row: Option<SessionRow> = diesel::sql_query(LATEST_SESSION_SQL)
            .bind::<Text, _>(device_id.as_str())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        Ok(row.map(DeviceSession::from))
    }

    async fn usage(
        &self,
        counter_id: &CounterId,
        today: NaiveDate,
    ) -> Result<CounterUsage, CounterActivityQueryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let row: UsageRow = diesel::sql_query(USAGE_SQL)
            .bind::<SqlUuid, _>(*counter_id.as_uuid())
            .bind::<Date, _>(today)
            .get_result(&mut conn)
            .await
            .map_err(map_error)?;
        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "00:00")]
    #[case(9, "09:00")]
    #[case(17, "17:00")]
    fn peak_hour_is_zero_padded(#[case] hour: i32, #[case] expected: &str) {
        assert_eq!(hour_label(hour), expected);
    }

    #[rstest]
    fn idle_counter_has_no_users() {
        let usage = CounterUsage::from(UsageRow {
            transactions_today: 0,
            transactions_week: 0,
            transactions_total: 0,
            current_user_id: None,
            last_user_id: None,
            last_used_at: None,
            average_transaction_seconds: 0.0,
            peak_hour: None,
        });
        assert_eq!(usage, CounterUsage::default());
    }

    #[rstest]
    fn missing_session_table_is_unavailable() {
        let failure =
            StoreFailure::MissingRelation("relation \"device_sessions\" does not exist".to_owned());
        assert!(matches!(
            map_error(failure),
            CounterActivityQueryError::Unavailable { .. }
        ));
    }
}
