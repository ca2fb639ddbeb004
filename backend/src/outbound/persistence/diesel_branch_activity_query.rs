//! Raw SQL reads of staff, appointment and payment tables owned by other
//! services.
//!
//! Tables read here:
//! - `staff_memberships(branch_id, user_id, is_active)`
//! - `appointments(branch_id, patient_id, appointment_date, status)`
//! - `payments(branch_id, amount, status, paid_at)`
//!
//! A missing relation is reported as
//! [`BranchActivityQueryError::Unavailable`] so the service can degrade the
//! derived fields instead of failing. Appointment and payment aggregates are
//! separate statements so one missing table leaves the other readable.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sql_types::{Array, BigInt, Date, Nullable, Numeric, Uuid as SqlUuid};
use diesel_async::RunQueryDsl;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::ports::{BranchActivityQuery, BranchActivityQueryError};
use crate::domain::{AppointmentTotals, BranchId, PaymentTotals};

use super::diesel_error_mapping::StoreFailure;
use super::pool::DbPool;

/// Default daily capacity when a branch has no stored configuration.
const DEFAULT_DAILY_CAPACITY: i64 = 50;

const ACTIVE_STAFF_SQL: &str = "\
SELECT branch_id, COUNT(*) AS total
FROM staff_memberships
WHERE is_active AND branch_id = ANY($1)
GROUP BY branch_id";

const APPOINTMENTS_ON_DAY_SQL: &str = "\
SELECT branch_id, COUNT(*) AS total
FROM appointments
WHERE branch_id = ANY($1)
  AND appointment_date = $2
  AND status IN ('scheduled', 'confirmed')
GROUP BY branch_id";

const APPOINTMENT_TOTALS_SQL: &str = "\
SELECT
  (SELECT COUNT(DISTINCT patient_id) FROM appointments WHERE branch_id = $1)
    AS total_patients,
  (SELECT COUNT(*) FROM appointments
    WHERE branch_id = $1 AND appointment_date = $2
      AND status IN ('scheduled', 'confirmed'))
    AS appointments_today,
  (SELECT COUNT(*) FROM appointments
    WHERE branch_id = $1 AND appointment_date BETWEEN $2 - 6 AND $2)
    AS appointments_week,
  (SELECT COUNT(*) FROM appointments
    WHERE branch_id = $1 AND appointment_date BETWEEN $2 - 29 AND $2)
    AS appointments_month,
  (SELECT (configuration -> 'settings' ->> 'max_daily_appointments')::int8
    FROM branch_configurations WHERE branch_id = $1)
    AS daily_capacity";

const PAYMENT_TOTALS_SQL: &str = "\
SELECT
  (SELECT COALESCE(SUM(amount), 0) FROM payments
    WHERE branch_id = $1 AND status = 'paid'
      AND (paid_at AT TIME ZONE 'UTC')::date = $2)
    AS revenue_today,
  (SELECT COALESCE(SUM(amount), 0) FROM payments
    WHERE branch_id = $1 AND status = 'paid'
      AND (paid_at AT TIME ZONE 'UTC')::date BETWEEN $2 - 6 AND $2)
    AS revenue_week,
  (SELECT COALESCE(SUM(amount), 0) FROM payments
    WHERE branch_id = $1 AND status = 'pending')
    AS pending_payments";

#[derive(Debug, QueryableByName)]
struct BranchCountRow {
    #[diesel(sql_type = SqlUuid)]
    branch_id: Uuid,
    #[diesel(sql_type = BigInt)]
    total: i64,
}

#[derive(Debug, QueryableByName)]
struct AppointmentTotalsRow {
    #[diesel(sql_type = BigInt)]
    total_patients: i64,
    #[diesel(sql_type = BigInt)]
    appointments_today: i64,
    #[diesel(sql_type = BigInt)]
    appointments_week: i64,
    #[diesel(sql_type = BigInt)]
    appointments_month: i64,
    #[diesel(sql_type = Nullable<BigInt>)]
    daily_capacity: Option<i64>,
}

#[derive(Debug, QueryableByName)]
struct PaymentTotalsRow {
    #[diesel(sql_type = Numeric)]
    revenue_today: Decimal,
    #[diesel(sql_type = Numeric)]
    revenue_week: Decimal,
    #[diesel(sql_type = Numeric)]
    pending_payments: Decimal,
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[expect(
    clippy::cast_precision_loss,
    reason = "appointment counts are far below 2^52"
)]
fn ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

impl From<AppointmentTotalsRow> for AppointmentTotals {
    fn from(row: AppointmentTotalsRow) -> Self {
        let capacity = row
            .daily_capacity
            .filter(|capacity| *capacity > 0)
            .unwrap_or(DEFAULT_DAILY_CAPACITY);
        Self {
            total_patients: count(row.total_patients),
            appointments_today: count(row.appointments_today),
            appointments_week: count(row.appointments_week),
            occupancy_rate: ratio(row.appointments_today, capacity) * 100.0,
            average_daily_appointments: ratio(row.appointments_month, 30),
        }
    }
}

impl From<PaymentTotalsRow> for PaymentTotals {
    fn from(row: PaymentTotalsRow) -> Self {
        Self {
            revenue_today: row.revenue_today,
            revenue_week: row.revenue_week,
            pending_payments: row.pending_payments,
        }
    }
}

/// Diesel-backed implementation of the `BranchActivityQuery` port.
#[derive(Clone)]
pub struct DieselBranchActivityQuery {
    pool: DbPool,
}

impl DieselBranchActivityQuery {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_error(error: impl Into<StoreFailure>) -> BranchActivityQueryError {
    match error.into() {
        StoreFailure::Connection(message) | StoreFailure::MissingRelation(message) => {
            BranchActivityQueryError::unavailable(message)
        }
        StoreFailure::Query(message) => BranchActivityQueryError::query(message),
        StoreFailure::UniqueViolation { .. } => {
            BranchActivityQueryError::query("unexpected unique violation on read")
        }
    }
}

fn to_counts(rows: Vec<BranchCountRow>) -> HashMap<BranchId, u64> {
    rows.into_iter()
        .map(|row| (BranchId::new(row.branch_id), count(row.total)))
        .collect()
}

fn uuids(ids: &[BranchId]) -> Vec<Uuid> {
    ids.iter().map(|id| *id.as_uuid()).collect()
}

#[async_trait]
impl BranchActivityQuery for DieselBranchActivityQuery {
    async fn active_staff_counts(
        &self,
        branch_ids: &[BranchId],
    ) -> Result<HashMap<BranchId, u64>, BranchActivityQueryError> {
        if branch_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let rows: Vec<BranchCountRow> = diesel::sql_query(ACTIVE_STAFF_SQL)
            .bind::<Array<SqlUuid>, _>(uuids(branch_ids))
            .load(&mut conn)
            .await
            .map_err(map_error)?;
        Ok(to_counts(rows))
    }

    async fn appointment_counts(
        &self,
        branch_ids: &[BranchId],
        day: NaiveDate,
    ) -> Result<HashMap<BranchId, u64>, BranchActivityQueryError> {
        if branch_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let rows: Vec<BranchCountRow> = diesel::sql_query(APPOINTMENTS_ON_DAY_SQL)
            .bind::<Array<SqlUuid>, _>(uuids(branch_ids))
            .bind::<Date, _>(day)
            .load(&mut conn)
            .await
            .map_err(map_error)?;
        Ok(to_counts(rows))
    }

    async fn appointment_totals(
        &self,
        branch_id: &BranchId,
        today: NaiveDate,
    ) -> Result<AppointmentTotals, BranchActivityQueryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let row: AppointmentTotalsRow = diesel::sql_query(APPOINTMENT_TOTALS_SQL)
            .bind::<SqlUuid, _>(*branch_id.as_uuid())
            .bind::<Date, _>(today)
            .get_result(&mut conn)
            .await
            .map_err(map_error)?;
        Ok(row.into())
    }

    async fn payment_totals(
        &self,
        branch_id: &BranchId,
        today: NaiveDate,
    ) -> Result<PaymentTotals, BranchActivityQueryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let row: PaymentTotalsRow = diesel::sql_query(PAYMENT_TOTALS_SQL)
            .bind::<SqlUuid, _>(*branch_id.as_uuid())
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

    fn appointment_row(today: i64, month: i64, capacity: Option<i64>) -> AppointmentTotalsRow {
        AppointmentTotalsRow {
            total_patients: 12,
            appointments_today: today,
            appointments_week: 20,
            appointments_month: month,
            daily_capacity: capacity,
        }
    }

    #[rstest]
    #[case(Some(20), 25.0)]
    #[case(None, 10.0)]
    #[case(Some(0), 10.0)]
    fn occupancy_uses_configured_capacity(#[case] capacity: Option<i64>, #[case] expected: f64) {
        let totals = AppointmentTotals::from(appointment_row(5, 60, capacity));
        assert!((totals.occupancy_rate - expected).abs() < f64::EPSILON);
    }

    #[rstest]
    fn average_covers_thirty_days() {
        let totals = AppointmentTotals::from(appointment_row(5, 60, None));
        assert!((totals.average_daily_appointments - 2.0).abs() < f64::EPSILON);
        assert_eq!(totals.total_patients, 12);
        assert_eq!(totals.appointments_week, 20);
    }

    #[rstest]
    fn payment_sums_pass_through_unrounded() {
        let totals = PaymentTotals::from(PaymentTotalsRow {
            revenue_today: Decimal::new(150_055, 3),
            revenue_week: Decimal::new(900_000, 2),
            pending_payments: Decimal::ZERO,
        });
        assert_eq!(totals.revenue_today, Decimal::new(150_055, 3));
        assert_eq!(totals.revenue_week, Decimal::new(900_000, 2));
    }

    #[rstest]
    fn only_open_appointments_count_towards_today() {
        let today_clause = APPOINTMENT_TOTALS_SQL
            .split("AS appointments_today")
            .next()
            .and_then(|head| head.rsplit("(SELECT").next())
            .expect("today sub-select");
        assert!(today_clause.contains("status IN ('scheduled', 'confirmed')"));
        assert!(!PAYMENT_TOTALS_SQL.contains("appointments"));
    }

    #[rstest]
    #[case(StoreFailure::MissingRelation("relation \"appointments\" does not exist".to_owned()))]
    #[case(StoreFailure::Connection("refused".to_owned()))]
    fn missing_tables_are_unavailable(#[case] failure: StoreFailure) {
        assert!(matches!(
            map_error(failure),
            BranchActivityQueryError::Unavailable { .. }
        ));
    }

    #[rstest]
    fn negative_counts_clamp_to_zero() {
        assert_eq!(count(-1), 0);
        assert_eq!(count(7), 7);
    }
}
