//! Port for branch activity owned by other services.
//!
//! Staff memberships, appointments, patients and payments live in tables this
//! service does not manage. Adapters report a missing relation as
//! [`BranchActivityQueryError::Unavailable`]; callers degrade the affected
//! derived fields instead of failing the request.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{AppointmentTotals, BranchId, PaymentTotals};

use super::define_port_error;

define_port_error! {
    /// Errors raised by branch activity adapters.
    pub enum BranchActivityQueryError {
        /// The backing relation does not exist or cannot be reached.
        Unavailable { message: String } =>
            "branch activity source unavailable: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "branch activity query failed: {message}",
    }
}

/// Read-only counts and aggregates about branch activity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BranchActivityQuery: Send + Sync {
    /// Active staff members per branch. Branches without staff are absent.
    async fn active_staff_counts(
        &self,
        branch_ids: &[BranchId],
    ) -> Result<HashMap<BranchId, u64>, BranchActivityQueryError>;

    /// Appointments on `day` in status scheduled or confirmed, per branch.
    async fn appointment_counts(
        &self,
        branch_ids: &[BranchId],
        day: NaiveDate,
    ) -> Result<HashMap<BranchId, u64>, BranchActivityQueryError>;

    /// Patient and appointment aggregates for one branch.
    async fn appointment_totals(
        &self,
        branch_id: &BranchId,
        today: NaiveDate,
    ) -> Result<AppointmentTotals, BranchActivityQueryError>;

    /// Revenue and pending payment aggregates for one branch. Reads only
    /// the payments source, so it degrades independently of appointments.
    async fn payment_totals(
        &self,
        branch_id: &BranchId,
        today: NaiveDate,
    ) -> Result<PaymentTotals, BranchActivityQueryError>;
}

/// Fixture implementation reporting no activity.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureBranchActivityQuery;

#[async_trait]
impl BranchActivityQuery for FixtureBranchActivityQuery {
    async fn active_staff_counts(
        &self,
        _branch_ids: &[BranchId],
    ) -> Result<HashMap<BranchId, u64>, BranchActivityQueryError> {
        Ok(HashMap::new())
    }

    async fn appointment_counts(
        &self,
        _branch_ids: &[BranchId],
        _day: NaiveDate,
    ) -> Result<HashMap<BranchId, u64>, BranchActivityQueryError> {
        Ok(HashMap::new())
    }

    async fn appointment_totals(
        &self,
        _branch_id: &BranchId,
        _today: NaiveDate,
    ) -> Result<AppointmentTotals, BranchActivityQueryError> {
        Ok(AppointmentTotals::default())
    }

    async fn payment_totals(
        &self,
        _branch_id: &BranchId,
        _today: NaiveDate,
    ) -> Result<PaymentTotals, BranchActivityQueryError> {
        Ok(PaymentTotals::default())
    }
}
