//! Port for counter persistence.
//!
//! Storage constraints back both uniqueness rules: `(branch_id,
//! counter_number)` and `device_id`. Adapters translate violations into
//! [`CounterRepositoryError::DuplicateNumber`] and
//! [`CounterRepositoryError::DuplicateDevice`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{BranchId, Counter, CounterId, CounterNumber, DeviceId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by counter repository adapters.
    pub enum CounterRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "counter repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "counter repository query failed: {message}",
        /// The branch already has a counter with this number.
        DuplicateNumber { number: i32 } =>
            "counter number {number} is already used in this branch",
        /// Another counter holds the device.
        DuplicateDevice { device_id: String } =>
            "device {device_id} is already assigned",
    }
}

/// Port for counter storage and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterRepository: Send + Sync {
    async fn find_by_id(&self, id: &CounterId) -> Result<Option<Counter>, CounterRepositoryError>;

    /// Counter holding `number` in `branch_id`, if any.
    async fn find_by_number(
        &self,
        branch_id: &BranchId,
        number: CounterNumber,
    ) -> Result<Option<CounterId>, CounterRepositoryError>;

    /// Counter holding `device_id`, if any.
    async fn find_by_device(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<CounterId>, CounterRepositoryError>;

    /// Counters of live branches, optionally restricted to one branch,
    /// ordered by branch then number.
    async fn list(&self, branch_id: Option<BranchId>) -> Result<Vec<Counter>, CounterRepositoryError>;

    /// Number of active counters per branch. Branches without any are absent.
    async fn active_counts(
        &self,
        branch_ids: &[BranchId],
    ) -> Result<HashMap<BranchId, u64>, CounterRepositoryError>;

    async fn insert(&self, counter: &Counter) -> Result<(), CounterRepositoryError>;

    async fn update(&self, counter: &Counter) -> Result<(), CounterRepositoryError>;

    /// Move `device_id` onto `to`, detaching it from `from` first. Both
    /// writes commit together.
    async fn reassign_device(
        &self,
        device_id: &DeviceId,
        from: Option<CounterId>,
        to: CounterId,
        at: DateTime<Utc>,
    ) -> Result<(), CounterRepositoryError>;

    /// Counters updated after `since` (all when `None`).
    async fn list_changed_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Counter>, CounterRepositoryError>;
}

/// Fixture implementation holding no counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCounterRepository;

#[async_trait]
impl CounterRepository for FixtureCounterRepository {
    async fn find_by_id(&self, _id: &CounterId) -> Result<Option<Counter>, CounterRepositoryError> {
        Ok(None)
    }

    async fn find_by_number(
        &self,
        _branch_id: &BranchId,
        _number: CounterNumber,
    ) -> Result<Option<CounterId>, CounterRepositoryError> {
        Ok(None)
    }

    async fn find_by_device(
        &self,
        _device_id: &DeviceId,
    ) -> Result<Option<CounterId>, CounterRepositoryError> {
        Ok(None)
    }

    async fn list(&self, _branch_id: Option<BranchId>) -> Result<Vec<Counter>, CounterRepositoryError> {
        Ok(Vec::new())
    }

    async fn active_counts(
        &self,
        _branch_ids: &[BranchId],
    ) -> Result<HashMap<BranchId, u64>, CounterRepositoryError> {
        Ok(HashMap::new())
    }

    async fn insert(&self, _counter: &Counter) -> Result<(), CounterRepositoryError> {
        Ok(())
    }

    async fn update(&self, _counter: &Counter) -> Result<(), CounterRepositoryError> {
        Ok(())
    }

    async fn reassign_device(
        &self,
        _device_id: &DeviceId,
        _from: Option<CounterId>,
        _to: CounterId,
        _at: DateTime<Utc>,
    ) -> Result<(), CounterRepositoryError> {
        Ok(())
    }

    async fn list_changed_since(
        &self,
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Counter>, CounterRepositoryError> {
        Ok(Vec::new())
    }
}
