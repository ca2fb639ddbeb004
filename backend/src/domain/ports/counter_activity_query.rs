//! Port for device sessions and counter transactions.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{CounterId, CounterUsage, DeviceId, DeviceSession};

use super::define_port_error;

define_port_error! {
    /// Errors raised by counter activity adapters.
    pub enum CounterActivityQueryError {
        /// The backing relation does not exist or cannot be reached.
        Unavailable { message: String } =>
            "counter activity source unavailable: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "counter activity query failed: {message}",
    }
}

/// Read-only access to device sessions and counter usage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterActivityQuery: Send + Sync {
    /// Most recently seen session for `device_id`.
    async fn latest_session(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<DeviceSession>, CounterActivityQueryError>;

    /// Transaction aggregates for one counter.
    async fn usage(
        &self,
        counter_id: &CounterId,
        today: NaiveDate,
    ) -> Result<CounterUsage, CounterActivityQueryError>;
}

/// Fixture implementation reporting no sessions and no usage.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCounterActivityQuery;

#[async_trait]
impl CounterActivityQuery for FixtureCounterActivityQuery {
    async fn latest_session(
        &self,
        _device_id: &DeviceId,
    ) -> Result<Option<DeviceSession>, CounterActivityQueryError> {
        Ok(None)
    }

    async fn usage(
        &self,
        _counter_id: &CounterId,
        _today: NaiveDate,
    ) -> Result<CounterUsage, CounterActivityQueryError> {
        Ok(CounterUsage::default())
    }
}
