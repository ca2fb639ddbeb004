//! Driving port for counter reads.

use async_trait::async_trait;

use crate::domain::{BranchId, CounterDetail, CounterId, CounterListItem, CounterStats, Error};

/// Counter read operations and projections.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterQuery: Send + Sync {
    async fn get(&self, id: &CounterId) -> Result<CounterDetail, Error>;

    /// Counters of live branches, optionally restricted to one branch.
    async fn list(&self, branch_id: Option<BranchId>) -> Result<Vec<CounterListItem>, Error>;

    async fn stats(&self, id: &CounterId) -> Result<CounterStats, Error>;
}
