//! Driving port for counter writes.

use async_trait::async_trait;

use crate::domain::{
    CounterAssignment, CounterChanges, CounterDetail, CounterDraft, CounterId, Error, UserId,
};

/// Counter write operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterCommand: Send + Sync {
    /// Create a counter in an existing branch.
    ///
    /// # Errors
    ///
    /// Field-scoped `invalid_request` for a missing branch, a non-positive or
    /// duplicate number, or a device held by another counter.
    async fn create(&self, actor: &UserId, draft: CounterDraft) -> Result<CounterDetail, Error>;

    async fn update(
        &self,
        actor: &UserId,
        id: &CounterId,
        changes: CounterChanges,
    ) -> Result<CounterDetail, Error>;

    /// Bind a device to the counter. With `force`, the device is first
    /// detached from whichever counter holds it.
    async fn assign_device(
        &self,
        actor: &UserId,
        id: &CounterId,
        assignment: CounterAssignment,
    ) -> Result<CounterDetail, Error>;
}
