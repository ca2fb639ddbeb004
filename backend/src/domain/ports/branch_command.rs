//! Driving port for branch writes.
//!
//! Inbound adapters call [`BranchCommand`] after parsing a request body into
//! domain input. Every method takes the acting user so the service can stamp
//! audit fields and log who made the change.

use async_trait::async_trait;

use crate::domain::{
    BranchChanges, BranchConfiguration, BranchDetail, BranchDraft, BranchId, EodRequest, Error,
    StoredBranchConfiguration, UserId,
};

/// Branch write operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BranchCommand: Send + Sync {
    /// Create a branch.
    ///
    /// # Errors
    ///
    /// Field-scoped `invalid_request` when validation fails or the code is
    /// already used by a live branch.
    async fn create(&self, actor: &UserId, draft: BranchDraft) -> Result<BranchDetail, Error>;

    /// Apply a partial update, honouring the EOD lock restrictions.
    async fn update(
        &self,
        actor: &UserId,
        id: &BranchId,
        changes: BranchChanges,
    ) -> Result<BranchDetail, Error>;

    /// Soft-delete a branch.
    async fn delete(&self, actor: &UserId, id: &BranchId) -> Result<(), Error>;

    /// Lock or unlock the branch for the day.
    ///
    /// # Errors
    ///
    /// `conflict` when the branch is already in the requested state.
    async fn transition_eod(
        &self,
        actor: &UserId,
        id: &BranchId,
        request: EodRequest,
    ) -> Result<BranchDetail, Error>;

    /// Replace the branch configuration document.
    async fn save_configuration(
        &self,
        actor: &UserId,
        id: &BranchId,
        configuration: BranchConfiguration,
    ) -> Result<StoredBranchConfiguration, Error>;
}
