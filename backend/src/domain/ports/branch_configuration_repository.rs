//! Port for per-branch configuration documents.

use async_trait::async_trait;

use crate::domain::{BranchId, StoredBranchConfiguration};

use super::define_port_error;

define_port_error! {
    /// Errors raised by configuration repository adapters.
    pub enum BranchConfigurationRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "configuration repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "configuration repository query failed: {message}",
    }
}

/// Storage for branch configuration documents, one per branch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BranchConfigurationRepository: Send + Sync {
    /// Stored configuration, or `None` when the branch still uses defaults.
    async fn find(
        &self,
        branch_id: &BranchId,
    ) -> Result<Option<StoredBranchConfiguration>, BranchConfigurationRepositoryError>;

    /// Insert or replace the branch's configuration.
    async fn save(
        &self,
        configuration: &StoredBranchConfiguration,
    ) -> Result<(), BranchConfigurationRepositoryError>;
}

/// Fixture implementation that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureBranchConfigurationRepository;

#[async_trait]
impl BranchConfigurationRepository for FixtureBranchConfigurationRepository {
    async fn find(
        &self,
        _branch_id: &BranchId,
    ) -> Result<Option<StoredBranchConfiguration>, BranchConfigurationRepositoryError> {
        Ok(None)
    }

    async fn save(
        &self,
        _configuration: &StoredBranchConfiguration,
    ) -> Result<(), BranchConfigurationRepositoryError> {
        Ok(())
    }
}
