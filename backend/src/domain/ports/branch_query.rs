//! Driving port for branch reads.

use async_trait::async_trait;

use crate::domain::{
    BranchConfiguration, BranchDetail, BranchExport, BranchGeo, BranchId, BranchListItem,
    BranchSearch, BranchStats, Error, ExportRequest, Page,
};

/// Branch read operations and projections.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BranchQuery: Send + Sync {
    /// Full projection of a live branch, or `not_found`.
    async fn get(&self, id: &BranchId) -> Result<BranchDetail, Error>;

    async fn search(&self, search: BranchSearch) -> Result<Page<BranchListItem>, Error>;

    async fn stats(&self, id: &BranchId) -> Result<BranchStats, Error>;

    /// Geo projection of every live branch.
    async fn geo(&self) -> Result<Vec<BranchGeo>, Error>;

    /// Stored configuration, or the defaults when none was saved.
    async fn configuration(&self, id: &BranchId) -> Result<BranchConfiguration, Error>;

    /// Snapshot for export. Only JSON is produced.
    async fn export(&self, request: ExportRequest) -> Result<BranchExport, Error>;
}
