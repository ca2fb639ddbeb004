//! Port for branch persistence.
//!
//! Reads exclude soft-deleted branches unless stated otherwise. Adapters
//! enforce code uniqueness among live branches with a storage constraint and
//! report violations as [`BranchRepositoryError::DuplicateCode`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Branch, BranchCode, BranchId, BranchSearch, Page};

use super::define_port_error;

define_port_error! {
    /// Errors raised by branch repository adapters.
    pub enum BranchRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "branch repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "branch repository query failed: {message}",
        /// Another live branch already holds the code.
        DuplicateCode { code: String } =>
            "branch code {code} is already in use",
    }
}

/// Port for branch storage and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BranchRepository: Send + Sync {
    /// Fetch a live branch.
    async fn find_by_id(&self, id: &BranchId) -> Result<Option<Branch>, BranchRepositoryError>;

    /// Fetch several live branches; missing ids are skipped.
    async fn find_by_ids(&self, ids: &[BranchId]) -> Result<Vec<Branch>, BranchRepositoryError>;

    /// Identifier of the live branch using `code`, if any.
    async fn find_id_by_code(
        &self,
        code: &BranchCode,
    ) -> Result<Option<BranchId>, BranchRepositoryError>;

    async fn insert(&self, branch: &Branch) -> Result<(), BranchRepositoryError>;

    /// Overwrite the live row with `branch` while its EOD lock time still
    /// equals `expected_lock`, the value seen when the branch was loaded.
    ///
    /// Returns `false` when the branch was deleted or its lock state changed
    /// in the meantime; nothing is written in that case.
    async fn update(
        &self,
        branch: &Branch,
        expected_lock: Option<DateTime<Utc>>,
    ) -> Result<bool, BranchRepositoryError>;

    /// Mark a live branch deleted. Returns `false` when nothing matched.
    async fn soft_delete(
        &self,
        id: &BranchId,
        at: DateTime<Utc>,
    ) -> Result<bool, BranchRepositoryError>;

    /// Filtered, paginated listing ordered by name then code.
    async fn search(&self, search: &BranchSearch) -> Result<Page<Branch>, BranchRepositoryError>;

    /// All live branches ordered by name, optionally including inactive ones.
    async fn list(&self, include_inactive: bool) -> Result<Vec<Branch>, BranchRepositoryError>;

    /// Branches updated after `since` (all when `None`), soft-deleted
    /// branches included so clients can drop them.
    async fn list_changed_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Branch>, BranchRepositoryError>;
}

/// Fixture implementation holding no branches.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureBranchRepository;

#[async_trait]
impl BranchRepository for FixtureBranchRepository {
    async fn find_by_id(&self, _id: &BranchId) -> Result<Option<Branch>, BranchRepositoryError> {
        Ok(None)
    }

    async fn find_by_ids(&self, _ids: &[BranchId]) -> Result<Vec<Branch>, BranchRepositoryError> {
        Ok(Vec::new())
    }

    async fn find_id_by_code(
        &self,
        _code: &BranchCode,
    ) -> Result<Option<BranchId>, BranchRepositoryError> {
        Ok(None)
    }

    async fn insert(&self, _branch: &Branch) -> Result<(), BranchRepositoryError> {
        Ok(())
    }

    async fn update(
        &self,
        _branch: &Branch,
        _expected_lock: Option<DateTime<Utc>>,
    ) -> Result<bool, BranchRepositoryError> {
        Ok(false)
    }

    async fn soft_delete(
        &self,
        _id: &BranchId,
        _at: DateTime<Utc>,
    ) -> Result<bool, BranchRepositoryError> {
        Ok(false)
    }

    async fn search(&self, search: &BranchSearch) -> Result<Page<Branch>, BranchRepositoryError> {
        Ok(Page {
            items: Vec::new(),
            page: search.page(),
            page_size: search.page_size(),
            total: 0,
        })
    }

    async fn list(&self, _include_inactive: bool) -> Result<Vec<Branch>, BranchRepositoryError> {
        Ok(Vec::new())
    }

    async fn list_changed_since(
        &self,
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Branch>, BranchRepositoryError> {
        Ok(Vec::new())
    }
}
