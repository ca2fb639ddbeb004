//! Port for resolving user summaries from the identity store.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{UserId, UserSummary};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user directory adapters.
    pub enum UserDirectoryError {
        /// The user store cannot be reached.
        Unavailable { message: String } =>
            "user directory unavailable: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "user directory query failed: {message}",
    }
}

/// Lookup of users referenced by branches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Summaries for the given ids; unknown ids are absent from the map.
    async fn find_users(
        &self,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, UserSummary>, UserDirectoryError>;
}

/// Fixture implementation that knows no users.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureUserDirectory;

#[async_trait]
impl UserDirectory for FixtureUserDirectory {
    async fn find_users(
        &self,
        _ids: &[UserId],
    ) -> Result<HashMap<UserId, UserSummary>, UserDirectoryError> {
        Ok(HashMap::new())
    }
}
