//! Driving port for offline client synchronisation.

use async_trait::async_trait;

use crate::domain::{Error, SyncPayload, SyncRequest};

/// Changes since a client's last sync.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncQuery: Send + Sync {
    async fn sync(&self, request: SyncRequest) -> Result<SyncPayload, Error>;
}
