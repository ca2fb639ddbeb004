//! Sync domain service.
//!
//! Returns branches and counters changed since the client's last sync. The
//! server time is captured before any reads so a client using it as its next
//! `last_sync` never misses a concurrent write.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::debug;

use super::ports::{BranchRepository, CounterRepository, SyncQuery};
use super::repository_errors::{map_branch_error, map_counter_error};
use super::{Error, SyncInclude, SyncPayload, SyncRequest};

/// Sync service implementing [`SyncQuery`].
#[derive(Clone)]
pub struct SyncService {
    branches: Arc<dyn BranchRepository>,
    counters: Arc<dyn CounterRepository>,
    clock: Arc<dyn Clock>,
}

impl SyncService {
    pub fn new(
        branches: Arc<dyn BranchRepository>,
        counters: Arc<dyn CounterRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            branches,
            counters,
            clock,
        }
    }
}

#[async_trait]
impl SyncQuery for SyncService {
    async fn sync(&self, request: SyncRequest) -> Result<SyncPayload, Error> {
        let server_time = self.clock.utc();

        let branches = if request.wants(SyncInclude::Branches) {
            Some(
                self.branches
                    .list_changed_since(request.last_sync)
                    .await
                    .map_err(map_branch_error)?,
            )
        } else {
            None
        };
        let counters = if request.wants(SyncInclude::Counters) {
            Some(
                self.counters
                    .list_changed_since(request.last_sync)
                    .await
                    .map_err(map_counter_error)?,
            )
        } else {
            None
        };
        let skipped: Vec<SyncInclude> = request
            .include()
            .iter()
            .copied()
            .filter(|collection| !collection.is_served())
            .collect();

        debug!(
            last_sync = ?request.last_sync,
            branches = branches.as_ref().map_or(0, Vec::len),
            counters = counters.as_ref().map_or(0, Vec::len),
            skipped = skipped.len(),
            "sync payload prepared"
        );
        Ok(SyncPayload {
            server_time,
            branches,
            counters,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{branch, counter, fixture_clock, fixture_timestamp};
    use crate::domain::ports::{
        BranchRepositoryError, FixtureCounterRepository, MockBranchRepository,
        MockCounterRepository,
    };
    use chrono::Duration;
    use rstest::rstest;

    fn include(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|item| (*item).to_owned()).collect()
    }

    #[rstest]
    #[tokio::test]
    async fn default_include_returns_branches_only() {
        let mut branches = MockBranchRepository::new();
        branches
            .expect_list_changed_since()
            .withf(|since| since.is_none())
            .return_once(|_| Ok(vec![branch("BR1"), branch("BR2")]));
        let service = SyncService::new(
            Arc::new(branches),
            Arc::new(FixtureCounterRepository),
            fixture_clock(),
        );

        let payload = service
            .sync(SyncRequest::new(None, None).expect("valid request"))
            .await
            .expect("sync succeeds");

        assert_eq!(payload.server_time, fixture_timestamp());
        assert_eq!(payload.branches.map(|items| items.len()), Some(2));
        assert!(payload.counters.is_none());
        assert!(payload.skipped.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn counters_and_unowned_collections_are_reported() {
        let last_sync = fixture_timestamp() - Duration::hours(1);
        let branch_id = branch("BR1").id;
        let mut counters = MockCounterRepository::new();
        counters
            .expect_list_changed_since()
            .withf(move |since| *since == Some(last_sync))
            .return_once(move |_| Ok(vec![counter(branch_id, 1, None)]));
        let mut branches = MockBranchRepository::new();
        branches.expect_list_changed_since().times(0);
        let service = SyncService::new(Arc::new(branches), Arc::new(counters), fixture_clock());

        let raw = include(&["counters", "staff", "schedules"]);
        let payload = service
            .sync(SyncRequest::new(Some(last_sync), Some(&raw)).expect("valid request"))
            .await
            .expect("sync succeeds");

        assert!(payload.branches.is_none());
        assert_eq!(payload.counters.map(|items| items.len()), Some(1));
        assert_eq!(
            payload.skipped,
            vec![SyncInclude::Staff, SyncInclude::Schedules]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn repository_outage_is_service_unavailable() {
        let mut branches = MockBranchRepository::new();
        branches
            .expect_list_changed_since()
            .return_once(|_| Err(BranchRepositoryError::connection("pool exhausted")));
        let service = SyncService::new(
            Arc::new(branches),
            Arc::new(FixtureCounterRepository),
            fixture_clock(),
        );

        let error = service
            .sync(SyncRequest::new(None, None).expect("valid request"))
            .await
            .expect_err("outage propagates");
        assert_eq!(error.code(), crate::domain::ErrorCode::ServiceUnavailable);
    }
}
