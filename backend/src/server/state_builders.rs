//! Builders wiring driven-port adapters into the HTTP state.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use backend::domain::ports::{
    BranchActivityQuery, BranchConfigurationRepository, BranchRepository, CounterActivityQuery,
    CounterRepository, FixtureBranchActivityQuery, FixtureBranchConfigurationRepository,
    FixtureBranchRepository, FixtureCounterActivityQuery, FixtureCounterRepository,
    FixtureUserDirectory, UserDirectory,
};
use backend::domain::{BranchService, CounterService, SyncService};
use backend::inbound::http::state::HttpState;
use backend::outbound::persistence::{
    DbPool, DieselBranchActivityQuery, DieselBranchConfigurationRepository,
    DieselBranchRepository, DieselCounterActivityQuery, DieselCounterRepository,
    DieselUserDirectory,
};

/// Driven adapters shared by the domain services.
#[derive(Clone)]
struct DrivenPorts {
    branches: Arc<dyn BranchRepository>,
    counters: Arc<dyn CounterRepository>,
    configurations: Arc<dyn BranchConfigurationRepository>,
    branch_activity: Arc<dyn BranchActivityQuery>,
    counter_activity: Arc<dyn CounterActivityQuery>,
    users: Arc<dyn UserDirectory>,
}

impl DrivenPorts {
    fn diesel(pool: &DbPool) -> Self {
        Self {
            branches: Arc::new(DieselBranchRepository::new(pool.clone())),
            counters: Arc::new(DieselCounterRepository::new(pool.clone())),
            configurations: Arc::new(DieselBranchConfigurationRepository::new(pool.clone())),
            branch_activity: Arc::new(DieselBranchActivityQuery::new(pool.clone())),
            counter_activity: Arc::new(DieselCounterActivityQuery::new(pool.clone())),
            users: Arc::new(DieselUserDirectory::new(pool.clone())),
        }
    }

    /// Empty fixtures for running without a database.
    fn fixtures() -> Self {
        Self {
            branches: Arc::new(FixtureBranchRepository),
            counters: Arc::new(FixtureCounterRepository),
            configurations: Arc::new(FixtureBranchConfigurationRepository),
            branch_activity: Arc::new(FixtureBranchActivityQuery),
            counter_activity: Arc::new(FixtureCounterActivityQuery),
            users: Arc::new(FixtureUserDirectory),
        }
    }
}

fn http_state_from(ports: DrivenPorts, clock: Arc<dyn Clock>) -> HttpState {
    let DrivenPorts {
        branches,
        counters,
        configurations,
        branch_activity,
        counter_activity,
        users,
    } = ports;
    let branch_service = Arc::new(BranchService::new(
        branches.clone(),
        counters.clone(),
        configurations,
        branch_activity.clone(),
        users.clone(),
        clock.clone(),
    ));
    let counter_service = Arc::new(CounterService::new(
        counters.clone(),
        branches.clone(),
        counter_activity,
        branch_activity,
        users,
        clock.clone(),
    ));
    let sync = Arc::new(SyncService::new(branches, counters, clock));
    HttpState::new(branch_service, counter_service, sync)
}

/// Build handler state, using Diesel adapters when a pool is available and
/// fixtures otherwise.
pub(super) fn build_http_state(db_pool: Option<&DbPool>) -> web::Data<HttpState> {
    let ports = db_pool.map_or_else(DrivenPorts::fixtures, DrivenPorts::diesel);
    web::Data::new(http_state_from(ports, Arc::new(DefaultClock)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::domain::{BranchSearch, ErrorCode, SyncRequest};
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn fixture_state_serves_empty_results() {
        let state = build_http_state(None);

        let page = state
            .branches_query
            .search(BranchSearch::default())
            .await
            .expect("fixture search");
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);

        let counters = state.counters_query.list(None).await.expect("fixture list");
        assert!(counters.is_empty());

        let payload = state
            .sync
            .sync(SyncRequest::new(None, None).expect("default include"))
            .await
            .expect("fixture sync");
        assert_eq!(payload.branches.map(|rows| rows.len()), Some(0));
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_state_reports_missing_branches() {
        let state = build_http_state(None);
        let err = state
            .branches_query
            .get(&backend::domain::BranchId::random())
            .await
            .expect_err("fixture holds no branches");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
