//! Shared HTTP adapter state.
//!
//! Handlers receive this through `actix_web::web::Data` and depend only on
//! the driving ports, so they can be exercised with mocks and no I/O.

use std::sync::Arc;

use crate::domain::ports::{BranchCommand, BranchQuery, CounterCommand, CounterQuery, SyncQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub branches: Arc<dyn BranchCommand>,
    pub branches_query: Arc<dyn BranchQuery>,
    pub counters: Arc<dyn CounterCommand>,
    pub counters_query: Arc<dyn CounterQuery>,
    pub sync: Arc<dyn SyncQuery>,
}

impl HttpState {
    /// Build state from a single service implementing several ports.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use backend::domain::ports::{
    ///     FixtureBranchActivityQuery, FixtureBranchConfigurationRepository,
    ///     FixtureBranchRepository, FixtureCounterActivityQuery, FixtureCounterRepository,
    ///     FixtureUserDirectory,
    /// };
    /// use backend::domain::{BranchService, CounterService, SyncService};
    /// use backend::inbound::http::state::HttpState;
    /// use mockable::DefaultClock;
    ///
    /// let clock = Arc::new(DefaultClock);
    /// let branches = Arc::new(BranchService::new(
    ///     Arc::new(FixtureBranchRepository),
    ///     Arc::new(FixtureCounterRepository),
    ///     Arc::new(FixtureBranchConfigurationRepository),
    ///     Arc::new(FixtureBranchActivityQuery),
    ///     Arc::new(FixtureUserDirectory),
    ///     clock.clone(),
    /// ));
    /// let counters = Arc::new(CounterService::new(
    ///     Arc::new(FixtureCounterRepository),
    ///     Arc::new(FixtureBranchRepository),
    ///     Arc::new(FixtureCounterActivityQuery),
    ///     Arc::new(FixtureBranchActivityQuery),
    ///     Arc::new(FixtureUserDirectory),
    ///     clock.clone(),
    /// ));
    /// let sync = Arc::new(SyncService::new(
    ///     Arc::new(FixtureBranchRepository),
    ///     Arc::new(FixtureCounterRepository),
    ///     clock,
    /// ));
    /// let state = HttpState::new(branches, counters, sync);
    /// let _query = state.branches_query.clone();
    /// ```
    pub fn new<B, C>(branches: Arc<B>, counters: Arc<C>, sync: Arc<dyn SyncQuery>) -> Self
    where
        B: BranchCommand + BranchQuery + 'static,
        C: CounterCommand + CounterQuery + 'static,
    {
        Self {
            branches: branches.clone(),
            branches_query: branches,
            counters: counters.clone(),
            counters_query: counters,
            sync,
        }
    }
}
