//! In-memory adapters for exercising the domain services without a database.
//!
//! [`InMemoryStore`] implements every driven port and enforces the same
//! uniqueness rules as the PostgreSQL indexes, so integration tests in
//! `tests/` can drive the services end to end. Compiled for unit tests and
//! behind the `test-support` feature.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use mockable::Clock;

use crate::domain::ports::{
    BranchActivityQuery, BranchActivityQueryError, BranchConfigurationRepository,
    BranchConfigurationRepositoryError, BranchRepository, BranchRepositoryError,
    CounterActivityQuery, CounterActivityQueryError, CounterRepository, CounterRepositoryError,
    UserDirectory, UserDirectoryError,
};
use crate::domain::{
    AppointmentTotals, Branch, BranchCode, BranchId, BranchSearch, BranchService, Counter,
    CounterId, CounterNumber, CounterService, CounterUsage, DeviceId, DeviceSession, Page,
    PaymentTotals, StoredBranchConfiguration, SyncService, UserId, UserSummary,
};

/// Clock frozen at a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.now);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

#[derive(Default)]
struct StoreState {
    branches: HashMap<BranchId, Branch>,
    counters: HashMap<CounterId, Counter>,
    configurations: HashMap<BranchId, StoredBranchConfiguration>,
    active_staff: HashMap<BranchId, u64>,
    appointments: HashMap<(BranchId, NaiveDate), u64>,
    appointment_totals: HashMap<BranchId, AppointmentTotals>,
    payment_totals: HashMap<BranchId, PaymentTotals>,
    sessions: HashMap<DeviceId, DeviceSession>,
    usage: HashMap<CounterId, CounterUsage>,
    users: HashMap<UserId, UserSummary>,
    activity_unavailable: bool,
    payments_unavailable: bool,
}

impl StoreState {
    fn live_branch(&self, id: &BranchId) -> Option<&Branch> {
        self.branches.get(id).filter(|branch| !branch.is_deleted())
    }

    fn code_holder(&self, code: &BranchCode, excluding: Option<BranchId>) -> Option<BranchId> {
        self.branches
            .values()
            .find(|branch| {
                !branch.is_deleted() && branch.code == *code && Some(branch.id) != excluding
            })
            .map(|branch| branch.id)
    }

    fn check_counter_claims(&self, counter: &Counter) -> Result<(), CounterRepositoryError> {
        for other in self.counters.values().filter(|other| other.id != counter.id) {
            if other.branch_id == counter.branch_id && other.number == counter.number {
                return Err(CounterRepositoryError::duplicate_number(counter.number.get()));
            }
            if counter.device_id.is_some() && other.device_id == counter.device_id {
                let device = counter
                    .device_id
                    .as_ref()
                    .map(DeviceId::as_str)
                    .unwrap_or_default();
                return Err(CounterRepositoryError::duplicate_device(device));
            }
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn contains_ignoring_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|value| value.to_lowercase().contains(&needle.to_lowercase()))
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|raw| raw.trim()).filter(|raw| !raw.is_empty())
}

/// Shared in-memory backing for every driven port.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        lock(&self.state)
    }

    /// Stored branch, including soft-deleted rows.
    pub fn branch(&self, id: &BranchId) -> Option<Branch> {
        self.state().branches.get(id).cloned()
    }

    pub fn counter(&self, id: &CounterId) -> Option<Counter> {
        self.state().counters.get(id).cloned()
    }

    pub fn set_active_staff(&self, branch_id: BranchId, count: u64) {
        self.state().active_staff.insert(branch_id, count);
    }

    pub fn set_appointments(&self, branch_id: BranchId, day: NaiveDate, count: u64) {
        self.state().appointments.insert((branch_id, day), count);
    }

    pub fn set_appointment_totals(&self, branch_id: BranchId, totals: AppointmentTotals) {
        self.state().appointment_totals.insert(branch_id, totals);
    }

    pub fn set_payment_totals(&self, branch_id: BranchId, totals: PaymentTotals) {
        self.state().payment_totals.insert(branch_id, totals);
    }

    pub fn record_session(&self, device_id: DeviceId, session: DeviceSession) {
        self.state().sessions.insert(device_id, session);
    }

    pub fn set_usage(&self, counter_id: CounterId, usage: CounterUsage) {
        self.state().usage.insert(counter_id, usage);
    }

    pub fn add_user(&self, user: UserSummary) {
        self.state().users.insert(user.id, user);
    }

    /// Make the staff, appointment, session and usage reads fail as if their
    /// tables were missing.
    pub fn make_activity_unavailable(&self) {
        self.state().activity_unavailable = true;
    }

    /// Make only the payment aggregates fail.
    pub fn make_payments_unavailable(&self) {
        self.state().payments_unavailable = true;
    }
}

#[async_trait]
impl BranchRepository for InMemoryStore {
    async fn find_by_id(&self, id: &BranchId) -> Result<Option<Branch>, BranchRepositoryError> {
        Ok(self.state().live_branch(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[BranchId]) -> Result<Vec<Branch>, BranchRepositoryError> {
        let state = self.state();
        Ok(ids
            .iter()
            .filter_map(|id| state.live_branch(id).cloned())
            .collect())
    }

    async fn find_id_by_code(
        &self,
        code: &BranchCode,
    ) -> Result<Option<BranchId>, BranchRepositoryError> {
        Ok(self.state().code_holder(code, None))
    }

    async fn insert(&self, branch: &Branch) -> Result<(), BranchRepositoryError> {
        let mut state = self.state();
        if state.code_holder(&branch.code, Some(branch.id)).is_some() {
            return Err(BranchRepositoryError::duplicate_code(branch.code.as_str()));
        }
        state.branches.insert(branch.id, branch.clone());
        Ok(())
    }

    async fn update(
        &self,
        branch: &Branch,
        expected_lock: Option<DateTime<Utc>>,
    ) -> Result<bool, BranchRepositoryError> {
        let mut state = self.state();
        let matches = state.branches.get(&branch.id).is_some_and(|stored| {
            !stored.is_deleted() && stored.eod_locked_at() == expected_lock
        });
        if !matches {
            return Ok(false);
        }
        if state.code_holder(&branch.code, Some(branch.id)).is_some() {
            return Err(BranchRepositoryError::duplicate_code(branch.code.as_str()));
        }
        state.branches.insert(branch.id, branch.clone());
        Ok(true)
    }

    async fn soft_delete(
        &self,
        id: &BranchId,
        at: DateTime<Utc>,
    ) -> Result<bool, BranchRepositoryError> {
        let mut state = self.state();
        match state.branches.get_mut(id) {
            Some(branch) if !branch.is_deleted() => {
                branch.deleted_at = Some(at);
                branch.audit.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn search(&self, search: &BranchSearch) -> Result<Page<Branch>, BranchRepositoryError> {
        let state = self.state();
        let with_counters: HashSet<BranchId> = state
            .counters
            .values()
            .filter(|counter| counter.is_active)
            .map(|counter| counter.branch_id)
            .collect();
        let text = search.query_text();
        let city = non_blank(search.city.as_ref());
        let region = non_blank(search.state.as_ref());

        let mut matches: Vec<Branch> = state
            .branches
            .values()
            .filter(|branch| !branch.is_deleted())
            .filter(|branch| !search.active_only || branch.is_active)
            .filter(|branch| {
                text.is_none_or(|text| {
                    contains_ignoring_case(Some(&branch.name), text)
                        || contains_ignoring_case(Some(branch.code.as_str()), text)
                        || contains_ignoring_case(Some(&branch.address), text)
                })
            })
            .filter(|branch| {
                city.is_none_or(|city| contains_ignoring_case(branch.city.as_deref(), city))
            })
            .filter(|branch| {
                region.is_none_or(|region| contains_ignoring_case(branch.state.as_deref(), region))
            })
            .filter(|branch| {
                search
                    .has_counter
                    .is_none_or(|wanted| with_counters.contains(&branch.id) == wanted)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| (&a.name, a.code.as_str()).cmp(&(&b.name, b.code.as_str())));

        let total = matches.len() as u64;
        let offset = usize::try_from(search.offset()).unwrap_or(usize::MAX);
        let items = matches
            .into_iter()
            .skip(offset)
            .take(search.page_size() as usize)
            .collect();
        Ok(Page {
            items,
            page: search.page(),
            page_size: search.page_size(),
            total,
        })
    }

    async fn list(&self, include_inactive: bool) -> Result<Vec<Branch>, BranchRepositoryError> {
        let mut branches: Vec<Branch> = self
            .state()
            .branches
            .values()
            .filter(|branch| !branch.is_deleted() && (include_inactive || branch.is_active))
            .cloned()
            .collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    async fn list_changed_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Branch>, BranchRepositoryError> {
        let mut branches: Vec<Branch> = self
            .state()
            .branches
            .values()
            .filter(|branch| since.is_none_or(|since| branch.audit.updated_at > since))
            .cloned()
            .collect();
        branches.sort_by_key(|branch| branch.audit.updated_at);
        Ok(branches)
    }
}

#[async_trait]
impl CounterRepository for InMemoryStore {
    async fn find_by_id(&self, id: &CounterId) -> Result<Option<Counter>, CounterRepositoryError> {
        Ok(self.state().counters.get(id).cloned())
    }

    async fn find_by_number(
        &self,
        branch_id: &BranchId,
        number: CounterNumber,
    ) -> Result<Option<CounterId>, CounterRepositoryError> {
        Ok(self
            .state()
            .counters
            .values()
            .find(|counter| counter.branch_id == *branch_id && counter.number == number)
            .map(|counter| counter.id))
    }

    async fn find_by_device(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<CounterId>, CounterRepositoryError> {
        Ok(self
            .state()
            .counters
            .values()
            .find(|counter| counter.device_id.as_ref() == Some(device_id))
            .map(|counter| counter.id))
    }

    async fn list(&self, branch_id: Option<BranchId>) -> Result<Vec<Counter>, CounterRepositoryError> {
        let state = self.state();
        let mut rows: Vec<(&Branch, &Counter)> = state
            .counters
            .values()
            .filter(|counter| branch_id.is_none_or(|id| counter.branch_id == id))
            .filter_map(|counter| Some((state.live_branch(&counter.branch_id)?, counter)))
            .collect();
        rows.sort_by(|(a_branch, a), (b_branch, b)| {
            (&a_branch.name, a_branch.code.as_str(), a.number)
                .cmp(&(&b_branch.name, b_branch.code.as_str(), b.number))
        });
        Ok(rows.into_iter().map(|(_, counter)| counter.clone()).collect())
    }

    async fn active_counts(
        &self,
        branch_ids: &[BranchId],
    ) -> Result<HashMap<BranchId, u64>, CounterRepositoryError> {
        let mut counts = HashMap::new();
        for counter in self.state().counters.values() {
            if counter.is_active && branch_ids.contains(&counter.branch_id) {
                *counts.entry(counter.branch_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn insert(&self, counter: &Counter) -> Result<(), CounterRepositoryError> {
        let mut state = self.state();
        state.check_counter_claims(counter)?;
        state.counters.insert(counter.id, counter.clone());
        Ok(())
    }

    async fn update(&self, counter: &Counter) -> Result<(), CounterRepositoryError> {
        let mut state = self.state();
        if !state.counters.contains_key(&counter.id) {
            return Err(CounterRepositoryError::query(format!(
                "counter {} does not exist",
                counter.id
            )));
        }
        state.check_counter_claims(counter)?;
        state.counters.insert(counter.id, counter.clone());
        Ok(())
    }

    async fn reassign_device(
        &self,
        device_id: &DeviceId,
        from: Option<CounterId>,
        to: CounterId,
        at: DateTime<Utc>,
    ) -> Result<(), CounterRepositoryError> {
        let mut state = self.state();
        let mut target = state
            .counters
            .get(&to)
            .cloned()
            .ok_or_else(|| CounterRepositoryError::query(format!("counter {to} does not exist")))?;
        let mut detached = match from {
            Some(from) => state.counters.get(&from).cloned(),
            None => None,
        };
        if let Some(previous) = detached.as_mut() {
            previous.device_id = None;
            previous.updated_at = at;
        }
        target.device_id = Some(device_id.clone());
        target.updated_at = at;

        let holder = state.counters.values().find(|counter| {
            counter.device_id.as_ref() == Some(device_id)
                && counter.id != to
                && Some(counter.id) != from
        });
        if holder.is_some() {
            return Err(CounterRepositoryError::duplicate_device(device_id.as_str()));
        }
        if let Some(previous) = detached {
            state.counters.insert(previous.id, previous);
        }
        state.counters.insert(target.id, target);
        Ok(())
    }

    async fn list_changed_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Counter>, CounterRepositoryError> {
        let mut counters: Vec<Counter> = self
            .state()
            .counters
            .values()
            .filter(|counter| since.is_none_or(|since| counter.updated_at > since))
            .cloned()
            .collect();
        counters.sort_by_key(|counter| counter.updated_at);
        Ok(counters)
    }
}

#[async_trait]
impl BranchConfigurationRepository for InMemoryStore {
    async fn find(
        &self,
        branch_id: &BranchId,
    ) -> Result<Option<StoredBranchConfiguration>, BranchConfigurationRepositoryError> {
        Ok(self.state().configurations.get(branch_id).cloned())
    }

    async fn save(
        &self,
        configuration: &StoredBranchConfiguration,
    ) -> Result<(), BranchConfigurationRepositoryError> {
        self.state()
            .configurations
            .insert(configuration.branch_id, configuration.clone());
        Ok(())
    }
}

const UNAVAILABLE: &str = "activity tables are not installed";

#[async_trait]
impl BranchActivityQuery for InMemoryStore {
    async fn active_staff_counts(
        &self,
        branch_ids: &[BranchId],
    ) -> Result<HashMap<BranchId, u64>, BranchActivityQueryError> {
        let state = self.state();
        if state.activity_unavailable {
            return Err(BranchActivityQueryError::unavailable(UNAVAILABLE));
        }
        Ok(branch_ids
            .iter()
            .filter_map(|id| state.active_staff.get(id).map(|count| (*id, *count)))
            .collect())
    }

    async fn appointment_counts(
        &self,
        branch_ids: &[BranchId],
        day: NaiveDate,
    ) -> Result<HashMap<BranchId, u64>, BranchActivityQueryError> {
        let state = self.state();
        if state.activity_unavailable {
            return Err(BranchActivityQueryError::unavailable(UNAVAILABLE));
        }
        Ok(branch_ids
            .iter()
            .filter_map(|id| state.appointments.get(&(*id, day)).map(|count| (*id, *count)))
            .collect())
    }

    async fn appointment_totals(
        &self,
        branch_id: &BranchId,
        _today: NaiveDate,
    ) -> Result<AppointmentTotals, BranchActivityQueryError> {
        let state = self.state();
        if state.activity_unavailable {
            return Err(BranchActivityQueryError::unavailable(UNAVAILABLE));
        }
        Ok(state
            .appointment_totals
            .get(branch_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn payment_totals(
        &self,
        branch_id: &BranchId,
        _today: NaiveDate,
    ) -> Result<PaymentTotals, BranchActivityQueryError> {
        let state = self.state();
        if state.activity_unavailable || state.payments_unavailable {
            return Err(BranchActivityQueryError::unavailable(UNAVAILABLE));
        }
        Ok(state.payment_totals.get(branch_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl CounterActivityQuery for InMemoryStore {
    async fn latest_session(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<DeviceSession>, CounterActivityQueryError> {
        let state = self.state();
        if state.activity_unavailable {
            return Err(CounterActivityQueryError::unavailable(UNAVAILABLE));
        }
        Ok(state.sessions.get(device_id).cloned())
    }

    async fn usage(
        &self,
        counter_id: &CounterId,
        _today: NaiveDate,
    ) -> Result<CounterUsage, CounterActivityQueryError> {
        let state = self.state();
        if state.activity_unavailable {
            return Err(CounterActivityQueryError::unavailable(UNAVAILABLE));
        }
        Ok(state.usage.get(counter_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_users(
        &self,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, UserSummary>, UserDirectoryError> {
        let state = self.state();
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).map(|user| (*id, user.clone())))
            .collect())
    }
}

/// The three domain services wired to one store and clock.
pub struct Services {
    pub branches: Arc<BranchService>,
    pub counters: Arc<CounterService>,
    pub sync: Arc<SyncService>,
}

impl Services {
    pub fn new(store: &Arc<InMemoryStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            branches: Arc::new(BranchService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                clock.clone(),
            )),
            counters: Arc::new(CounterService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                clock.clone(),
            )),
            sync: Arc::new(SyncService::new(store.clone(), store.clone(), clock)),
        }
    }
}
