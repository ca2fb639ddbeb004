//! Counter domain service.
//!
//! Implements [`CounterCommand`] and [`CounterQuery`]. Every write builds the
//! candidate counter first, then checks branch existence, number uniqueness
//! within the branch and device uniqueness, excluding the counter itself.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::info;

use super::branch_projection::BranchProjector;
use super::ports::{
    BranchActivityQuery, BranchRepository, CounterActivityQuery, CounterCommand, CounterQuery,
    CounterRepository, UserDirectory,
};
use super::repository_errors::{degrade, map_branch_error, map_counter_error};
use super::{
    BranchId, Counter, CounterAssignment, CounterChanges, CounterDetail, CounterDraft, CounterId,
    CounterListItem, CounterStats, DEVICE_IN_USE_MESSAGE, Derived, Error, FieldErrors, UserId,
    check_branch_exists, check_device_available, check_number_available, current_session,
};

/// Counter service implementing the counter driving ports.
#[derive(Clone)]
pub struct CounterService {
    counters: Arc<dyn CounterRepository>,
    branches: Arc<dyn BranchRepository>,
    activity: Arc<dyn CounterActivityQuery>,
    projector: BranchProjector,
    clock: Arc<dyn Clock>,
}

impl CounterService {
    /// Create a new service over the given ports.
    pub fn new(
        counters: Arc<dyn CounterRepository>,
        branches: Arc<dyn BranchRepository>,
        activity: Arc<dyn CounterActivityQuery>,
        branch_activity: Arc<dyn BranchActivityQuery>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let projector =
            BranchProjector::new(counters.clone(), branch_activity, users, clock.clone());
        Self {
            counters,
            branches,
            activity,
            projector,
            clock,
        }
    }

    async fn load(&self, id: &CounterId) -> Result<Counter, Error> {
        self.counters
            .find_by_id(id)
            .await
            .map_err(map_counter_error)?
            .ok_or_else(|| Error::not_found(format!("counter {id} not found")))
    }

    /// Uniqueness and existence rules for `candidate`; `excluding` is the
    /// counter being updated.
    async fn check_claims(
        &self,
        candidate: &Counter,
        excluding: Option<CounterId>,
    ) -> Result<(), Error> {
        let mut errors = FieldErrors::default();

        let branch = self
            .branches
            .find_by_id(&candidate.branch_id)
            .await
            .map_err(map_branch_error)?;
        errors.extend(check_branch_exists(branch.is_some()));

        if branch.is_some() {
            let holder = self
                .counters
                .find_by_number(&candidate.branch_id, candidate.number)
                .await
                .map_err(map_counter_error)?;
            errors.extend(check_number_available(holder, excluding));
        }

        if let Some(device_id) = &candidate.device_id {
            let holder = self
                .counters
                .find_by_device(device_id)
                .await
                .map_err(map_counter_error)?;
            errors.extend(check_device_available(holder, excluding));
        }

        errors.into_result()?;
        Ok(())
    }

    async fn detail(&self, counter: Counter) -> Result<CounterDetail, Error> {
        let branch = self
            .branches
            .find_by_id(&counter.branch_id)
            .await
            .map_err(map_branch_error)?
            .ok_or_else(|| Error::not_found(format!("counter {} not found", counter.id)))?;
        let branch = self
            .projector
            .list_items(vec![branch])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::internal("branch projection was empty"))?;

        let current_user = match &counter.device_id {
            Some(device_id) => degrade(
                self.activity.latest_session(device_id).await,
                "current_user",
            )
            .map(|session| current_session(session, self.clock.utc())),
            None => Derived::Available(None),
        };

        Ok(CounterDetail {
            counter,
            branch,
            current_user,
        })
    }
}

#[async_trait]
impl CounterCommand for CounterService {
    async fn create(&self, actor: &UserId, draft: CounterDraft) -> Result<CounterDetail, Error> {
        let counter = draft.validate(CounterId::random(), self.clock.utc())?;
        self.check_claims(&counter, None).await?;
        self.counters
            .insert(&counter)
            .await
            .map_err(map_counter_error)?;

        info!(
            actor = %actor,
            counter_id = %counter.id,
            branch_id = %counter.branch_id,
            number = counter.number.get(),
            "counter created"
        );
        self.detail(counter).await
    }

    async fn update(
        &self,
        actor: &UserId,
        id: &CounterId,
        changes: CounterChanges,
    ) -> Result<CounterDetail, Error> {
        let existing = self.load(id).await?;
        let mut counter = changes.validate_against(&existing)?;
        self.check_claims(&counter, Some(existing.id)).await?;

        counter.updated_at = self.clock.utc();
        self.counters
            .update(&counter)
            .await
            .map_err(map_counter_error)?;

        info!(actor = %actor, counter_id = %counter.id, "counter updated");
        self.detail(counter).await
    }

    async fn assign_device(
        &self,
        actor: &UserId,
        id: &CounterId,
        assignment: CounterAssignment,
    ) -> Result<CounterDetail, Error> {
        let counter = self.load(id).await?;
        let holder = self
            .counters
            .find_by_device(&assignment.device_id)
            .await
            .map_err(map_counter_error)?;

        match holder {
            Some(holder) if holder == counter.id => return self.detail(counter).await,
            Some(_) if !assignment.force => {
                return Err(FieldErrors::single("device_id", DEVICE_IN_USE_MESSAGE).into());
            }
            previous => {
                self.counters
                    .reassign_device(&assignment.device_id, previous, counter.id, self.clock.utc())
                    .await
                    .map_err(map_counter_error)?;
                info!(
                    actor = %actor,
                    counter_id = %counter.id,
                    device_id = %assignment.device_id,
                    previous_counter = ?previous,
                    "device assigned to counter"
                );
            }
        }

        let refreshed = self.load(id).await?;
        self.detail(refreshed).await
    }
}

#[async_trait]
impl CounterQuery for CounterService {
    async fn get(&self, id: &CounterId) -> Result<CounterDetail, Error> {
        let counter = self.load(id).await?;
        self.detail(counter).await
    }

    async fn list(&self, branch_id: Option<BranchId>) -> Result<Vec<CounterListItem>, Error> {
        let counters = self
            .counters
            .list(branch_id)
            .await
            .map_err(map_counter_error)?;
        let ids: Vec<BranchId> = counters
            .iter()
            .map(|counter| counter.branch_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let branches: HashMap<BranchId, _> = self
            .branches
            .find_by_ids(&ids)
            .await
            .map_err(map_branch_error)?
            .into_iter()
            .map(|branch| (branch.id, branch))
            .collect();

        Ok(counters
            .into_iter()
            .filter_map(|counter| {
                let branch = branches.get(&counter.branch_id)?;
                Some(CounterListItem {
                    branch_name: branch.name.clone(),
                    branch_code: branch.code.clone(),
                    counter,
                })
            })
            .collect())
    }

    async fn stats(&self, id: &CounterId) -> Result<CounterStats, Error> {
        let counter = self.load(id).await?;
        let today = self.clock.utc().date_naive();
        let usage = degrade(self.activity.usage(&counter.id, today).await, "usage");
        Ok(CounterStats {
            id: counter.id,
            number: counter.number,
            name: counter.name,
            branch_id: counter.branch_id,
            usage,
        })
    }
}

#[cfg(test)]
#[path = "counter_service_tests.rs"]
mod tests;
