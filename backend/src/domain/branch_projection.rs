//! Builds branch projections from stored branches and collaborator lookups.
//!
//! Shared by the branch and counter services; counters nest the branch list
//! projection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use mockable::Clock;

use super::ports::{BranchActivityQuery, CounterRepository, UserDirectory};
use super::repository_errors::{degrade, map_counter_error};
use super::{
    Branch, BranchDetail, BranchGeo, BranchId, BranchListItem, Derived, Error, UserId,
    UserSummary,
};

#[derive(Clone)]
pub(crate) struct BranchProjector {
    counters: Arc<dyn CounterRepository>,
    activity: Arc<dyn BranchActivityQuery>,
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
}

impl BranchProjector {
    pub(crate) fn new(
        counters: Arc<dyn CounterRepository>,
        activity: Arc<dyn BranchActivityQuery>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            counters,
            activity,
            users,
            clock,
        }
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.clock.utc().date_naive()
    }

    pub(crate) async fn active_counters(
        &self,
        ids: &[BranchId],
    ) -> Result<HashMap<BranchId, u64>, Error> {
        self.counters
            .active_counts(ids)
            .await
            .map_err(map_counter_error)
    }

    pub(crate) async fn active_staff(&self, ids: &[BranchId]) -> Derived<HashMap<BranchId, u64>> {
        degrade(self.activity.active_staff_counts(ids).await, "active_staff")
    }

    pub(crate) async fn appointments_today(
        &self,
        ids: &[BranchId],
    ) -> Derived<HashMap<BranchId, u64>> {
        let today = self.today();
        degrade(
            self.activity.appointment_counts(ids, today).await,
            "appointments_today",
        )
    }

    /// Summaries of the users currently holding EOD locks.
    async fn lock_holders(&self, branches: &[Branch]) -> HashMap<UserId, UserSummary> {
        let ids: Vec<UserId> = branches
            .iter()
            .filter_map(|branch| branch.eod_lock.as_ref()?.locked_by)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return HashMap::new();
        }
        degrade(self.users.find_users(&ids).await, "eod_locked_by").or_default()
    }

    pub(crate) async fn detail(&self, branch: Branch) -> Result<BranchDetail, Error> {
        let ids = [branch.id];
        let active_counters = self.active_counters(&ids).await?;
        let active_staff = self.active_staff(&ids).await;
        let appointments_today = self.appointments_today(&ids).await;
        let mut holders = self.lock_holders(std::slice::from_ref(&branch)).await;
        let locked_by = branch
            .eod_lock
            .as_ref()
            .and_then(|lock| lock.locked_by)
            .and_then(|id| holders.remove(&id));

        Ok(BranchDetail {
            active_counters: count_for(&active_counters, &branch.id),
            active_staff: active_staff.map(|counts| count_for(&counts, &branch.id)),
            appointments_today: appointments_today.map(|counts| count_for(&counts, &branch.id)),
            locked_by,
            branch,
        })
    }

    pub(crate) async fn list_items(&self, branches: Vec<Branch>) -> Result<Vec<BranchListItem>, Error> {
        let ids: Vec<BranchId> = branches.iter().map(|branch| branch.id).collect();
        let active_counters = self.active_counters(&ids).await?;
        let holders = self.lock_holders(&branches).await;

        Ok(branches
            .into_iter()
            .map(|branch| {
                let locked_by_email = branch
                    .eod_lock
                    .as_ref()
                    .and_then(|lock| lock.locked_by)
                    .and_then(|id| holders.get(&id))
                    .map(|user| user.email.clone());
                BranchListItem {
                    active_counters: count_for(&active_counters, &branch.id),
                    locked_by_email,
                    branch,
                }
            })
            .collect())
    }

    pub(crate) async fn geo(&self, branches: Vec<Branch>) -> Vec<BranchGeo> {
        let ids: Vec<BranchId> = branches.iter().map(|branch| branch.id).collect();
        let staff = self.active_staff(&ids).await;
        let appointments = self.appointments_today(&ids).await;

        branches
            .into_iter()
            .map(|branch| BranchGeo {
                appointments_today: appointments.as_ref().map(|counts| count_for(counts, &branch.id)),
                active_staff: staff.as_ref().map(|counts| count_for(counts, &branch.id)),
                branch,
            })
            .collect()
    }
}

fn count_for(counts: &HashMap<BranchId, u64>, id: &BranchId) -> u64 {
    counts.get(id).copied().unwrap_or(0)
}
