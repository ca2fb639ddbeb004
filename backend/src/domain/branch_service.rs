//! Branch domain service.
//!
//! Implements [`BranchCommand`] and [`BranchQuery`]. Writes validate the
//! request against the stored branch first, then run the storage-backed code
//! uniqueness check, and only then persist.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::info;

use super::branch::optional_text;
use super::branch_projection::BranchProjector;
use super::ports::{
    BranchActivityQuery, BranchCommand, BranchConfigurationRepository, BranchQuery,
    BranchRepository, CounterRepository, UserDirectory,
};
use super::repository_errors::{
    degrade, map_branch_error, map_configuration_error, map_counter_error,
};
use super::{
    AuditStamp, Branch, BranchChanges, BranchConfiguration, BranchDetail, BranchDraft,
    BranchExport, BranchGeo, BranchId, BranchListItem, BranchSearch, BranchStats, EodAction,
    EodLock, EodRequest, Error, ExportFormat, ExportRequest, FieldErrors, Page,
    StoredBranchConfiguration, UserId, check_code_available, days_since_lock,
};

/// Branch service implementing the branch driving ports.
#[derive(Clone)]
pub struct BranchService {
    branches: Arc<dyn BranchRepository>,
    counters: Arc<dyn CounterRepository>,
    configurations: Arc<dyn BranchConfigurationRepository>,
    activity: Arc<dyn BranchActivityQuery>,
    projector: BranchProjector,
    clock: Arc<dyn Clock>,
}

impl BranchService {
    /// Create a new service over the given ports.
    pub fn new(
        branches: Arc<dyn BranchRepository>,
        counters: Arc<dyn CounterRepository>,
        configurations: Arc<dyn BranchConfigurationRepository>,
        activity: Arc<dyn BranchActivityQuery>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let projector = BranchProjector::new(
            counters.clone(),
            activity.clone(),
            users,
            clock.clone(),
        );
        Self {
            branches,
            counters,
            configurations,
            activity,
            projector,
            clock,
        }
    }

    async fn load(&self, id: &BranchId) -> Result<Branch, Error> {
        self.branches
            .find_by_id(id)
            .await
            .map_err(map_branch_error)?
            .ok_or_else(|| Error::not_found(format!("branch {id} not found")))
    }

    async fn ensure_code_available(
        &self,
        code: &super::BranchCode,
        excluding: Option<BranchId>,
    ) -> Result<(), Error> {
        let holder = self
            .branches
            .find_id_by_code(code)
            .await
            .map_err(map_branch_error)?;
        check_code_available(holder, excluding).into_result()?;
        Ok(())
    }

    /// Persist `branch` unless it was deleted or its lock state moved since
    /// `loaded_lock` was read.
    async fn write(
        &self,
        branch: &Branch,
        loaded_lock: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<(), Error> {
        let written = self
            .branches
            .update(branch, loaded_lock)
            .await
            .map_err(map_branch_error)?;
        if written {
            return Ok(());
        }
        match self
            .branches
            .find_by_id(&branch.id)
            .await
            .map_err(map_branch_error)?
        {
            None => Err(Error::not_found(format!("branch {} not found", branch.id))),
            Some(_) => Err(Error::conflict(
                "branch EOD state changed during the request; reload and retry",
            )),
        }
    }

    async fn eod_locking_enabled(&self, id: &BranchId) -> Result<bool, Error> {
        let stored = self
            .configurations
            .find(id)
            .await
            .map_err(map_configuration_error)?;
        Ok(stored.is_none_or(|stored| stored.configuration.settings.enable_eod_locking))
    }
}

#[async_trait]
impl BranchCommand for BranchService {
    async fn create(&self, actor: &UserId, draft: BranchDraft) -> Result<BranchDetail, Error> {
        let code = draft.validate()?;
        self.ensure_code_available(&code, None).await?;

        let now = self.clock.utc();
        let branch = Branch {
            id: BranchId::random(),
            name: draft.name.trim().to_owned(),
            code,
            address: draft.address,
            phone: draft.phone,
            email: draft.email.as_deref().and_then(optional_text),
            city: draft.city.as_deref().and_then(optional_text),
            state: draft.state.as_deref().and_then(optional_text),
            latitude: draft.latitude,
            longitude: draft.longitude,
            opening_time: draft.opening_time,
            closing_time: draft.closing_time,
            is_active: draft.is_active,
            eod_lock: None,
            last_locked_at: None,
            audit: AuditStamp::created(now, Some(*actor)),
            deleted_at: None,
        };
        self.branches
            .insert(&branch)
            .await
            .map_err(map_branch_error)?;

        info!(actor = %actor, branch_id = %branch.id, code = %branch.code, "branch created");
        self.projector.detail(branch).await
    }

    async fn update(
        &self,
        actor: &UserId,
        id: &BranchId,
        changes: BranchChanges,
    ) -> Result<BranchDetail, Error> {
        let mut branch = self.load(id).await?;
        let loaded_lock = branch.eod_locked_at();
        let code = changes.validate_against(&branch)?;
        if let Some(code) = &code {
            self.ensure_code_available(code, Some(branch.id)).await?;
        }

        branch.apply(changes, code);
        branch.audit.touch(self.clock.utc(), Some(*actor));
        self.write(&branch, loaded_lock).await?;

        info!(actor = %actor, branch_id = %branch.id, "branch updated");
        self.projector.detail(branch).await
    }

    async fn delete(&self, actor: &UserId, id: &BranchId) -> Result<(), Error> {
        let deleted = self
            .branches
            .soft_delete(id, self.clock.utc())
            .await
            .map_err(map_branch_error)?;
        if !deleted {
            return Err(Error::not_found(format!("branch {id} not found")));
        }
        info!(actor = %actor, branch_id = %id, "branch deleted");
        Ok(())
    }

    async fn transition_eod(
        &self,
        actor: &UserId,
        id: &BranchId,
        request: EodRequest,
    ) -> Result<BranchDetail, Error> {
        let mut branch = self.load(id).await?;
        let loaded_lock = branch.eod_locked_at();
        let now = self.clock.utc();

        match (request.action, branch.is_eod_locked()) {
            (EodAction::Lock, true) => {
                return Err(Error::conflict("branch is already EOD locked"));
            }
            (EodAction::Unlock, false) => {
                return Err(Error::conflict("branch is not EOD locked"));
            }
            (EodAction::Lock, false) => {
                if !self.eod_locking_enabled(id).await? {
                    return Err(Error::conflict("EOD locking is disabled for this branch"));
                }
                branch.eod_lock = Some(EodLock {
                    locked_at: now,
                    locked_by: Some(*actor),
                });
                branch.last_locked_at = Some(now);
            }
            (EodAction::Unlock, true) => branch.eod_lock = None,
        }

        branch.audit.touch(now, Some(*actor));
        self.write(&branch, loaded_lock).await?;

        info!(
            actor = %actor,
            branch_id = %branch.id,
            action = %request.action,
            reason = request.reason.as_deref().unwrap_or_default(),
            "branch EOD state changed"
        );
        self.projector.detail(branch).await
    }

    async fn save_configuration(
        &self,
        actor: &UserId,
        id: &BranchId,
        configuration: BranchConfiguration,
    ) -> Result<StoredBranchConfiguration, Error> {
        let branch = self.load(id).await?;
        configuration.validate()?;

        let stored = StoredBranchConfiguration {
            branch_id: branch.id,
            configuration,
            updated_at: self.clock.utc(),
        };
        self.configurations
            .save(&stored)
            .await
            .map_err(map_configuration_error)?;

        info!(actor = %actor, branch_id = %branch.id, "branch configuration saved");
        Ok(stored)
    }
}

#[async_trait]
impl BranchQuery for BranchService {
    async fn get(&self, id: &BranchId) -> Result<BranchDetail, Error> {
        let branch = self.load(id).await?;
        self.projector.detail(branch).await
    }

    async fn search(&self, search: BranchSearch) -> Result<Page<BranchListItem>, Error> {
        let page = self
            .branches
            .search(&search)
            .await
            .map_err(map_branch_error)?;
        let items = self.projector.list_items(page.items).await?;
        Ok(Page {
            items,
            page: page.page,
            page_size: page.page_size,
            total: page.total,
        })
    }

    async fn stats(&self, id: &BranchId) -> Result<BranchStats, Error> {
        let branch = self.load(id).await?;
        let today = self.projector.today();
        let ids = [branch.id];

        let appointments = degrade(
            self.activity.appointment_totals(&branch.id, today).await,
            "appointment_totals",
        );
        let payments = degrade(
            self.activity.payment_totals(&branch.id, today).await,
            "payment_totals",
        );
        let active_staff = self
            .projector
            .active_staff(&ids)
            .await
            .map(|counts| counts.get(&branch.id).copied().unwrap_or(0));
        let active_counters = self
            .projector
            .active_counters(&ids)
            .await?
            .get(&branch.id)
            .copied()
            .unwrap_or(0);

        Ok(BranchStats {
            id: branch.id,
            days_since_last_lock: days_since_lock(branch.last_locked_at, today),
            is_eod_locked: branch.is_eod_locked(),
            last_locked_at: branch.last_locked_at,
            name: branch.name,
            code: branch.code,
            appointments,
            payments,
            active_staff,
            active_counters,
        })
    }

    async fn geo(&self) -> Result<Vec<BranchGeo>, Error> {
        let branches = self.branches.list(true).await.map_err(map_branch_error)?;
        Ok(self.projector.geo(branches).await)
    }

    async fn configuration(&self, id: &BranchId) -> Result<BranchConfiguration, Error> {
        let branch = self.load(id).await?;
        let stored = self
            .configurations
            .find(&branch.id)
            .await
            .map_err(map_configuration_error)?;
        Ok(stored.map(|stored| stored.configuration).unwrap_or_default())
    }

    async fn export(&self, request: ExportRequest) -> Result<BranchExport, Error> {
        if request.format != ExportFormat::Json {
            return Err(FieldErrors::single(
                "format",
                format!("{} export is not available; use json", request.format),
            )
            .into());
        }

        let branches = self
            .branches
            .list(request.include_inactive)
            .await
            .map_err(map_branch_error)?;
        let counters = if request.include_counters {
            let exported: std::collections::HashSet<BranchId> =
                branches.iter().map(|branch| branch.id).collect();
            let counters = self.counters.list(None).await.map_err(map_counter_error)?;
            Some(
                counters
                    .into_iter()
                    .filter(|counter| exported.contains(&counter.branch_id))
                    .collect(),
            )
        } else {
            None
        };

        info!(
            format = %request.format,
            branches = branches.len(),
            "branch export prepared"
        );
        Ok(BranchExport {
            exported_at: self.clock.utc(),
            branches,
            counters,
        })
    }
}

#[cfg(test)]
#[path = "branch_service_tests.rs"]
mod tests;
