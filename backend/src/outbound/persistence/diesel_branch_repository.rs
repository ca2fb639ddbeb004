//! PostgreSQL-backed `BranchRepository` implementation using Diesel ORM.
//!
//! Code uniqueness among live branches is enforced by the partial unique
//! index `branches_code_live_key`; a violation surfaces as
//! [`BranchRepositoryError::DuplicateCode`] so concurrent creates with the
//! same code cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::not;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{BranchRepository, BranchRepositoryError};
use crate::domain::{Branch, BranchCode, BranchId, BranchSearch, Page};

use super::diesel_error_mapping::{BRANCH_CODE_INDEX, StoreFailure};
use super::models::BranchRow;
use super::pool::DbPool;
use super::schema::{branches, counters};

/// Diesel-backed implementation of the `BranchRepository` port.
#[derive(Clone)]
pub struct DieselBranchRepository {
    pool: DbPool,
}

impl DieselBranchRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_failure(failure: StoreFailure) -> BranchRepositoryError {
    match failure {
        StoreFailure::Connection(message) => BranchRepositoryError::connection(message),
        StoreFailure::Query(message) | StoreFailure::MissingRelation(message) => {
            BranchRepositoryError::query(message)
        }
        StoreFailure::UniqueViolation { constraint } => BranchRepositoryError::query(format!(
            "unique constraint {} violated",
            constraint.as_deref().unwrap_or("unknown")
        )),
    }
}

fn map_error(error: impl Into<StoreFailure>) -> BranchRepositoryError {
    map_failure(error.into())
}

/// Map a write failure, naming the code when the live-code index rejected it.
fn map_write_error(error: diesel::result::Error, code: &BranchCode) -> BranchRepositoryError {
    map_write_failure(StoreFailure::from(error), code)
}

fn map_write_failure(failure: StoreFailure, code: &BranchCode) -> BranchRepositoryError {
    if failure.violates(BRANCH_CODE_INDEX) {
        BranchRepositoryError::duplicate_code(code.as_str())
    } else {
        map_failure(failure)
    }
}

fn to_branches(rows: Vec<BranchRow>) -> Result<Vec<Branch>, BranchRepositoryError> {
    rows.into_iter()
        .map(|row| Branch::try_from(row).map_err(|err| BranchRepositoryError::query(err.to_string())))
        .collect()
}

/// Escape `LIKE` metacharacters so user text matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

/// Live branches matching every filter of `search`, without ordering or paging.
fn filtered(search: &BranchSearch) -> branches::BoxedQuery<'static, Pg> {
    let mut query = branches::table
        .filter(branches::deleted_at.is_null())
        .into_boxed();

    if search.active_only {
        query = query.filter(branches::is_active.eq(true));
    }
    if let Some(text) = search.query_text() {
        let pattern = format!("%{}%", escape_like(text));
        query = query.filter(
            branches::name
                .ilike(pattern.clone())
                .or(branches::code.ilike(pattern.clone()))
                .or(branches::address.ilike(pattern)),
        );
    }
    if let Some(city) = non_blank(search.city.as_deref()) {
        query = query.filter(branches::city.ilike(escape_like(city)));
    }
    if let Some(state) = non_blank(search.state.as_deref()) {
        query = query.filter(branches::state.ilike(escape_like(state)));
    }
    if let Some(has_counter) = search.has_counter {
        let with_active_counter = counters::table
            .filter(counters::is_active.eq(true))
            .select(counters::branch_id);
        query = if has_counter {
            query.filter(branches::id.eq_any(with_active_counter))
        } else {
            query.filter(not(branches::id.eq_any(with_active_counter)))
        };
    }
    query
}

#[async_trait]
impl BranchRepository for DieselBranchRepository {
    async fn find_by_id(&self, id: &BranchId) -> Result<Option<Branch>, BranchRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let row = branches::table
            .filter(branches::id.eq(id.as_uuid()))
            .filter(branches::deleted_at.is_null())
            .select(BranchRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        row.map(|row| Branch::try_from(row).map_err(|err| BranchRepositoryError::query(err.to_string())))
            .transpose()
    }

    async fn find_by_ids(&self, ids: &[BranchId]) -> Result<Vec<Branch>, BranchRepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let rows = branches::table
            .filter(branches::id.eq_any(uuids))
            .filter(branches::deleted_at.is_null())
            .select(BranchRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_error)?;
        to_branches(rows)
    }

    async fn find_id_by_code(
        &self,
        code: &BranchCode,
    ) -> Result<Option<BranchId>, BranchRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let id: Option<Uuid> = branches::table
            .filter(branches::code.eq(code.as_str()))
            .filter(branches::deleted_at.is_null())
            .select(branches::id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        Ok(id.map(BranchId::new))
    }

    async fn insert(&self, branch: &Branch) -> Result<(), BranchRepositoryError> {
        let row = BranchRow::from(branch);
        let mut conn = self.pool.get().await.map_err(map_error)?;
        diesel::insert_into(branches::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|err| map_write_error(err, &branch.code))?;
        Ok(())
    }

    async fn update(
        &self,
        branch: &Branch,
        expected_lock: Option<DateTime<Utc>>,
    ) -> Result<bool, BranchRepositoryError> {
        let row = BranchRow::from(branch);
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let updated = diesel::update(
            branches::table
                .filter(branches::id.eq(row.id))
                .filter(branches::deleted_at.is_null())
                .filter(branches::eod_locked_at.is_not_distinct_from(expected_lock)),
        )
        .set(&row)
        .execute(&mut conn)
        .await
        .map_err(|err| map_write_error(err, &branch.code))?;
        Ok(updated > 0)
    }

    async fn soft_delete(
        &self,
        id: &BranchId,
        at: DateTime<Utc>,
    ) -> Result<bool, BranchRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let updated = diesel::update(
            branches::table
                .filter(branches::id.eq(id.as_uuid()))
                .filter(branches::deleted_at.is_null()),
        )
        .set((branches::deleted_at.eq(at), branches::updated_at.eq(at)))
        .execute(&mut conn)
        .await
        .map_err(map_error)?;
        Ok(updated > 0)
    }

    async fn search(&self, search: &BranchSearch) -> Result<Page<Branch>, BranchRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let total: i64 = filtered(search)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_error)?;

        let offset = i64::try_from(search.offset())
            .map_err(|_| BranchRepositoryError::query("page offset out of range"))?;
        let rows = filtered(search)
            .order((branches::name.asc(), branches::code.asc()))
            .limit(i64::from(search.page_size()))
            .offset(offset)
            .select(BranchRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_error)?;

        Ok(Page {
            items: to_branches(rows)?,
            page: search.page(),
            page_size: search.page_size(),
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn list(&self, include_inactive: bool) -> Result<Vec<Branch>, BranchRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let mut query = branches::table
            .filter(branches::deleted_at.is_null())
            .into_boxed();
        if !include_inactive {
            query = query.filter(branches::is_active.eq(true));
        }
        let rows = query
            .order((branches::name.asc(), branches::code.asc()))
            .select(BranchRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_error)?;
        to_branches(rows)
    }

    async fn list_changed_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Branch>, BranchRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let mut query = branches::table.into_boxed();
        if let Some(since) = since {
            query = query.filter(branches::updated_at.gt(since));
        }
        let rows = query
            .order(branches::updated_at.asc())
            .select(BranchRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_error)?;
        to_branches(rows)
    }
}
