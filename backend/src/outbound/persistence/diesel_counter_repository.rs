//! PostgreSQL-backed `CounterRepository` implementation using Diesel ORM.
//!
//! Unique indexes on `(branch_id, counter_number)` and `device_id` back the
//! service-level checks; violations that slip past them under concurrency
//! are reported as the matching duplicate error.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{CounterRepository, CounterRepositoryError};
use crate::domain::{BranchId, Counter, CounterId, CounterNumber, DeviceId};

use super::diesel_error_mapping::{COUNTER_DEVICE_INDEX, COUNTER_NUMBER_INDEX, StoreFailure};
use super::models::CounterRow;
use super::pool::DbPool;
use super::schema::{branches, counters};

/// Diesel-backed implementation of the `CounterRepository` port.
#[derive(Clone)]
pub struct DieselCounterRepository {
    pool: DbPool,
}

impl DieselCounterRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_failure(failure: StoreFailure) -> CounterRepositoryError {
    match failure {
        StoreFailure::Connection(message) => CounterRepositoryError::connection(message),
        StoreFailure::Query(message) | StoreFailure::MissingRelation(message) => {
            CounterRepositoryError::query(message)
        }
        StoreFailure::UniqueViolation { constraint } => CounterRepositoryError::query(format!(
            "unique constraint {} violated",
            constraint.as_deref().unwrap_or("unknown")
        )),
    }
}

fn map_error(error: impl Into<StoreFailure>) -> CounterRepositoryError {
    map_failure(error.into())
}

/// Name the number or device a unique index rejected.
fn map_write_failure(
    failure: StoreFailure,
    number: CounterNumber,
    device_id: Option<&DeviceId>,
) -> CounterRepositoryError {
    if failure.violates(COUNTER_NUMBER_INDEX) {
        return CounterRepositoryError::duplicate_number(number.get());
    }
    if failure.violates(COUNTER_DEVICE_INDEX) {
        let device = device_id.map(DeviceId::as_str).unwrap_or_default();
        return CounterRepositoryError::duplicate_device(device);
    }
    map_failure(failure)
}

fn write_error(counter: &Counter) -> impl Fn(diesel::result::Error) -> CounterRepositoryError + '_ {
    move |err| map_write_failure(StoreFailure::from(err), counter.number, counter.device_id.as_ref())
}

fn to_counter(row: CounterRow) -> Result<Counter, CounterRepositoryError> {
    Counter::try_from(row).map_err(|err| CounterRepositoryError::query(err.to_string()))
}

#[async_trait]
impl CounterRepository for DieselCounterRepository {
    async fn find_by_id(&self, id: &CounterId) -> Result<Option<Counter>, CounterRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let row = counters::table
            .filter(counters::id.eq(id.as_uuid()))
            .select(CounterRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        row.map(to_counter).transpose()
    }

    async fn find_by_number(
        &self,
        branch_id: &BranchId,
        number: CounterNumber,
    ) -> Result<Option<CounterId>, CounterRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let id: Option<Uuid> = counters::table
            .filter(counters::branch_id.eq(branch_id.as_uuid()))
            .filter(counters::counter_number.eq(number.get()))
            .select(counters::id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        Ok(id.map(CounterId::new))
    }

    async fn find_by_device(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<CounterId>, CounterRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let id: Option<Uuid> = counters::table
            .filter(counters::device_id.eq(device_id.as_str()))
            .select(counters::id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        Ok(id.map(CounterId::new))
    }

    async fn list(&self, branch_id: Option<BranchId>) -> Result<Vec<Counter>, CounterRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let mut query = counters::table
            .inner_join(branches::table)
            .filter(branches::deleted_at.is_null())
            .into_boxed();
        if let Some(branch_id) = branch_id {
            query = query.filter(counters::branch_id.eq(*branch_id.as_uuid()));
        }
        let rows = query
            .order((
                branches::name.asc(),
                branches::code.asc(),
                counters::counter_number.asc(),
            ))
            .select(CounterRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_error)?;
        rows.into_iter().map(to_counter).collect()
    }

    async fn active_counts(
        &self,
        branch_ids: &[BranchId],
    ) -> Result<HashMap<BranchId, u64>, CounterRepositoryError> {
        if branch_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let uuids: Vec<Uuid> = branch_ids.iter().map(|id| *id.as_uuid()).collect();
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let counts: Vec<(Uuid, i64)> = counters::table
            .filter(counters::branch_id.eq_any(uuids))
            .filter(counters::is_active.eq(true))
            .group_by(counters::branch_id)
            .select((counters::branch_id, count_star()))
            .load(&mut conn)
            .await
            .map_err(map_error)?;
        Ok(counts
            .into_iter()
            .map(|(id, count)| (BranchId::new(id), u64::try_from(count).unwrap_or_default()))
            .collect())
    }

    async fn insert(&self, counter: &Counter) -> Result<(), CounterRepositoryError> {
        let row = CounterRow::from(counter);
        let mut conn = self.pool.get().await.map_err(map_error)?;
        diesel::insert_into(counters::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(write_error(counter))?;
        Ok(())
    }

    async fn update(&self, counter: &Counter) -> Result<(), CounterRepositoryError> {
        let row = CounterRow::from(counter);
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let updated = diesel::update(counters::table.filter(counters::id.eq(row.id)))
            .set(&row)
            .execute(&mut conn)
            .await
            .map_err(write_error(counter))?;
        if updated == 0 {
            return Err(CounterRepositoryError::query(format!(
                "counter {} not found for update",
                counter.id
            )));
        }
        Ok(())
    }

    async fn reassign_device(
        &self,
        device_id: &DeviceId,
        from: Option<CounterId>,
        to: CounterId,
        at: DateTime<Utc>,
    ) -> Result<(), CounterRepositoryError> {
        let device = device_id.as_str().to_owned();
        let from = from.map(|id| *id.as_uuid());
        let to = *to.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_error)?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                if let Some(from) = from {
                    diesel::update(counters::table.filter(counters::id.eq(from)))
                        .set((
                            counters::device_id.eq(None::<String>),
                            counters::updated_at.eq(at),
                        ))
                        .execute(conn)
                        .await?;
                }
                diesel::update(counters::table.filter(counters::id.eq(to)))
                    .set((counters::device_id.eq(Some(device)), counters::updated_at.eq(at)))
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| match StoreFailure::from(err) {
            failure if failure.violates(COUNTER_DEVICE_INDEX) => {
                CounterRepositoryError::duplicate_device(device_id.as_str())
            }
            failure => map_failure(failure),
        })
    }

    async fn list_changed_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Counter>, CounterRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let mut query = counters::table.into_boxed();
        if let Some(since) = since {
            query = query.filter(counters::updated_at.gt(since));
        }
        let rows = query
            .order(counters::updated_at.asc())
            .select(CounterRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_error)?;
        rows.into_iter().map(to_counter).collect()
    }
}
