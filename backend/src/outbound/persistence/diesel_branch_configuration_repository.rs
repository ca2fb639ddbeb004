//! PostgreSQL-backed `BranchConfigurationRepository` storing one JSONB
//! document per branch.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{BranchConfigurationRepository, BranchConfigurationRepositoryError};
use crate::domain::{BranchId, StoredBranchConfiguration};

use super::diesel_error_mapping::StoreFailure;
use super::models::ConfigurationRow;
use super::pool::DbPool;
use super::schema::branch_configurations;

#[derive(Clone)]
pub struct DieselBranchConfigurationRepository {
    pool: DbPool,
}

impl DieselBranchConfigurationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_error(error: impl Into<StoreFailure>) -> BranchConfigurationRepositoryError {
    match error.into() {
        StoreFailure::Connection(message) => BranchConfigurationRepositoryError::connection(message),
        StoreFailure::Query(message) | StoreFailure::MissingRelation(message) => {
            BranchConfigurationRepositoryError::query(message)
        }
        StoreFailure::UniqueViolation { .. } => {
            BranchConfigurationRepositoryError::query("configuration write conflicted")
        }
    }
}

#[async_trait]
impl BranchConfigurationRepository for DieselBranchConfigurationRepository {
    async fn find(
        &self,
        branch_id: &BranchId,
    ) -> Result<Option<StoredBranchConfiguration>, BranchConfigurationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let row = branch_configurations::table
            .filter(branch_configurations::branch_id.eq(branch_id.as_uuid()))
            .select(ConfigurationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        row.map(|row| {
            StoredBranchConfiguration::try_from(row)
                .map_err(|err| BranchConfigurationRepositoryError::query(err.to_string()))
        })
        .transpose()
    }

    async fn save(
        &self,
        configuration: &StoredBranchConfiguration,
    ) -> Result<(), BranchConfigurationRepositoryError> {
        let row = ConfigurationRow::from_stored(configuration)
            .map_err(|err| BranchConfigurationRepositoryError::query(err.to_string()))?;
        let mut conn = self.pool.get().await.map_err(map_error)?;
        diesel::insert_into(branch_configurations::table)
            .values(&row)
            .on_conflict(branch_configurations::branch_id)
            .do_update()
            .set(&row)
            .execute(&mut conn)
            .await
            .map_err(map_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StoreFailure::Connection("refused".to_owned()), BranchConfigurationRepositoryError::connection("refused"))]
    #[case(StoreFailure::Query("bad".to_owned()), BranchConfigurationRepositoryError::query("bad"))]
    fn failures_map_to_port_errors(
        #[case] failure: StoreFailure,
        #[case] expected: BranchConfigurationRepositoryError,
    ) {
        assert_eq!(map_error(failure), expected);
    }
}
