//! Read-only lookup of user summaries from the shared `users` table.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{Array, Text, Uuid as SqlUuid};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{UserDirectory, UserDirectoryError};
use crate::domain::{UserId, UserSummary};

use super::diesel_error_mapping::StoreFailure;
use super::pool::DbPool;

const FIND_USERS_SQL: &str = "\
SELECT id,
       email,
       COALESCE(NULLIF(TRIM(CONCAT_WS(' ', first_name, last_name)), ''), email) AS name
FROM users
WHERE id = ANY($1)";

#[derive(Debug, QueryableByName)]
struct UserSummaryRow {
    #[diesel(sql_type = SqlUuid)]
    id: Uuid,
    #[diesel(sql_type = Text)]
    email: String,
    #[diesel(sql_type = Text)]
    name: String,
}

/// Diesel-backed implementation of the `UserDirectory` port.
#[derive(Clone)]
pub struct DieselUserDirectory {
    pool: DbPool,
}

impl DieselUserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_error(error: impl Into<StoreFailure>) -> UserDirectoryError {
    match error.into() {
        StoreFailure::Connection(message) | StoreFailure::MissingRelation(message) => {
            UserDirectoryError::unavailable(message)
        }
        StoreFailure::Query(message) => UserDirectoryError::query(message),
        StoreFailure::UniqueViolation { .. } => {
            UserDirectoryError::query("unexpected unique violation on read")
        }
    }
}

#[async_trait]
impl UserDirectory for DieselUserDirectory {
    async fn find_users(
        &self,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, UserSummary>, UserDirectoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let mut conn = self.pool.get().await.map_err(map_error)?;
        let rows: Vec<UserSummaryRow> = diesel::sql_query(FIND_USERS_SQL)
            .bind::<Array<SqlUuid>, _>(uuids)
            .load(&mut conn)
            .await
            .map_err(map_error)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let id = UserId::from_uuid(row.id);
                (
                    id,
                    UserSummary {
                        id,
                        email: row.email,
                        name: row.name,
                    },
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StoreFailure::MissingRelation("relation \"users\" does not exist".to_owned()), true)]
    #[case(StoreFailure::Connection("refused".to_owned()), true)]
    #[case(StoreFailure::Query("bad".to_owned()), false)]
    fn failures_map_to_port_errors(#[case] failure: StoreFailure, #[case] unavailable: bool) {
        assert_eq!(
            matches!(map_error(failure), UserDirectoryError::Unavailable { .. }),
            unavailable
        );
    }
}
