//! Offline sync handler.
//!
//! ```text
//! GET /api/v1/sync?last_sync=<rfc3339>&include=branches,counters
//! ```

use actix_web::{get, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{SyncPayload, SyncRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::branches_dto::{BranchRecord, CounterRecord};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_optional_timestamp;

/// Query string of `GET /sync`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SyncQueryParams {
    /// Only records updated after this instant. Absent means everything.
    pub last_sync: Option<String>,
    /// Comma-separated collections; defaults to `branches`.
    #[param(example = "branches,counters")]
    pub include: Option<String>,
}

fn split_include(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Changes since the client's last sync.
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncResponse {
    pub server_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<BranchRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counters: Option<Vec<CounterRecord>>,
    /// Requested collections this service does not own.
    pub skipped: Vec<String>,
}

impl From<SyncPayload> for SyncResponse {
    fn from(value: SyncPayload) -> Self {
        Self {
            server_time: value.server_time,
            branches: value
                .branches
                .map(|items| items.into_iter().map(Into::into).collect()),
            counters: value
                .counters
                .map(|items| items.into_iter().map(Into::into).collect()),
            skipped: value
                .skipped
                .into_iter()
                .map(|item| item.as_str().to_owned())
                .collect(),
        }
    }
}

/// Fetch records changed since `last_sync`.
#[utoipa::path(
    get,
    path = "/api/v1/sync",
    params(SyncQueryParams),
    responses(
        (status = 200, description = "Changed records", body = SyncResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["sync"],
    operation_id = "sync"
)]
#[get("/sync")]
pub async fn sync(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<SyncQueryParams>,
) -> ApiResult<web::Json<SyncResponse>> {
    session.require_user_id()?;
    let SyncQueryParams { last_sync, include } = query.into_inner();
    let last_sync = parse_optional_timestamp(last_sync.as_deref(), "last_sync")?;
    let include = include.as_deref().map(split_include);
    let request = SyncRequest::new(last_sync, include.as_deref())?;
    let payload = state.sync.sync(request).await?;
    Ok(web::Json(SyncResponse::from(payload)))
}
