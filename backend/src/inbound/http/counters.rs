//! Counter HTTP handlers.
//!
//! ```text
//! GET   /api/v1/counters
//! POST  /api/v1/counters
//! GET   /api/v1/counters/{id}
//! PATCH /api/v1/counters/{id}
//! POST  /api/v1/counters/{id}/assign-device
//! GET   /api/v1/counters/{id}/stats
//! ```

use actix_web::{HttpResponse, get, patch, post, web};

use crate::domain::{
    BranchId, CounterAssignment, CounterChanges, CounterDraft, CounterId, Error,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::branches_dto::parse_body;
use crate::inbound::http::counters_dto::{
    AssignDeviceRequest, CounterListItemResponse, CounterListQuery, CounterResponse,
    CounterStatsResponse, CreateCounterRequest, UpdateCounterRequest,
};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_uuid;

fn counter_id(raw: &str) -> Result<CounterId, Error> {
    parse_uuid(raw, "id").map(CounterId::new)
}

/// List counters of live branches.
#[utoipa::path(
    get,
    path = "/api/v1/counters",
    params(CounterListQuery),
    responses(
        (status = 200, description = "Counters", body = [CounterListItemResponse]),
        (status = 400, description = "Invalid branch id", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["counters"],
    operation_id = "listCounters"
)]
#[get("/counters")]
pub async fn list_counters(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<CounterListQuery>,
) -> ApiResult<web::Json<Vec<CounterListItemResponse>>> {
    session.require_user_id()?;
    let branch = query
        .into_inner()
        .branch
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_uuid(&raw, "branch").map(BranchId::new))
        .transpose()?;
    let items = state.counters_query.list(branch).await?;
    Ok(web::Json(items.into_iter().map(Into::into).collect()))
}

/// Create a counter.
#[utoipa::path(
    post,
    path = "/api/v1/counters",
    request_body = CreateCounterRequest,
    responses(
        (status = 201, description = "Counter created", body = CounterResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["counters"],
    operation_id = "createCounter"
)]
#[post("/counters")]
pub async fn create_counter(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateCounterRequest>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_user_id()?;
    let draft: CounterDraft = parse_body(payload.into_inner())?;
    let detail = state.counters.create(&actor, draft).await?;
    Ok(HttpResponse::Created().json(CounterResponse::from(detail)))
}

/// Fetch one counter.
#[utoipa::path(
    get,
    path = "/api/v1/counters/{id}",
    params(("id" = String, Path, description = "Counter id")),
    responses(
        (status = 200, description = "Counter", body = CounterResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["counters"],
    operation_id = "getCounter"
)]
#[get("/counters/{id}")]
pub async fn get_counter(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CounterResponse>> {
    session.require_user_id()?;
    let id = counter_id(&path)?;
    let detail = state.counters_query.get(&id).await?;
    Ok(web::Json(CounterResponse::from(detail)))
}

/// Partially update a counter. An empty `device_id` detaches the device.
#[utoipa::path(
    patch,
    path = "/api/v1/counters/{id}",
    params(("id" = String, Path, description = "Counter id")),
    request_body = UpdateCounterRequest,
    responses(
        (status = 200, description = "Updated counter", body = CounterResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["counters"],
    operation_id = "updateCounter"
)]
#[patch("/counters/{id}")]
pub async fn update_counter(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<UpdateCounterRequest>,
) -> ApiResult<web::Json<CounterResponse>> {
    let actor = session.require_user_id()?;
    let id = counter_id(&path)?;
    let changes: CounterChanges = parse_body(payload.into_inner())?;
    let detail = state.counters.update(&actor, &id, changes).await?;
    Ok(web::Json(CounterResponse::from(detail)))
}

/// Bind a device to a counter.
#[utoipa::path(
    post,
    path = "/api/v1/counters/{id}/assign-device",
    params(("id" = String, Path, description = "Counter id")),
    request_body = AssignDeviceRequest,
    responses(
        (status = 200, description = "Counter with the device", body = CounterResponse),
        (status = 400, description = "Device held elsewhere or invalid", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["counters"],
    operation_id = "assignCounterDevice"
)]
#[post("/counters/{id}/assign-device")]
pub async fn assign_device(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<AssignDeviceRequest>,
) -> ApiResult<web::Json<CounterResponse>> {
    let actor = session.require_user_id()?;
    let id = counter_id(&path)?;
    let assignment: CounterAssignment = parse_body(payload.into_inner())?;
    let detail = state.counters.assign_device(&actor, &id, assignment).await?;
    Ok(web::Json(CounterResponse::from(detail)))
}

/// Usage statistics for a counter.
#[utoipa::path(
    get,
    path = "/api/v1/counters/{id}/stats",
    params(("id" = String, Path, description = "Counter id")),
    responses(
        (status = 200, description = "Counter statistics", body = CounterStatsResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["counters"],
    operation_id = "counterStats"
)]
#[get("/counters/{id}/stats")]
pub async fn counter_stats(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CounterStatsResponse>> {
    session.require_user_id()?;
    let id = counter_id(&path)?;
    let stats = state.counters_query.stats(&id).await?;
    Ok(web::Json(CounterStatsResponse::from(stats)))
}

#[cfg(test)]
#[path = "counters_tests.rs"]
mod tests;
