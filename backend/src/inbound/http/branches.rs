//! Branch HTTP handlers.
//!
//! ```text
//! GET    /api/v1/branches
//! POST   /api/v1/branches
//! GET    /api/v1/branches/geo
//! GET    /api/v1/branches/export
//! GET    /api/v1/branches/{id}
//! PATCH  /api/v1/branches/{id}
//! DELETE /api/v1/branches/{id}
//! POST   /api/v1/branches/{id}/eod
//! GET    /api/v1/branches/{id}/stats
//! GET    /api/v1/branches/{id}/configuration
//! PUT    /api/v1/branches/{id}/configuration
//! ```
//!
//! `geo` and `export` must be registered before `{id}` so the literal
//! segments win.

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, delete, get, patch, post, put, web};

use crate::domain::{
    BranchChanges, BranchConfiguration, BranchDraft, BranchId, BranchSearch, EodRequest, Error,
    ExportRequest,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::branches_dto::{
    BranchExportResponse, BranchGeoResponse, BranchPageResponse, BranchResponse,
    BranchSearchQuery, BranchStatsResponse, CreateBranchRequest, EodActionRequest, ExportQuery,
    UpdateBranchRequest, parse_body,
};
use crate::inbound::http::schemas::{BranchConfigurationSchema, ErrorSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_uuid;

fn branch_id(raw: &str) -> Result<BranchId, Error> {
    parse_uuid(raw, "id").map(BranchId::new)
}

/// Search branches.
#[utoipa::path(
    get,
    path = "/api/v1/branches",
    params(BranchSearchQuery),
    responses(
        (status = 200, description = "Page of branches", body = BranchPageResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["branches"],
    operation_id = "searchBranches"
)]
#[get("/branches")]
pub async fn search_branches(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<BranchSearchQuery>,
) -> ApiResult<web::Json<BranchPageResponse>> {
    session.require_user_id()?;
    let search: BranchSearch = parse_body(query.into_inner())?;
    let page = state.branches_query.search(search).await?;
    Ok(web::Json(BranchPageResponse::from(page)))
}

/// Create a branch.
#[utoipa::path(
    post,
    path = "/api/v1/branches",
    request_body = CreateBranchRequest,
    responses(
        (status = 201, description = "Branch created", body = BranchResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["branches"],
    operation_id = "createBranch"
)]
#[post("/branches")]
pub async fn create_branch(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateBranchRequest>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_user_id()?;
    let draft: BranchDraft = parse_body(payload.into_inner())?;
    let detail = state.branches.create(&actor, draft).await?;
    Ok(HttpResponse::Created().json(BranchResponse::from(detail)))
}

/// Map projection of live branches.
#[utoipa::path(
    get,
    path = "/api/v1/branches/geo",
    responses(
        (status = 200, description = "Branch locations", body = [BranchGeoResponse]),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["branches"],
    operation_id = "branchGeo"
)]
#[get("/branches/geo")]
pub async fn branch_geo(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<BranchGeoResponse>>> {
    session.require_user_id()?;
    let items = state.branches_query.geo().await?;
    Ok(web::Json(items.into_iter().map(Into::into).collect()))
}

/// Download branches as a JSON attachment.
#[utoipa::path(
    get,
    path = "/api/v1/branches/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "Export document", body = BranchExportResponse),
        (status = 400, description = "Unsupported format", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["branches"],
    operation_id = "exportBranches"
)]
#[get("/branches/export")]
pub async fn export_branches(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<ExportQuery>,
) -> ApiResult<HttpResponse> {
    session.require_user_id()?;
    let request: ExportRequest = parse_body(query.into_inner())?;
    let export = state.branches_query.export(request).await?;
    let file_name = format!(
        "branches_{}.json",
        export.exported_at.format("%Y%m%d_%H%M%S")
    );
    Ok(HttpResponse::Ok()
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file_name)],
        })
        .json(BranchExportResponse::from(export)))
}

/// Fetch one branch.
#[utoipa::path(
    get,
    path = "/api/v1/branches/{id}",
    params(("id" = String, Path, description = "Branch id")),
    responses(
        (status = 200, description = "Branch", body = BranchResponse),
        (status = 400, description = "Invalid id", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["branches"],
    operation_id = "getBranch"
)]
#[get("/branches/{id}")]
pub async fn get_branch(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<BranchResponse>> {
    session.require_user_id()?;
    let id = branch_id(&path)?;
    let detail = state.branches_query.get(&id).await?;
    Ok(web::Json(BranchResponse::from(detail)))
}

/// Partially update a branch.
#[utoipa::path(
    patch,
    path = "/api/v1/branches/{id}",
    params(("id" = String, Path, description = "Branch id")),
    request_body = UpdateBranchRequest,
    responses(
        (status = 200, description = "Updated branch", body = BranchResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["branches"],
    operation_id = "updateBranch"
)]
#[patch("/branches/{id}")]
pub async fn update_branch(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<UpdateBranchRequest>,
) -> ApiResult<web::Json<BranchResponse>> {
    let actor = session.require_user_id()?;
    let id = branch_id(&path)?;
    let changes: BranchChanges = parse_body(payload.into_inner())?;
    let detail = state.branches.update(&actor, &id, changes).await?;
    Ok(web::Json(BranchResponse::from(detail)))
}

/// Soft-delete a branch.
#[utoipa::path(
    delete,
    path = "/api/v1/branches/{id}",
    params(("id" = String, Path, description = "Branch id")),
    responses(
        (status = 204, description = "Branch deleted"),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["branches"],
    operation_id = "deleteBranch"
)]
#[delete("/branches/{id}")]
pub async fn delete_branch(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_user_id()?;
    let id = branch_id(&path)?;
    state.branches.delete(&actor, &id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Lock or unlock a branch for the day.
#[utoipa::path(
    post,
    path = "/api/v1/branches/{id}/eod",
    params(("id" = String, Path, description = "Branch id")),
    request_body = EodActionRequest,
    responses(
        (status = 200, description = "Branch after the transition", body = BranchResponse),
        (status = 400, description = "Invalid action", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Already in the requested state", body = ErrorSchema)
    ),
    tags = ["branches"],
    operation_id = "transitionBranchEod"
)]
#[post("/branches/{id}/eod")]
pub async fn transition_eod(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<EodActionRequest>,
) -> ApiResult<web::Json<BranchResponse>> {
    let actor = session.require_user_id()?;
    let id = branch_id(&path)?;
    let request: EodRequest = parse_body(payload.into_inner())?;
    let detail = state.branches.transition_eod(&actor, &id, request).await?;
    Ok(web::Json(BranchResponse::from(detail)))
}

/// Operational statistics for a branch.
#[utoipa::path(
    get,
    path = "/api/v1/branches/{id}/stats",
    params(("id" = String, Path, description = "Branch id")),
    responses(
        (status = 200, description = "Branch statistics", body = BranchStatsResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["branches"],
    operation_id = "branchStats"
)]
#[get("/branches/{id}/stats")]
pub async fn branch_stats(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<BranchStatsResponse>> {
    session.require_user_id()?;
    let id = branch_id(&path)?;
    let stats = state.branches_query.stats(&id).await?;
    Ok(web::Json(BranchStatsResponse::from(stats)))
}

/// Read the branch configuration, or defaults when none was saved.
#[utoipa::path(
    get,
    path = "/api/v1/branches/{id}/configuration",
    params(("id" = String, Path, description = "Branch id")),
    responses(
        (status = 200, description = "Branch configuration", body = BranchConfigurationSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["branches"],
    operation_id = "getBranchConfiguration"
)]
#[get("/branches/{id}/configuration")]
pub async fn get_configuration(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<BranchConfiguration>> {
    session.require_user_id()?;
    let id = branch_id(&path)?;
    let configuration = state.branches_query.configuration(&id).await?;
    Ok(web::Json(configuration))
}

/// Replace the branch configuration.
#[utoipa::path(
    put,
    path = "/api/v1/branches/{id}/configuration",
    params(("id" = String, Path, description = "Branch id")),
    request_body = BranchConfigurationSchema,
    responses(
        (status = 200, description = "Saved configuration", body = BranchConfigurationSchema),
        (status = 400, description = "Invalid configuration", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["branches"],
    operation_id = "saveBranchConfiguration"
)]
#[put("/branches/{id}/configuration")]
pub async fn save_configuration(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<BranchConfiguration>,
) -> ApiResult<web::Json<BranchConfiguration>> {
    let actor = session.require_user_id()?;
    let id = branch_id(&path)?;
    let stored = state
        .branches
        .save_configuration(&actor, &id, payload.into_inner())
        .await?;
    Ok(web::Json(stored.configuration))
}

#[cfg(test)]
#[path = "branches_tests.rs"]
mod tests;
