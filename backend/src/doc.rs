//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every branch, counter, sync and health endpoint along
//! with the domain schema wrappers from [`crate::inbound::http::schemas`].
//! Swagger UI serves it in debug builds and `openapi-dump` prints it for
//! client generation.

use crate::inbound::http::schemas::{
    BranchConfigurationSchema, BranchSettingsSchema, ErrorCodeSchema, ErrorSchema,
    OperationalHoursEntrySchema, WeekdaySchema,
};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Add the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by the clinic identity service.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Clinic branch backend API",
        description = "Branch, counter and offline sync endpoints for clinic front desks."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::branches::search_branches,
        crate::inbound::http::branches::create_branch,
        crate::inbound::http::branches::branch_geo,
        crate::inbound::http::branches::export_branches,
        crate::inbound::http::branches::get_branch,
        crate::inbound::http::branches::update_branch,
        crate::inbound::http::branches::delete_branch,
        crate::inbound::http::branches::transition_eod,
        crate::inbound::http::branches::branch_stats,
        crate::inbound::http::branches::get_configuration,
        crate::inbound::http::branches::save_configuration,
        crate::inbound::http::counters::list_counters,
        crate::inbound::http::counters::create_counter,
        crate::inbound::http::counters::get_counter,
        crate::inbound::http::counters::update_counter,
        crate::inbound::http::counters::assign_device,
        crate::inbound::http::counters::counter_stats,
        crate::inbound::http::sync::sync,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        WeekdaySchema,
        BranchSettingsSchema,
        OperationalHoursEntrySchema,
        BranchConfigurationSchema,
    )),
    tags(
        (name = "branches", description = "Branch records, EOD locks and configuration"),
        (name = "counters", description = "Front-desk counters and device binding"),
        (name = "sync", description = "Incremental sync for offline clients"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
