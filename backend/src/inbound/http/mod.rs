//! HTTP inbound adapter exposing REST endpoints.

use actix_web::web;

pub mod branches;
pub mod branches_dto;
pub mod counters;
pub mod counters_dto;
pub mod error;
pub mod health;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
pub mod sync;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;
use error::{json_error_handler, query_error_handler};

/// Register every API handler on a scope, conventionally `/api/v1`.
///
/// Body and query extraction failures are rendered as domain errors.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(branches::search_branches)
        .service(branches::create_branch)
        .service(branches::branch_geo)
        .service(branches::export_branches)
        .service(branches::get_branch)
        .service(branches::update_branch)
        .service(branches::delete_branch)
        .service(branches::transition_eod)
        .service(branches::branch_stats)
        .service(branches::get_configuration)
        .service(branches::save_configuration)
        .service(counters::list_counters)
        .service(counters::create_counter)
        .service(counters::get_counter)
        .service(counters::update_counter)
        .service(counters::assign_device)
        .service(counters::counter_stats)
        .service(sync::sync);
}
