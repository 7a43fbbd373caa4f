//! Axum router wiring.
//!
//! Console routes live under `/gateway/limit/ip`, the access check under
//! `/gateway/access`, plus the operational endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::admin::handlers;
use crate::{app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/gateway/limit/ip", get(handlers::find_list_page))
        .route("/gateway/limit/ip/whitelist", get(handlers::find_white_list))
        .route("/gateway/limit/ip/blacklist", get(handlers::find_black_list))
        .route("/gateway/limit/ip/add", post(handlers::add_ip_limit_policy))
        .route("/gateway/limit/ip/update", post(handlers::update_ip_limit_policy))
        .route("/gateway/limit/ip/remove", post(handlers::remove_ip_limit_policy))
        .route("/gateway/limit/ip/apis/add", post(handlers::add_ip_limit_apis))
        .route("/gateway/limit/ip/apis/clear", post(handlers::clear_ip_limit_apis))
        .route("/gateway/limit/ip/:policy_id", get(handlers::get_ip_limit_policy))
        .route("/gateway/limit/ip/:policy_id/apis", get(handlers::find_ip_limit_api_list))
        .route("/gateway/access/check", get(handlers::check_access))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
