//! Route assembly

mod admin;
mod listings;
mod payments;
mod subscription;

use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::json;

use crate::auth::{require_auth, require_operator};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let auth_state = state.auth_state();

    // Seller-facing operations
    let authed = Router::new()
        .route("/subscription", get(subscription::get_subscription))
        .route("/subscription/downgrade", post(subscription::downgrade))
        .route("/listings/{id}/promote", post(listings::promote_listing))
        .route("/listings/{id}/sold", post(listings::mark_sold))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            require_auth,
        ));

    // Operator-only: sweep trigger and invariant checks
    let operator = Router::new()
        .route("/admin/sweep-expired", post(admin::sweep_expired))
        .route("/admin/invariants", get(admin::run_invariants))
        .layer(middleware::from_fn(require_operator))
        .layer(middleware::from_fn_with_state(auth_state, require_auth));

    Router::new()
        .route("/health", get(health))
        // Confirmed-payment relay; authenticity is verified upstream by the
        // payment collaborator before events reach this deployment
        .route("/payments/events", post(payments::payment_event))
        .merge(authed)
        .merge(operator)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
