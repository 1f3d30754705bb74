//! Operator routes: manual sweep trigger and invariant checks

use axum::extract::{Extension, State};
use axum::Json;
use motorlot_entitlements::InvariantCheckSummary;
use serde::Serialize;
use time::OffsetDateTime;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub processed_count: u64,
    pub message: String,
}

/// Trigger the expiry reconciliation sweep
///
/// The worker runs this on a schedule; the endpoint exists for operators
/// to force convergence after incidents.
pub async fn sweep_expired(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<SweepResponse>> {
    tracing::info!(operator_id = %auth_user.user_id, "Manual sweep triggered");

    let outcome = state
        .entitlements
        .sweep
        .sweep_expired(OffsetDateTime::now_utc())
        .await?;

    Ok(Json(SweepResponse {
        processed_count: outcome.processed_count,
        message: format!("Processed {} expired subscriptions", outcome.processed_count),
    }))
}

/// Run all entitlement invariant checks
pub async fn run_invariants(
    State(state): State<AppState>,
) -> ApiResult<Json<InvariantCheckSummary>> {
    let summary = state.entitlements.invariants.run_all_checks().await?;
    Ok(Json(summary))
}
