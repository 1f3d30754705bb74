//! Subscription routes: effective state and voluntary downgrade

use axum::extract::{Extension, State};
use axum::Json;
use motorlot_entitlements::{EffectiveSubscription, UserEntitlement};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// Effective subscription for the authenticated user
///
/// Expiry is applied lazily here; the stored row may still say premium.
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<EffectiveSubscription>> {
    let effective = state
        .entitlements
        .effective_subscription(auth_user.user_id, OffsetDateTime::now_utc())
        .await?;

    Ok(Json(effective))
}

#[derive(Debug, Deserialize)]
pub struct DowngradeRequest {
    #[serde(alias = "targetPlan")]
    pub target_plan: String,
}

#[derive(Debug, Serialize)]
pub struct DowngradeResponse {
    pub entitlement: UserEntitlement,
    pub message: &'static str,
}

/// Voluntarily step down a plan
pub async fn downgrade(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<DowngradeRequest>,
) -> ApiResult<Json<DowngradeResponse>> {
    let entitlement = state
        .entitlements
        .downgrade
        .downgrade(auth_user.user_id, &request.target_plan)
        .await?;

    Ok(Json(DowngradeResponse {
        entitlement,
        // Downgrades apply immediately; no period-end grace is promised
        message: "Your plan has been downgraded, effective immediately.",
    }))
}
