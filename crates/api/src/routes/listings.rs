//! Listing routes: promote to featured and mark sold

use axum::extract::{Extension, Path, State};
use axum::Json;
use motorlot_entitlements::ListingView;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// Spend one premium credit to feature a listing
pub async fn promote_listing(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(listing_id): Path<Uuid>,
) -> ApiResult<Json<ListingView>> {
    let listing = state
        .entitlements
        .credits
        .promote_listing(auth_user.user_id, listing_id)
        .await?;

    Ok(Json(listing))
}

/// Mark a listing sold; revokes the featured flag without refunding credits
pub async fn mark_sold(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(listing_id): Path<Uuid>,
) -> ApiResult<Json<ListingView>> {
    let listing = state
        .entitlements
        .sales
        .mark_sold(auth_user.user_id, listing_id)
        .await?;

    Ok(Json(listing))
}
