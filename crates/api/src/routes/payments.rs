//! Confirmed-payment event relay
//!
//! Serves both the production webhook relay and the manual/test trigger.
//! Signature verification happens upstream; this endpoint trusts the event
//! but stays safe against duplicate delivery via the grant engine's
//! idempotency ledger.

use axum::extract::State;
use axum::Json;
use motorlot_entitlements::{GrantOutcome, PaymentEvent};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentEventRequest {
    #[serde(alias = "idempotencyKey")]
    pub idempotency_key: String,
    #[serde(alias = "userId")]
    pub user_id: Uuid,
    /// Amount paid in minor currency units
    #[serde(alias = "amountCents", alias = "amountPaid")]
    pub amount_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "usd".to_string()
}

/// Apply a confirmed payment to the user's entitlement
///
/// A redelivered event returns 200 with `applied: false` so at-least-once
/// relays stop retrying; a sub-threshold amount is a 422, not a silent
/// no-op.
pub async fn payment_event(
    State(state): State<AppState>,
    Json(request): Json<PaymentEventRequest>,
) -> ApiResult<Json<GrantOutcome>> {
    let event = PaymentEvent {
        event_id: request.idempotency_key,
        user_id: request.user_id,
        amount_cents: request.amount_cents,
        currency: request.currency,
    };

    let outcome = state.entitlements.grants.apply_payment(&event).await?;
    Ok(Json(outcome))
}
