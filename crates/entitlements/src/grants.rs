//! Entitlement Grant Engine
//!
//! Applies a confirmed payment to a user's entitlement. The payment
//! collaborator verifies authenticity upstream; this engine defends
//! against duplicate delivery with an idempotency ledger keyed on the
//! provider's event id.

use motorlot_shared::SubscriptionTier;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::{EntitlementError, EntitlementResult};
use crate::events::{ActorType, EntitlementEventBuilder, EntitlementEventLogger, EntitlementEventType};
use crate::plans::PlanConfig;
use crate::records::UserEntitlement;
use crate::resolver::resolve_effective;

/// A confirmed payment as delivered by the payment collaborator
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    /// Provider-side idempotency key; at-least-once delivery is expected
    pub event_id: String,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
}

/// Result of applying a payment event
#[derive(Debug, Clone, Serialize)]
pub struct GrantOutcome {
    /// False when the event was a duplicate and the grant was not reapplied
    pub applied: bool,
    pub entitlement: UserEntitlement,
    pub message: String,
}

/// Translates confirmed payments into tier grants
pub struct GrantEngine {
    pool: PgPool,
    plans: PlanConfig,
    event_logger: EntitlementEventLogger,
}

impl GrantEngine {
    pub fn new(pool: PgPool, plans: PlanConfig) -> Self {
        let event_logger = EntitlementEventLogger::new(pool.clone());
        Self {
            pool,
            plans,
            event_logger,
        }
    }

    pub fn plans(&self) -> &PlanConfig {
        &self.plans
    }

    /// Apply a confirmed payment event
    ///
    /// Atomically claims the event id in the ledger before touching the
    /// entitlement. The INSERT...ON CONFLICT DO NOTHING...RETURNING pattern
    /// ensures only one concurrent delivery can claim processing rights; a
    /// redelivered event is acknowledged without reapplying the grant, so
    /// it cannot reset an already-spent credit pool.
    pub async fn apply_payment(&self, event: &PaymentEvent) -> EntitlementResult<GrantOutcome> {
        // Events that failed transiently ('error') may be re-claimed on the
        // provider's retry, as may events stuck in 'processing' past the
        // timeout (crashed worker). Successful and rejected events may not.
        const PROCESSING_TIMEOUT_MINUTES: i32 = 30;

        let claimed: Option<(String,)> = sqlx::query_as(
            r#"
            INSERT INTO payment_events
                (event_id, user_id, amount_cents, currency, processing_result, processing_started_at)
            VALUES ($1, $2, $3, $4, 'processing', NOW())
            ON CONFLICT (event_id) DO UPDATE SET
                processing_result = 'processing',
                processing_started_at = NOW()
            WHERE payment_events.processing_result = 'error'
               OR (payment_events.processing_result = 'processing'
                   AND payment_events.processing_started_at
                       < NOW() - ($5 || ' minutes')::INTERVAL)
            RETURNING event_id
            "#,
        )
        .bind(&event.event_id)
        .bind(event.user_id)
        .bind(event.amount_cents)
        .bind(&event.currency)
        .bind(PROCESSING_TIMEOUT_MINUTES)
        .fetch_optional(&self.pool)
        .await?;

        if claimed.is_none() {
            let existing_status: Option<(String,)> = sqlx::query_as(
                "SELECT processing_result FROM payment_events WHERE event_id = $1",
            )
            .bind(&event.event_id)
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten();

            let reason = match existing_status {
                Some((status,)) if status == "success" => "already processed successfully",
                Some((status,)) if status == "rejected" => "already rejected",
                Some((status,)) if status == "processing" => {
                    "currently being processed by another worker"
                }
                Some(_) => "exists with another status",
                None => "unknown (race condition?)",
            };

            tracing::info!(
                event_id = %event.event_id,
                user_id = %event.user_id,
                reason = %reason,
                "Duplicate payment event, grant not reapplied"
            );

            let entitlement = self.fetch_entitlement(event.user_id).await?;

            if let Err(e) = self
                .event_logger
                .log_event(
                    EntitlementEventBuilder::new(
                        event.user_id,
                        EntitlementEventType::PaymentDuplicate,
                    )
                    .data(serde_json::json!({ "event_id": event.event_id }))
                    .actor_opt(None, ActorType::PaymentProvider),
                )
                .await
            {
                tracing::warn!(error = %e, "Failed to log duplicate payment event");
            }

            return Ok(GrantOutcome {
                applied: false,
                entitlement,
                message: "payment event already processed".to_string(),
            });
        }

        let result = self.apply_grant(event).await;

        let (processing_result, error_message) = match &result {
            Ok(_) => ("success", None),
            Err(EntitlementError::InvalidPaymentAmount(_)) => {
                ("rejected", result.as_ref().err().map(|e| e.to_string()))
            }
            Err(e) => ("error", Some(e.to_string())),
        };

        if let Err(e) = sqlx::query(
            r#"
            UPDATE payment_events
            SET processing_result = $1, error_message = $2
            WHERE event_id = $3
            "#,
        )
        .bind(processing_result)
        .bind(&error_message)
        .bind(&event.event_id)
        .execute(&self.pool)
        .await
        {
            tracing::error!(
                event_id = %event.event_id,
                error = %e,
                "Failed to record payment processing result"
            );
        }

        result
    }

    /// The grant itself: read-check-write in one transaction
    async fn apply_grant(&self, event: &PaymentEvent) -> EntitlementResult<GrantOutcome> {
        let grant = self.plans.plan_for_amount(event.amount_cents).ok_or_else(|| {
            tracing::warn!(
                event_id = %event.event_id,
                user_id = %event.user_id,
                amount_cents = event.amount_cents,
                "Payment amount below lowest plan threshold"
            );
            EntitlementError::InvalidPaymentAmount(event.amount_cents)
        })?;

        let now = OffsetDateTime::now_utc();
        let mut tx = self.pool.begin().await?;

        let current: Option<UserEntitlement> = sqlx::query_as(
            r#"
            SELECT id, subscription_tier, premium_credits_remaining,
                   subscription_expires_at, subscription_started_at
            FROM users WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(event.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let current = current.ok_or(EntitlementError::NotFound("user"))?;

        // The started-at anchor only resets when the user was not already
        // on an active paid grant; a top-up extends the same run.
        let prior = resolve_effective(&current, now);
        let had_active_paid_grant = prior.is_active && prior.tier != SubscriptionTier::Free;
        let started_at = if had_active_paid_grant {
            current.subscription_started_at.unwrap_or(now)
        } else {
            now
        };

        let expires_at = now + Duration::days(grant.duration_days);

        // A new purchase replaces the credit pool with the tier's fresh
        // allotment; remaining credits from the old grant do not carry over.
        let updated: UserEntitlement = sqlx::query_as(
            r#"
            UPDATE users SET
                subscription_tier = $1,
                premium_credits_remaining = $2,
                subscription_expires_at = $3,
                subscription_started_at = $4,
                updated_at = NOW()
            WHERE id = $5
            RETURNING id, subscription_tier, premium_credits_remaining,
                      subscription_expires_at, subscription_started_at
            "#,
        )
        .bind(grant.tier.as_str())
        .bind(grant.credits)
        .bind(expires_at)
        .bind(started_at)
        .bind(event.user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %event.user_id,
            event_id = %event.event_id,
            tier = %grant.tier,
            credits = grant.credits,
            expires_at = %expires_at,
            new_grant_run = !had_active_paid_grant,
            "Applied payment grant"
        );

        if let Err(e) = self
            .event_logger
            .log_event(
                EntitlementEventBuilder::new(event.user_id, EntitlementEventType::PaymentApplied)
                    .data(serde_json::json!({
                        "event_id": event.event_id,
                        "amount_cents": event.amount_cents,
                        "currency": event.currency,
                        "tier": grant.tier.as_str(),
                        "credits": grant.credits,
                        "expires_at": expires_at.to_string(),
                    }))
                    .actor_opt(None, ActorType::PaymentProvider),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to log payment grant event");
        }

        Ok(GrantOutcome {
            applied: true,
            entitlement: updated,
            message: format!("granted {} until {}", grant.tier, expires_at),
        })
    }

    async fn fetch_entitlement(&self, user_id: Uuid) -> EntitlementResult<UserEntitlement> {
        let entitlement: Option<UserEntitlement> = sqlx::query_as(
            r#"
            SELECT id, subscription_tier, premium_credits_remaining,
                   subscription_expires_at, subscription_started_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        entitlement.ok_or(EntitlementError::NotFound("user"))
    }
}

/// Whether a fresh grant should reset the started-at anchor
///
/// Pure form of the rule used inside `apply_grant`, kept separate so the
/// reset-vs-preserve behavior is testable without a database.
pub fn resets_started_at(current: &UserEntitlement, now: OffsetDateTime) -> bool {
    let prior = resolve_effective(current, now);
    !(prior.is_active && prior.tier != SubscriptionTier::Free)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entitlement(
        tier: &str,
        credits: i32,
        expires_at: Option<OffsetDateTime>,
        started_at: Option<OffsetDateTime>,
    ) -> UserEntitlement {
        UserEntitlement {
            id: Uuid::new_v4(),
            subscription_tier: tier.to_string(),
            premium_credits_remaining: credits,
            subscription_expires_at: expires_at,
            subscription_started_at: started_at,
        }
    }

    #[test]
    fn test_free_user_resets_started_at() {
        let now = OffsetDateTime::now_utc();
        assert!(resets_started_at(&entitlement("free", 0, None, None), now));
    }

    #[test]
    fn test_expired_grant_resets_started_at() {
        let now = OffsetDateTime::now_utc();
        let stored = entitlement(
            "premium",
            2,
            Some(now - Duration::days(1)),
            Some(now - Duration::days(61)),
        );
        assert!(resets_started_at(&stored, now));
    }

    #[test]
    fn test_active_topup_preserves_started_at() {
        let now = OffsetDateTime::now_utc();
        let stored = entitlement(
            "premium",
            2,
            Some(now + Duration::days(10)),
            Some(now - Duration::days(50)),
        );
        assert!(!resets_started_at(&stored, now));
    }
}
