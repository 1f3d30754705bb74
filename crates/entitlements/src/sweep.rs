//! Expiry Reconciliation Job
//!
//! Converges stored rows to what the resolver already reports: paid tiers
//! whose expiry has passed collapse to free. One bounded bulk update, not
//! a row-by-row loop; the prior tier is captured through a CTE so the
//! audit trail records what each user expired from.

use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::EntitlementResult;
use crate::events::{EntitlementEventBuilder, EntitlementEventLogger, EntitlementEventType};

/// Result of a reconciliation sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    pub processed_count: u64,
}

#[derive(Debug, sqlx::FromRow)]
struct SweptUserRow {
    id: Uuid,
    prior_tier: String,
    expired_at: Option<OffsetDateTime>,
}

pub struct SweepService {
    pool: PgPool,
    event_logger: EntitlementEventLogger,
}

impl SweepService {
    pub fn new(pool: PgPool) -> Self {
        let event_logger = EntitlementEventLogger::new(pool.clone());
        Self { pool, event_logger }
    }

    /// Downgrade every user whose stored expiry has passed
    ///
    /// The expiry column is nulled along with the tier so a free row never
    /// carries grant state; the expired timestamp survives in the audit
    /// log instead.
    pub async fn sweep_expired(&self, now: OffsetDateTime) -> EntitlementResult<SweepOutcome> {
        let swept: Vec<SweptUserRow> = sqlx::query_as(
            r#"
            WITH expired AS (
                SELECT id, subscription_tier, subscription_expires_at
                FROM users
                WHERE subscription_tier IN ('premium', 'spotlight')
                  AND subscription_expires_at < $1
                FOR UPDATE
            )
            UPDATE users u SET
                subscription_tier = 'free',
                premium_credits_remaining = 0,
                subscription_expires_at = NULL,
                updated_at = NOW()
            FROM expired e
            WHERE u.id = e.id
            RETURNING e.id, e.subscription_tier AS prior_tier,
                      e.subscription_expires_at AS expired_at
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let processed_count = swept.len() as u64;

        if processed_count == 0 {
            tracing::info!("No expired subscriptions found");
            return Ok(SweepOutcome { processed_count });
        }

        for user in &swept {
            tracing::debug!(
                user_id = %user.id,
                prior_tier = %user.prior_tier,
                expired_at = ?user.expired_at,
                "Expired subscription downgraded to free"
            );

            if let Err(e) = self
                .event_logger
                .log_event(
                    EntitlementEventBuilder::new(
                        user.id,
                        EntitlementEventType::SubscriptionExpired,
                    )
                    .data(serde_json::json!({
                        "prior_tier": user.prior_tier,
                        "expired_at": user.expired_at.map(|t| t.to_string()),
                    })),
                )
                .await
            {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to log expiry event");
            }
        }

        tracing::info!(
            processed = processed_count,
            "Expired subscription sweep complete"
        );

        Ok(SweepOutcome { processed_count })
    }
}
