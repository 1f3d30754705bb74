//! Manual Downgrade Service
//!
//! Lets a user voluntarily step down a plan without a refund. Downgrades
//! take effect immediately: tier and credits are overwritten in place, and
//! the API response says so instead of promising access until period end.

use motorlot_shared::{SubscriptionTier, TargetPlan};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{EntitlementError, EntitlementResult};
use crate::events::{ActorType, EntitlementEventBuilder, EntitlementEventLogger, EntitlementEventType};
use crate::records::UserEntitlement;

/// Validate a downgrade request against the stored tier
///
/// Rejects requests for the plan the user is already on, and requests
/// that would move up the tier ladder (upgrades go through checkout).
pub fn validate_downgrade(
    current: SubscriptionTier,
    target: TargetPlan,
) -> EntitlementResult<SubscriptionTier> {
    let target_tier = target.tier();
    if current == target_tier {
        return Err(EntitlementError::AlreadyOnPlan(target.to_string()));
    }
    if target_tier.rank() > current.rank() {
        return Err(EntitlementError::InvalidPlan(format!(
            "cannot move up to {} via downgrade",
            target
        )));
    }
    Ok(target_tier)
}

pub struct DowngradeService {
    pool: PgPool,
    event_logger: EntitlementEventLogger,
}

impl DowngradeService {
    pub fn new(pool: PgPool) -> Self {
        let event_logger = EntitlementEventLogger::new(pool.clone());
        Self { pool, event_logger }
    }

    /// Step a user down to the requested plan
    ///
    /// Basic clears credits and the expiry (a free row never carries
    /// either); premium keeps the original expiry so a spotlight seller
    /// stepping down retains the time already paid for.
    pub async fn downgrade(
        &self,
        user_id: Uuid,
        target_plan: &str,
    ) -> EntitlementResult<UserEntitlement> {
        let target: TargetPlan = target_plan
            .parse()
            .map_err(|_| EntitlementError::InvalidPlan(target_plan.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let current: Option<UserEntitlement> = sqlx::query_as(
            r#"
            SELECT id, subscription_tier, premium_credits_remaining,
                   subscription_expires_at, subscription_started_at
            FROM users WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let current = current.ok_or(EntitlementError::NotFound("user"))?;
        let from_tier = current.tier();
        let target_tier = validate_downgrade(from_tier, target)?;

        let updated: UserEntitlement = match target_tier {
            SubscriptionTier::Free => {
                sqlx::query_as(
                    r#"
                    UPDATE users SET
                        subscription_tier = 'free',
                        premium_credits_remaining = 0,
                        subscription_expires_at = NULL,
                        updated_at = NOW()
                    WHERE id = $1
                    RETURNING id, subscription_tier, premium_credits_remaining,
                              subscription_expires_at, subscription_started_at
                    "#,
                )
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?
            }
            tier => {
                sqlx::query_as(
                    r#"
                    UPDATE users SET
                        subscription_tier = $1,
                        premium_credits_remaining = $2,
                        updated_at = NOW()
                    WHERE id = $3
                    RETURNING id, subscription_tier, premium_credits_remaining,
                              subscription_expires_at, subscription_started_at
                    "#,
                )
                .bind(tier.as_str())
                .bind(tier.credit_allotment())
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            from_tier = %from_tier,
            to_tier = %target_tier,
            "Subscription downgraded"
        );

        if let Err(e) = self
            .event_logger
            .log_event(
                EntitlementEventBuilder::new(user_id, EntitlementEventType::PlanDowngraded)
                    .data(serde_json::json!({
                        "from_tier": from_tier.as_str(),
                        "to_tier": target_tier.as_str(),
                    }))
                    .actor(user_id, ActorType::User),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to log downgrade event");
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spotlight_to_premium_is_valid() {
        let tier = validate_downgrade(SubscriptionTier::Spotlight, TargetPlan::Premium).unwrap();
        assert_eq!(tier, SubscriptionTier::Premium);
    }

    #[test]
    fn test_premium_to_basic_is_valid() {
        let tier = validate_downgrade(SubscriptionTier::Premium, TargetPlan::Basic).unwrap();
        assert_eq!(tier, SubscriptionTier::Free);
    }

    #[test]
    fn test_spotlight_to_basic_is_valid() {
        let tier = validate_downgrade(SubscriptionTier::Spotlight, TargetPlan::Basic).unwrap();
        assert_eq!(tier, SubscriptionTier::Free);
    }

    #[test]
    fn test_same_plan_is_rejected() {
        let err = validate_downgrade(SubscriptionTier::Premium, TargetPlan::Premium).unwrap_err();
        assert!(matches!(err, EntitlementError::AlreadyOnPlan(_)));

        let err = validate_downgrade(SubscriptionTier::Free, TargetPlan::Basic).unwrap_err();
        assert!(matches!(err, EntitlementError::AlreadyOnPlan(_)));
    }

    #[test]
    fn test_upgrade_via_downgrade_is_rejected() {
        // A free user asking to "downgrade" to premium would get 5 credits
        // without paying
        let err = validate_downgrade(SubscriptionTier::Free, TargetPlan::Premium).unwrap_err();
        assert!(matches!(err, EntitlementError::InvalidPlan(_)));
    }
}
