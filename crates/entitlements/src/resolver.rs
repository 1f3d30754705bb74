//! Effective-State Resolver
//!
//! Computes the subscription state the rest of the system should observe
//! from a stored entitlement and the current time. Expiry is applied
//! lazily on read; storage is converged separately by the reconciliation
//! sweep, so these functions never write.

use motorlot_shared::SubscriptionTier;
use serde::Serialize;
use time::OffsetDateTime;

use crate::records::UserEntitlement;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Subscription state as observed at a single instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveSubscription {
    pub tier: SubscriptionTier,
    pub credits_remaining: i32,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
}

/// Resolve the observable subscription state for `now`
///
/// A stored paid tier whose expiry has passed resolves to the free tier
/// with zero credits even when the row has not been swept yet. This is the
/// authoritative view for every user-facing read.
pub fn resolve_effective(entitlement: &UserEntitlement, now: OffsetDateTime) -> EffectiveSubscription {
    let tier = entitlement.tier();

    if tier == SubscriptionTier::Free {
        return EffectiveSubscription {
            tier: SubscriptionTier::Free,
            credits_remaining: 0,
            is_active: true,
            expires_at: None,
            days_remaining: None,
        };
    }

    match entitlement.subscription_expires_at {
        Some(expires_at) if expires_at <= now => EffectiveSubscription {
            tier: SubscriptionTier::Free,
            credits_remaining: 0,
            is_active: false,
            expires_at: Some(expires_at),
            days_remaining: None,
        },
        expires_at => EffectiveSubscription {
            tier,
            credits_remaining: entitlement.premium_credits_remaining,
            is_active: true,
            expires_at,
            days_remaining: expires_at.and_then(|e| days_remaining(e, now)),
        },
    }
}

/// Credits the user may actually spend at `now`
///
/// This is the single source of truth for credit checks: a stale nonzero
/// counter on an expired grant is not spendable, regardless of whether the
/// sweep has converged the row yet.
pub fn spendable_credits(entitlement: &UserEntitlement, now: OffsetDateTime) -> i32 {
    resolve_effective(entitlement, now).credits_remaining
}

/// Whole days until `expires_at`, rounded up; `None` once non-positive
fn days_remaining(expires_at: OffsetDateTime, now: OffsetDateTime) -> Option<i64> {
    let seconds = (expires_at - now).whole_seconds();
    if seconds <= 0 {
        return None;
    }
    Some((seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY)
}
