// Test file - these are expected patterns in test code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Edge Case Tests for the Entitlement Engine
//!
//! Tests critical boundary conditions in:
//! - Effective-state resolution (ENT-R01 to ENT-R06)
//! - Payment-to-plan mapping (ENT-P01 to ENT-P05)
//! - Grant anchor behavior (ENT-G01 to ENT-G03)
//! - Downgrade validation (ENT-D01 to ENT-D04)

#[cfg(test)]
mod resolver_edge_cases {
    use crate::records::UserEntitlement;
    use crate::resolver::{resolve_effective, spendable_credits};
    use motorlot_shared::SubscriptionTier;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    fn stored(tier: &str, credits: i32, expires_in: Option<Duration>) -> (UserEntitlement, OffsetDateTime) {
        let now = OffsetDateTime::now_utc();
        let entitlement = UserEntitlement {
            id: Uuid::new_v4(),
            subscription_tier: tier.to_string(),
            premium_credits_remaining: credits,
            subscription_expires_at: expires_in.map(|d| now + d),
            subscription_started_at: None,
        };
        (entitlement, now)
    }

    // =========================================================================
    // ENT-R01: New user (free, 0 credits, no expiry) - active at any instant
    // =========================================================================
    #[test]
    fn test_new_user_resolves_active_free() {
        let (entitlement, now) = stored("free", 0, None);
        for offset in [Duration::ZERO, Duration::days(365), Duration::days(-365)] {
            let resolved = resolve_effective(&entitlement, now + offset);
            assert_eq!(resolved.tier, SubscriptionTier::Free);
            assert_eq!(resolved.credits_remaining, 0);
            assert!(resolved.is_active);
        }
    }

    // =========================================================================
    // ENT-R02: premium expired one second ago - resolves free/inactive even
    // though storage still says premium
    // =========================================================================
    #[test]
    fn test_lazy_expiry_overrides_stored_tier() {
        let (entitlement, now) = stored("premium", 5, Some(Duration::seconds(-1)));
        let resolved = resolve_effective(&entitlement, now);
        assert_eq!(resolved.tier, SubscriptionTier::Free);
        assert_eq!(resolved.credits_remaining, 0);
        assert!(!resolved.is_active);
        assert_eq!(entitlement.subscription_tier, "premium", "storage untouched");
    }

    // =========================================================================
    // ENT-R03: resolution twice with same inputs - identical results
    // =========================================================================
    #[test]
    fn test_reads_are_idempotent() {
        let (entitlement, now) = stored("spotlight", 8, Some(Duration::days(12)));
        assert_eq!(
            resolve_effective(&entitlement, now),
            resolve_effective(&entitlement, now)
        );
    }

    // =========================================================================
    // ENT-R04: unexpired grant reports days remaining, rounded up
    // =========================================================================
    #[test]
    fn test_days_remaining_half_day_counts_as_one() {
        let (entitlement, now) = stored("premium", 1, Some(Duration::hours(12)));
        let resolved = resolve_effective(&entitlement, now);
        assert_eq!(resolved.days_remaining, Some(1));
    }

    // =========================================================================
    // ENT-R05: exactly 60 days out reports 60, not 61
    // =========================================================================
    #[test]
    fn test_days_remaining_exact_days() {
        let (entitlement, now) = stored("premium", 5, Some(Duration::days(60)));
        let resolved = resolve_effective(&entitlement, now);
        assert_eq!(resolved.days_remaining, Some(60));
    }

    // =========================================================================
    // ENT-R06: stale counter after expiry is not spendable - closes the
    // stored-counter exploit
    // =========================================================================
    #[test]
    fn test_expired_grant_credits_unspendable() {
        let (entitlement, now) = stored("spotlight", 10, Some(Duration::minutes(-5)));
        assert_eq!(spendable_credits(&entitlement, now), 0);
    }
}

#[cfg(test)]
mod plan_mapping {
    use crate::plans::PlanConfig;
    use motorlot_shared::SubscriptionTier;

    // =========================================================================
    // ENT-P01: $29.99 buys premium - 5 credits, 60 days
    // =========================================================================
    #[test]
    fn test_premium_purchase() {
        let grant = PlanConfig::default().plan_for_amount(2999).unwrap();
        assert_eq!(
            (grant.tier, grant.credits, grant.duration_days),
            (SubscriptionTier::Premium, 5, 60)
        );
    }

    // =========================================================================
    // ENT-P02: $49.99 buys spotlight - 10 credits, 90 days
    // =========================================================================
    #[test]
    fn test_spotlight_purchase() {
        let grant = PlanConfig::default().plan_for_amount(4999).unwrap();
        assert_eq!(
            (grant.tier, grant.credits, grant.duration_days),
            (SubscriptionTier::Spotlight, 10, 90)
        );
    }

    // =========================================================================
    // ENT-P03: one cent short of premium buys nothing
    // =========================================================================
    #[test]
    fn test_below_threshold_rejected() {
        assert!(PlanConfig::default().plan_for_amount(2998).is_none());
    }

    // =========================================================================
    // ENT-P04: one cent short of spotlight still buys premium
    // =========================================================================
    #[test]
    fn test_just_below_spotlight_is_premium() {
        let grant = PlanConfig::default().plan_for_amount(4998).unwrap();
        assert_eq!(grant.tier, SubscriptionTier::Premium);
    }

    // =========================================================================
    // ENT-P05: a fresh grant's credit pool is the tier allotment, never a sum
    // =========================================================================
    #[test]
    fn test_grant_pool_is_fixed_allotment() {
        // The grant engine writes grant.credits verbatim; whatever balance
        // the user had before (2, 0, 10) never feeds into it
        let grant = PlanConfig::default().plan_for_amount(2999).unwrap();
        assert_eq!(grant.credits, SubscriptionTier::Premium.credit_allotment());
        assert_eq!(grant.credits, 5);
    }
}

#[cfg(test)]
mod grant_anchor {
    use crate::grants::resets_started_at;
    use crate::records::UserEntitlement;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    fn stored(tier: &str, expires_in: Option<Duration>) -> (UserEntitlement, OffsetDateTime) {
        let now = OffsetDateTime::now_utc();
        let entitlement = UserEntitlement {
            id: Uuid::new_v4(),
            subscription_tier: tier.to_string(),
            premium_credits_remaining: 3,
            subscription_expires_at: expires_in.map(|d| now + d),
            subscription_started_at: Some(now - Duration::days(30)),
        };
        (entitlement, now)
    }

    // =========================================================================
    // ENT-G01: first purchase from free resets the anchor
    // =========================================================================
    #[test]
    fn test_purchase_from_free_resets_anchor() {
        let (entitlement, now) = stored("free", None);
        assert!(resets_started_at(&entitlement, now));
    }

    // =========================================================================
    // ENT-G02: top-up while active keeps the anchor (same unbroken run)
    // =========================================================================
    #[test]
    fn test_topup_while_active_keeps_anchor() {
        let (entitlement, now) = stored("premium", Some(Duration::days(20)));
        assert!(!resets_started_at(&entitlement, now));
    }

    // =========================================================================
    // ENT-G03: purchase after lapse starts a new run
    // =========================================================================
    #[test]
    fn test_purchase_after_lapse_resets_anchor() {
        let (entitlement, now) = stored("premium", Some(Duration::days(-3)));
        assert!(resets_started_at(&entitlement, now));
    }
}

#[cfg(test)]
mod downgrade_validation {
    use crate::downgrade::validate_downgrade;
    use crate::error::EntitlementError;
    use motorlot_shared::{SubscriptionTier, TargetPlan};

    // =========================================================================
    // ENT-D01: spotlight steps down to premium, credits become the premium
    // allotment
    // =========================================================================
    #[test]
    fn test_spotlight_step_down() {
        let tier = validate_downgrade(SubscriptionTier::Spotlight, TargetPlan::Premium).unwrap();
        assert_eq!(tier, SubscriptionTier::Premium);
        assert_eq!(tier.credit_allotment(), 5);
    }

    // =========================================================================
    // ENT-D02: downgrade to the current plan is rejected, not silently ignored
    // =========================================================================
    #[test]
    fn test_noop_downgrade_rejected() {
        assert!(matches!(
            validate_downgrade(SubscriptionTier::Premium, TargetPlan::Premium),
            Err(EntitlementError::AlreadyOnPlan(_))
        ));
    }

    // =========================================================================
    // ENT-D03: unknown plan names never parse
    // =========================================================================
    #[test]
    fn test_unknown_plan_rejected() {
        assert!("gold".parse::<TargetPlan>().is_err());
        assert!("".parse::<TargetPlan>().is_err());
        assert!("spotlight".parse::<TargetPlan>().is_err());
    }

    // =========================================================================
    // ENT-D04: free user cannot gain premium through the downgrade path
    // =========================================================================
    #[test]
    fn test_free_cannot_downgrade_to_premium() {
        assert!(matches!(
            validate_downgrade(SubscriptionTier::Free, TargetPlan::Premium),
            Err(EntitlementError::InvalidPlan(_))
        ));
    }
}
