//! Plan configuration: payment thresholds, credit allotments, durations

use motorlot_shared::SubscriptionTier;

/// The grant a confirmed payment buys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanGrant {
    pub tier: SubscriptionTier,
    pub credits: i32,
    pub duration_days: i64,
}

/// Amount thresholds and grant parameters, in minor currency units
///
/// Defaults match the published prices (premium $29.99, spotlight $49.99);
/// each value can be overridden via environment for test environments and
/// price experiments.
#[derive(Debug, Clone)]
pub struct PlanConfig {
    pub premium_threshold_cents: i64,
    pub spotlight_threshold_cents: i64,
    pub premium_credits: i32,
    pub spotlight_credits: i32,
    pub premium_duration_days: i64,
    pub spotlight_duration_days: i64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            premium_threshold_cents: 2999,
            spotlight_threshold_cents: 4999,
            premium_credits: SubscriptionTier::Premium.credit_allotment(),
            spotlight_credits: SubscriptionTier::Spotlight.credit_allotment(),
            premium_duration_days: SubscriptionTier::Premium.grant_duration_days(),
            spotlight_duration_days: SubscriptionTier::Spotlight.grant_duration_days(),
        }
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl PlanConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            premium_threshold_cents: env_i64(
                "PREMIUM_THRESHOLD_CENTS",
                defaults.premium_threshold_cents,
            ),
            spotlight_threshold_cents: env_i64(
                "SPOTLIGHT_THRESHOLD_CENTS",
                defaults.spotlight_threshold_cents,
            ),
            premium_credits: env_i64("PREMIUM_CREDITS", defaults.premium_credits as i64) as i32,
            spotlight_credits: env_i64("SPOTLIGHT_CREDITS", defaults.spotlight_credits as i64)
                as i32,
            premium_duration_days: env_i64(
                "PREMIUM_DURATION_DAYS",
                defaults.premium_duration_days,
            ),
            spotlight_duration_days: env_i64(
                "SPOTLIGHT_DURATION_DAYS",
                defaults.spotlight_duration_days,
            ),
        }
    }

    /// Map a paid amount onto the grant it buys
    ///
    /// Spotlight wins when both thresholds are met; amounts below the
    /// premium threshold buy nothing and are rejected by the grant engine.
    pub fn plan_for_amount(&self, amount_cents: i64) -> Option<PlanGrant> {
        if amount_cents >= self.spotlight_threshold_cents {
            Some(PlanGrant {
                tier: SubscriptionTier::Spotlight,
                credits: self.spotlight_credits,
                duration_days: self.spotlight_duration_days,
            })
        } else if amount_cents >= self.premium_threshold_cents {
            Some(PlanGrant {
                tier: SubscriptionTier::Premium,
                credits: self.premium_credits,
                duration_days: self.premium_duration_days,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premium_at_threshold() {
        let config = PlanConfig::default();
        let grant = config.plan_for_amount(2999).unwrap();
        assert_eq!(grant.tier, SubscriptionTier::Premium);
        assert_eq!(grant.credits, 5);
        assert_eq!(grant.duration_days, 60);
    }

    #[test]
    fn test_spotlight_at_threshold() {
        let config = PlanConfig::default();
        let grant = config.plan_for_amount(4999).unwrap();
        assert_eq!(grant.tier, SubscriptionTier::Spotlight);
        assert_eq!(grant.credits, 10);
        assert_eq!(grant.duration_days, 90);
    }

    #[test]
    fn test_overpayment_maps_to_spotlight() {
        let config = PlanConfig::default();
        let grant = config.plan_for_amount(10_000).unwrap();
        assert_eq!(grant.tier, SubscriptionTier::Spotlight);
    }

    #[test]
    fn test_below_premium_threshold_buys_nothing() {
        let config = PlanConfig::default();
        assert!(config.plan_for_amount(2998).is_none());
        assert!(config.plan_for_amount(0).is_none());
        assert!(config.plan_for_amount(-500).is_none());
    }

    #[test]
    fn test_between_thresholds_is_premium() {
        let config = PlanConfig::default();
        let grant = config.plan_for_amount(4998).unwrap();
        assert_eq!(grant.tier, SubscriptionTier::Premium);
    }
}
