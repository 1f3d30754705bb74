//! Core domain vocabulary shared across crates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription tier for a seller account
///
/// Stored as lowercase text in the `users.subscription_tier` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Premium,
    Spotlight,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Premium => "premium",
            SubscriptionTier::Spotlight => "spotlight",
        }
    }

    /// Number of listings a fresh grant of this tier may promote
    pub fn credit_allotment(&self) -> i32 {
        match self {
            SubscriptionTier::Free => 0,
            SubscriptionTier::Premium => 5,
            SubscriptionTier::Spotlight => 10,
        }
    }

    /// How long a fresh grant of this tier lasts
    pub fn grant_duration_days(&self) -> i64 {
        match self {
            SubscriptionTier::Free => 0,
            SubscriptionTier::Premium => 60,
            SubscriptionTier::Spotlight => 90,
        }
    }

    /// Ordering used to classify a tier change as a downgrade
    pub fn rank(&self) -> u8 {
        match self {
            SubscriptionTier::Free => 0,
            SubscriptionTier::Premium => 1,
            SubscriptionTier::Spotlight => 2,
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }
}

impl FromStr for SubscriptionTier {
    type Err = UnknownValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionTier::Free),
            "premium" => Ok(SubscriptionTier::Premium),
            "spotlight" => Ok(SubscriptionTier::Spotlight),
            other => Err(UnknownValueError {
                field: "subscription_tier",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target of a voluntary downgrade request
///
/// The user-facing plan names do not match tier names one-to-one: "basic"
/// is the free tier's marketing name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlan {
    Basic,
    Premium,
}

impl TargetPlan {
    /// The tier this plan maps onto
    pub fn tier(&self) -> SubscriptionTier {
        match self {
            TargetPlan::Basic => SubscriptionTier::Free,
            TargetPlan::Premium => SubscriptionTier::Premium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetPlan::Basic => "basic",
            TargetPlan::Premium => "premium",
        }
    }
}

impl FromStr for TargetPlan {
    type Err = UnknownValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(TargetPlan::Basic),
            "premium" => Ok(TargetPlan::Premium),
            other => Err(UnknownValueError {
                field: "target_plan",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TargetPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a listing
///
/// This column is the source of truth for "sold"; the `SOLD - ` title
/// prefix shown to buyers is a display concern computed on responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Sold,
}

/// Display marker prepended to sold listing titles
pub const SOLD_TITLE_MARKER: &str = "SOLD - ";

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Sold => "sold",
        }
    }

    /// Title as shown to buyers, with the sold marker applied
    pub fn display_title(&self, title: &str) -> String {
        match self {
            ListingStatus::Active => title.to_string(),
            ListingStatus::Sold => format!("{}{}", SOLD_TITLE_MARKER, title),
        }
    }
}

impl FromStr for ListingStatus {
    type Err = UnknownValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ListingStatus::Active),
            "sold" => Ok(ListingStatus::Sold),
            other => Err(UnknownValueError {
                field: "listing_status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored text value that does not map onto the domain vocabulary
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {field} value '{value}'")]
pub struct UnknownValueError {
    pub field: &'static str,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_round_trip() {
        for tier in [
            SubscriptionTier::Free,
            SubscriptionTier::Premium,
            SubscriptionTier::Spotlight,
        ] {
            assert_eq!(tier.as_str().parse::<SubscriptionTier>().unwrap(), tier);
        }
    }

    #[test]
    fn test_tier_rejects_unknown() {
        assert!("gold".parse::<SubscriptionTier>().is_err());
        assert!("Premium".parse::<SubscriptionTier>().is_err(), "case sensitive");
    }

    #[test]
    fn test_tier_allotments() {
        assert_eq!(SubscriptionTier::Free.credit_allotment(), 0);
        assert_eq!(SubscriptionTier::Premium.credit_allotment(), 5);
        assert_eq!(SubscriptionTier::Spotlight.credit_allotment(), 10);
    }

    #[test]
    fn test_tier_durations() {
        assert_eq!(SubscriptionTier::Premium.grant_duration_days(), 60);
        assert_eq!(SubscriptionTier::Spotlight.grant_duration_days(), 90);
    }

    #[test]
    fn test_downgrade_ordering() {
        assert!(SubscriptionTier::Free.rank() < SubscriptionTier::Premium.rank());
        assert!(SubscriptionTier::Premium.rank() < SubscriptionTier::Spotlight.rank());
    }

    #[test]
    fn test_target_plan_maps_to_tier() {
        assert_eq!(TargetPlan::Basic.tier(), SubscriptionTier::Free);
        assert_eq!(TargetPlan::Premium.tier(), SubscriptionTier::Premium);
    }

    #[test]
    fn test_target_plan_rejects_spotlight() {
        // Spotlight is never a downgrade target
        assert!("spotlight".parse::<TargetPlan>().is_err());
    }

    #[test]
    fn test_sold_display_title() {
        assert_eq!(
            ListingStatus::Sold.display_title("2018 Audi A4"),
            "SOLD - 2018 Audi A4"
        );
        assert_eq!(
            ListingStatus::Active.display_title("2018 Audi A4"),
            "2018 Audi A4"
        );
    }
}
