//! Row types shared by the entitlement services

use motorlot_shared::{ListingStatus, SubscriptionTier};
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// The entitlement subset of a user row
///
/// Tier and status columns are stored as text; accessors fall back to the
/// safe default when a row predates the current vocabulary.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserEntitlement {
    pub id: Uuid,
    pub subscription_tier: String,
    pub premium_credits_remaining: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub subscription_expires_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub subscription_started_at: Option<OffsetDateTime>,
}

impl UserEntitlement {
    pub fn tier(&self) -> SubscriptionTier {
        self.subscription_tier
            .parse()
            .unwrap_or(SubscriptionTier::Free)
    }
}

/// Listing row joined with its owner's contact fields
#[derive(Debug, Clone, FromRow)]
pub struct ListingOwnerRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub status: String,
    pub featured: bool,
    pub featured_until: Option<OffsetDateTime>,
    pub price_cents: Option<i64>,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_phone: Option<String>,
}

/// Seller contact fields attached to listing responses
#[derive(Debug, Clone, Serialize)]
pub struct OwnerContact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Listing as returned from promote/sold operations
///
/// `display_title` carries the `SOLD - ` marker for sold listings; `title`
/// is always the stored value.
#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    pub id: Uuid,
    pub title: String,
    pub display_title: String,
    pub status: ListingStatus,
    pub featured: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub featured_until: Option<OffsetDateTime>,
    pub price_cents: Option<i64>,
    pub owner: OwnerContact,
}

impl From<ListingOwnerRow> for ListingView {
    fn from(row: ListingOwnerRow) -> Self {
        let status: ListingStatus = row.status.parse().unwrap_or(ListingStatus::Active);
        ListingView {
            id: row.id,
            display_title: status.display_title(&row.title),
            title: row.title,
            status,
            featured: row.featured,
            featured_until: row.featured_until,
            price_cents: row.price_cents,
            owner: OwnerContact {
                id: row.owner_id,
                name: row.owner_name,
                email: row.owner_email,
                phone: row.owner_phone,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> ListingOwnerRow {
        ListingOwnerRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "2016 Mazda MX-5".to_string(),
            status: status.to_string(),
            featured: false,
            featured_until: None,
            price_cents: Some(1_650_000),
            owner_name: "Dana".to_string(),
            owner_email: "dana@example.com".to_string(),
            owner_phone: None,
        }
    }

    #[test]
    fn test_sold_listing_gets_display_marker() {
        let view = ListingView::from(row("sold"));
        assert_eq!(view.title, "2016 Mazda MX-5");
        assert_eq!(view.display_title, "SOLD - 2016 Mazda MX-5");
        assert_eq!(view.status, ListingStatus::Sold);
    }

    #[test]
    fn test_active_listing_title_unchanged() {
        let view = ListingView::from(row("active"));
        assert_eq!(view.display_title, "2016 Mazda MX-5");
    }
}
