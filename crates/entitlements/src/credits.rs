//! Credit Consumption Service
//!
//! Spends exactly one premium credit to feature one listing. The
//! precondition check, listing update, and credit decrement run inside a
//! single transaction holding a row lock on the user, so two calls racing
//! on the last credit cannot both succeed.

use motorlot_shared::ListingStatus;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{EntitlementError, EntitlementResult};
use crate::events::{ActorType, EntitlementEventBuilder, EntitlementEventLogger, EntitlementEventType};
use crate::records::{ListingOwnerRow, ListingView, UserEntitlement};
use crate::resolver::spendable_credits;

/// Listing row subset needed for the promote preconditions
#[derive(Debug, sqlx::FromRow)]
struct ListingGuardRow {
    owner_id: Uuid,
    status: String,
    featured: bool,
}

pub struct CreditService {
    pool: PgPool,
    event_logger: EntitlementEventLogger,
}

impl CreditService {
    pub fn new(pool: PgPool) -> Self {
        let event_logger = EntitlementEventLogger::new(pool.clone());
        Self { pool, event_logger }
    }

    /// Promote a listing to featured, spending one credit
    ///
    /// Credit checks go through the effective (lazily expired) state, not
    /// the raw stored counter: a stale nonzero balance on an expired grant
    /// is not spendable even before the sweep converges the row.
    pub async fn promote_listing(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> EntitlementResult<ListingView> {
        let now = OffsetDateTime::now_utc();
        let mut tx = self.pool.begin().await?;

        let owner: Option<UserEntitlement> = sqlx::query_as(
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

        let owner = owner.ok_or(EntitlementError::NotFound("user"))?;

        if spendable_credits(&owner, now) <= 0 {
            return Err(EntitlementError::InsufficientCredits);
        }

        let listing: Option<ListingGuardRow> = sqlx::query_as(
            "SELECT owner_id, status, featured FROM listings WHERE id = $1 FOR UPDATE",
        )
        .bind(listing_id)
        .fetch_optional(&mut *tx)
        .await?;

        let listing = listing.ok_or(EntitlementError::NotFound("listing"))?;

        if listing.owner_id != user_id {
            return Err(EntitlementError::Forbidden);
        }
        if listing.status.parse::<ListingStatus>().ok() == Some(ListingStatus::Sold) {
            return Err(EntitlementError::AlreadySold);
        }
        if listing.featured {
            return Err(EntitlementError::AlreadyFeatured);
        }

        sqlx::query(
            r#"
            UPDATE listings SET
                featured = TRUE,
                featured_until = $1,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(owner.subscription_expires_at)
        .bind(listing_id)
        .execute(&mut *tx)
        .await?;

        // Guarded decrement: the WHERE clause keeps the counter from ever
        // going below zero.
        let rows_affected = sqlx::query(
            r#"
            UPDATE users SET
                premium_credits_remaining = premium_credits_remaining - 1,
                updated_at = NOW()
            WHERE id = $1 AND premium_credits_remaining > 0
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(EntitlementError::InsufficientCredits);
        }

        let promoted: ListingOwnerRow = sqlx::query_as(
            r#"
            SELECT l.id, l.owner_id, l.title, l.status, l.featured, l.featured_until,
                   l.price_cents,
                   u.name AS owner_name, u.email AS owner_email, u.phone AS owner_phone
            FROM listings l
            JOIN users u ON u.id = l.owner_id
            WHERE l.id = $1
            "#,
        )
        .bind(listing_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            listing_id = %listing_id,
            credits_remaining = owner.premium_credits_remaining - 1,
            "Listing promoted to featured"
        );

        if let Err(e) = self
            .event_logger
            .log_event(
                EntitlementEventBuilder::new(user_id, EntitlementEventType::CreditSpent)
                    .data(serde_json::json!({
                        "listing_id": listing_id,
                        "credits_remaining": owner.premium_credits_remaining - 1,
                    }))
                    .actor(user_id, ActorType::User),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to log credit spend event");
        }

        Ok(ListingView::from(promoted))
    }
}
