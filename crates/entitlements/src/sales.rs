//! Sale-Completion Hook
//!
//! Marks a listing sold and revokes its featured flag. The spent credit is
//! not refunded; selling a promoted car is the promotion working.

use motorlot_shared::ListingStatus;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{EntitlementError, EntitlementResult};
use crate::events::{ActorType, EntitlementEventBuilder, EntitlementEventLogger, EntitlementEventType};
use crate::records::{ListingOwnerRow, ListingView};

#[derive(Debug, sqlx::FromRow)]
struct SaleGuardRow {
    owner_id: Uuid,
    status: String,
    featured: bool,
}

pub struct SaleService {
    pool: PgPool,
    event_logger: EntitlementEventLogger,
}

impl SaleService {
    pub fn new(pool: PgPool) -> Self {
        let event_logger = EntitlementEventLogger::new(pool.clone());
        Self { pool, event_logger }
    }

    /// Mark a listing sold
    ///
    /// The status column is the source of truth; responses carry the
    /// `SOLD - ` title marker as a display concern only. Irreversible.
    pub async fn mark_sold(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> EntitlementResult<ListingView> {
        let mut tx = self.pool.begin().await?;

        let listing: Option<SaleGuardRow> = sqlx::query_as(
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

        let was_featured = listing.featured;

        sqlx::query(
            r#"
            UPDATE listings SET
                status = 'sold',
                featured = FALSE,
                featured_until = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(listing_id)
        .execute(&mut *tx)
        .await?;

        let sold: ListingOwnerRow = sqlx::query_as(
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
            was_featured = was_featured,
            "Listing marked sold"
        );

        if let Err(e) = self
            .event_logger
            .log_event(
                EntitlementEventBuilder::new(user_id, EntitlementEventType::ListingSold)
                    .data(serde_json::json!({
                        "listing_id": listing_id,
                        "was_featured": was_featured,
                    }))
                    .actor(user_id, ActorType::User),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to log listing sold event");
        }

        Ok(ListingView::from(sold))
    }
}
