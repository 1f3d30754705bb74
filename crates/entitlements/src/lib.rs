// Entitlements crate clippy configuration
// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Motorlot Entitlement Engine
//!
//! The subscription & premium-entitlement core of the marketplace:
//!
//! - **Effective-State Resolver**: pure lazy-expiry view of a stored
//!   entitlement, consulted on every read
//! - **Grant Engine**: turns confirmed payments into tier grants, with an
//!   idempotency ledger against duplicate delivery
//! - **Credit Consumption**: spends one credit to feature one listing,
//!   atomically
//! - **Manual Downgrade**: immediate voluntary step-down, no refunds
//! - **Sale Hook**: marks a listing sold and revokes its featured flag
//! - **Reconciliation Sweep**: converges expired rows to the free tier
//! - **Invariant Checker**: runnable consistency checks over the above

pub mod credits;
pub mod downgrade;
pub mod error;
pub mod events;
pub mod grants;
pub mod invariants;
pub mod plans;
pub mod records;
pub mod resolver;
pub mod sales;
pub mod sweep;

#[cfg(test)]
mod edge_case_tests;

// Error
pub use error::{EntitlementError, EntitlementResult};

// Records
pub use records::{ListingView, OwnerContact, UserEntitlement};

// Plans
pub use plans::{PlanConfig, PlanGrant};

// Resolver
pub use resolver::{resolve_effective, spendable_credits, EffectiveSubscription};

// Grants
pub use grants::{GrantEngine, GrantOutcome, PaymentEvent};

// Credits
pub use credits::CreditService;

// Downgrade
pub use downgrade::DowngradeService;

// Sales
pub use sales::SaleService;

// Sweep
pub use sweep::{SweepOutcome, SweepService};

// Invariants
pub use invariants::{
    InvariantCheckSummary, InvariantChecker, InvariantViolation, ViolationSeverity,
};

// Events
pub use events::{
    ActorType, EntitlementEventBuilder, EntitlementEventLogger, EntitlementEventType,
};

use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

/// Main entitlement service combining all entitlement functionality
pub struct EntitlementService {
    pub grants: GrantEngine,
    pub credits: CreditService,
    pub downgrade: DowngradeService,
    pub sales: SaleService,
    pub sweep: SweepService,
    pub invariants: InvariantChecker,
    pool: PgPool,
}

impl EntitlementService {
    /// Create an entitlement service with plan config from the environment
    pub fn from_env(pool: PgPool) -> Self {
        Self::new(pool, PlanConfig::from_env())
    }

    pub fn new(pool: PgPool, plans: PlanConfig) -> Self {
        Self {
            grants: GrantEngine::new(pool.clone(), plans),
            credits: CreditService::new(pool.clone()),
            downgrade: DowngradeService::new(pool.clone()),
            sales: SaleService::new(pool.clone()),
            sweep: SweepService::new(pool.clone()),
            invariants: InvariantChecker::new(pool.clone()),
            pool,
        }
    }

    /// Resolve a user's effective subscription for `now`
    ///
    /// Reads fresh storage on every call; entitlement state is never
    /// cached across requests.
    pub async fn effective_subscription(
        &self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> EntitlementResult<EffectiveSubscription> {
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

        let entitlement = entitlement.ok_or(EntitlementError::NotFound("user"))?;
        Ok(resolve_effective(&entitlement, now))
    }
}
