//! Entitlement Invariants Module
//!
//! Runnable consistency checks over entitlement state. These can be run
//! after any mutation, from the worker's health job, or from the operator
//! endpoint to confirm the system is in a valid state.
//!
//! ## Design Principles
//!
//! 1. **Executable**: Each invariant is a real SQL query that can be run
//! 2. **Explanatory**: Violations include enough context to debug
//! 3. **Non-destructive**: Checks only read, never write

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::EntitlementResult;

/// Result of running a single invariant check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantViolation {
    /// Which invariant was violated
    pub invariant: String,
    /// User(s) affected
    pub user_ids: Vec<Uuid>,
    /// Human-readable description of the violation
    pub description: String,
    /// Additional context for debugging
    pub context: serde_json::Value,
    /// Severity level
    pub severity: ViolationSeverity,
}

/// Severity of an invariant violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationSeverity {
    /// Critical - entitlements may be granted or spent incorrectly
    Critical,
    /// High - data inconsistency that needs attention
    High,
    /// Medium - potential issue, should investigate
    Medium,
    /// Low - minor inconsistency, informational
    Low,
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationSeverity::Critical => write!(f, "CRITICAL"),
            ViolationSeverity::High => write!(f, "HIGH"),
            ViolationSeverity::Medium => write!(f, "MEDIUM"),
            ViolationSeverity::Low => write!(f, "LOW"),
        }
    }
}

/// Summary of all invariant checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantCheckSummary {
    /// When the check was run
    #[serde(with = "time::serde::rfc3339")]
    pub checked_at: OffsetDateTime,
    /// Total number of checks run
    pub checks_run: usize,
    /// Number of checks that passed
    pub checks_passed: usize,
    /// Number of checks that failed
    pub checks_failed: usize,
    /// List of all violations found
    pub violations: Vec<InvariantViolation>,
    /// Overall health status
    pub healthy: bool,
}

/// Row type for negative credit violation
#[derive(Debug, sqlx::FromRow)]
struct NegativeCreditsRow {
    user_id: Uuid,
    premium_credits_remaining: i32,
}

/// Row type for free-tier residue violation
#[derive(Debug, sqlx::FromRow)]
struct FreeTierResidueRow {
    user_id: Uuid,
    premium_credits_remaining: i32,
    subscription_expires_at: Option<OffsetDateTime>,
}

/// Row type for paid tier without expiry violation
#[derive(Debug, sqlx::FromRow)]
struct PaidNoExpiryRow {
    user_id: Uuid,
    subscription_tier: String,
}

/// Row type for sold-but-featured violation
#[derive(Debug, sqlx::FromRow)]
struct SoldFeaturedRow {
    listing_id: Uuid,
    owner_id: Uuid,
    title: String,
}

/// Row type for unswept expiry violation
#[derive(Debug, sqlx::FromRow)]
struct UnsweptExpiryRow {
    user_id: Uuid,
    subscription_tier: String,
    subscription_expires_at: Option<OffsetDateTime>,
}

/// Service for running entitlement invariant checks
pub struct InvariantChecker {
    pool: PgPool,
}

impl InvariantChecker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all invariant checks and return summary
    pub async fn run_all_checks(&self) -> EntitlementResult<InvariantCheckSummary> {
        let now = OffsetDateTime::now_utc();
        let mut violations = Vec::new();

        violations.extend(self.check_credits_non_negative().await?);
        violations.extend(self.check_free_tier_has_no_residue().await?);
        violations.extend(self.check_paid_tier_has_expiry().await?);
        violations.extend(self.check_sold_listings_not_featured().await?);
        violations.extend(self.check_expired_rows_swept().await?);

        let checks_run = 5;
        let checks_failed = violations
            .iter()
            .map(|v| &v.invariant)
            .collect::<std::collections::HashSet<_>>()
            .len();
        let checks_passed = checks_run - checks_failed;

        Ok(InvariantCheckSummary {
            checked_at: now,
            checks_run,
            checks_passed,
            checks_failed,
            healthy: violations.is_empty(),
            violations,
        })
    }

    /// Invariant 1: Credit balances never go negative
    ///
    /// The schema CHECK should make this unreachable; a violation means a
    /// write path bypassed the guarded decrement.
    async fn check_credits_non_negative(&self) -> EntitlementResult<Vec<InvariantViolation>> {
        let rows: Vec<NegativeCreditsRow> = sqlx::query_as(
            r#"
            SELECT id AS user_id, premium_credits_remaining
            FROM users
            WHERE premium_credits_remaining < 0
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "credits_non_negative".to_string(),
                user_ids: vec![row.user_id],
                description: format!(
                    "User has negative credit balance ({})",
                    row.premium_credits_remaining
                ),
                context: serde_json::json!({
                    "premium_credits_remaining": row.premium_credits_remaining,
                }),
                severity: ViolationSeverity::Critical,
            })
            .collect())
    }

    /// Invariant 2: Free tier carries no grant state
    ///
    /// `free` implies zero credits and no expiry; residue means a downgrade
    /// or sweep path forgot to clear a column.
    async fn check_free_tier_has_no_residue(&self) -> EntitlementResult<Vec<InvariantViolation>> {
        let rows: Vec<FreeTierResidueRow> = sqlx::query_as(
            r#"
            SELECT id AS user_id, premium_credits_remaining, subscription_expires_at
            FROM users
            WHERE subscription_tier = 'free'
              AND (premium_credits_remaining != 0 OR subscription_expires_at IS NOT NULL)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "free_tier_has_no_residue".to_string(),
                user_ids: vec![row.user_id],
                description: format!(
                    "Free-tier user still carries {} credits / expiry {:?}",
                    row.premium_credits_remaining, row.subscription_expires_at
                ),
                context: serde_json::json!({
                    "premium_credits_remaining": row.premium_credits_remaining,
                    "subscription_expires_at": row.subscription_expires_at.map(|t| t.to_string()),
                }),
                severity: ViolationSeverity::Critical,
            })
            .collect())
    }

    /// Invariant 3: Paid tiers have an expiry on record
    ///
    /// Every grant is time-boxed; a paid row without an expiry never
    /// expires and never gets swept.
    async fn check_paid_tier_has_expiry(&self) -> EntitlementResult<Vec<InvariantViolation>> {
        let rows: Vec<PaidNoExpiryRow> = sqlx::query_as(
            r#"
            SELECT id AS user_id, subscription_tier
            FROM users
            WHERE subscription_tier IN ('premium', 'spotlight')
              AND subscription_expires_at IS NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "paid_tier_has_expiry".to_string(),
                user_ids: vec![row.user_id],
                description: format!(
                    "User on tier '{}' has no subscription expiry",
                    row.subscription_tier
                ),
                context: serde_json::json!({
                    "subscription_tier": row.subscription_tier,
                }),
                severity: ViolationSeverity::High,
            })
            .collect())
    }

    /// Invariant 4: Sold listings are never featured
    ///
    /// Marking a listing sold must force the featured flag off.
    async fn check_sold_listings_not_featured(
        &self,
    ) -> EntitlementResult<Vec<InvariantViolation>> {
        let rows: Vec<SoldFeaturedRow> = sqlx::query_as(
            r#"
            SELECT id AS listing_id, owner_id, title
            FROM listings
            WHERE status = 'sold' AND featured
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "sold_listings_not_featured".to_string(),
                user_ids: vec![row.owner_id],
                description: format!("Sold listing '{}' is still featured", row.title),
                context: serde_json::json!({
                    "listing_id": row.listing_id,
                    "title": row.title,
                }),
                severity: ViolationSeverity::High,
            })
            .collect())
    }

    /// Invariant 5: Expired rows get swept within a day
    ///
    /// The resolver hides stale rows from readers, so this is drift rather
    /// than user-visible breakage, but a growing backlog means the sweep
    /// job is not running.
    async fn check_expired_rows_swept(&self) -> EntitlementResult<Vec<InvariantViolation>> {
        let rows: Vec<UnsweptExpiryRow> = sqlx::query_as(
            r#"
            SELECT id AS user_id, subscription_tier, subscription_expires_at
            FROM users
            WHERE subscription_tier IN ('premium', 'spotlight')
              AND subscription_expires_at < NOW() - INTERVAL '1 day'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "expired_rows_swept".to_string(),
                user_ids: vec![row.user_id],
                description: format!(
                    "Subscription on tier '{}' expired at {:?} but has not been swept",
                    row.subscription_tier, row.subscription_expires_at
                ),
                context: serde_json::json!({
                    "subscription_tier": row.subscription_tier,
                    "subscription_expires_at": row.subscription_expires_at.map(|t| t.to_string()),
                }),
                severity: ViolationSeverity::Medium,
            })
            .collect())
    }

    /// Run a single invariant check by name
    pub async fn run_check(&self, name: &str) -> EntitlementResult<Vec<InvariantViolation>> {
        match name {
            "credits_non_negative" => self.check_credits_non_negative().await,
            "free_tier_has_no_residue" => self.check_free_tier_has_no_residue().await,
            "paid_tier_has_expiry" => self.check_paid_tier_has_expiry().await,
            "sold_listings_not_featured" => self.check_sold_listings_not_featured().await,
            "expired_rows_swept" => self.check_expired_rows_swept().await,
            _ => Ok(vec![]),
        }
    }

    /// Get list of all available invariant checks
    pub fn available_checks() -> Vec<&'static str> {
        vec![
            "credits_non_negative",
            "free_tier_has_no_residue",
            "paid_tier_has_expiry",
            "sold_listings_not_featured",
            "expired_rows_swept",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_severity_display() {
        assert_eq!(ViolationSeverity::Critical.to_string(), "CRITICAL");
        assert_eq!(ViolationSeverity::High.to_string(), "HIGH");
        assert_eq!(ViolationSeverity::Medium.to_string(), "MEDIUM");
        assert_eq!(ViolationSeverity::Low.to_string(), "LOW");
    }

    #[test]
    fn test_available_checks() {
        let checks = InvariantChecker::available_checks();
        assert_eq!(checks.len(), 5);
        assert!(checks.contains(&"credits_non_negative"));
        assert!(checks.contains(&"free_tier_has_no_residue"));
    }
}
