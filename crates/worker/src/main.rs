//! Motorlot Background Worker
//!
//! Handles scheduled jobs including:
//! - Expired subscription sweep (hourly)
//! - Entitlement invariant health check (daily at 3:00 AM UTC)
//! - Health check heartbeat (every 5 minutes)

use std::sync::Arc;
use std::time::Duration;

use motorlot_entitlements::{EntitlementService, ViolationSeverity};
use time::OffsetDateTime;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Create a database connection pool
async fn create_db_pool() -> anyhow::Result<sqlx::PgPool> {
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    let pool = motorlot_shared::create_pool(&database_url).await?;

    info!("Database pool created");
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    info!("Starting Motorlot Worker");

    // Create database pool
    let pool = create_db_pool().await?;

    // Create entitlement service
    let entitlements = Arc::new(EntitlementService::from_env(pool.clone()));

    // Create scheduler
    let scheduler = JobScheduler::new().await?;

    // Job 1: Sweep expired subscriptions (hourly)
    // Converges stored rows to what the resolver already reports, so the
    // lazy-expiry path stays a read-time fallback rather than the norm
    let sweep_entitlements = entitlements.clone();
    scheduler
        .add(Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let entitlements = sweep_entitlements.clone();
            Box::pin(async move {
                info!("Running expired subscription sweep");
                match entitlements
                    .sweep
                    .sweep_expired(OffsetDateTime::now_utc())
                    .await
                {
                    Ok(outcome) => {
                        info!(
                            processed = outcome.processed_count,
                            "Expired subscription sweep complete"
                        );
                    }
                    Err(e) => error!(error = %e, "Expired subscription sweep failed"),
                }
            })
        })?)
        .await?;
    info!("Scheduled: Expired subscription sweep (hourly)");

    // Job 2: Entitlement invariant health check (daily at 3:00 AM UTC)
    let invariant_entitlements = entitlements.clone();
    scheduler
        .add(Job::new_async("0 0 3 * * *", move |_uuid, _l| {
            let entitlements = invariant_entitlements.clone();
            Box::pin(async move {
                info!("Running entitlement invariant checks");
                match entitlements.invariants.run_all_checks().await {
                    Ok(summary) => {
                        if summary.healthy {
                            info!(
                                checks_run = summary.checks_run,
                                "All entitlement invariants hold"
                            );
                            return;
                        }

                        for violation in &summary.violations {
                            match violation.severity {
                                ViolationSeverity::Critical | ViolationSeverity::High => {
                                    error!(
                                        invariant = %violation.invariant,
                                        severity = %violation.severity,
                                        description = %violation.description,
                                        "Entitlement invariant violated"
                                    );
                                }
                                _ => {
                                    warn!(
                                        invariant = %violation.invariant,
                                        severity = %violation.severity,
                                        description = %violation.description,
                                        "Entitlement invariant violated"
                                    );
                                }
                            }
                        }

                        warn!(
                            checks_failed = summary.checks_failed,
                            violations = summary.violations.len(),
                            "Entitlement invariant check found violations"
                        );
                    }
                    Err(e) => error!(error = %e, "Entitlement invariant check failed"),
                }
            })
        })?)
        .await?;
    info!("Scheduled: Entitlement invariant check (daily at 3:00 AM UTC)");

    // Job 3: Health check heartbeat (every 5 minutes)
    scheduler
        .add(Job::new_async("0 */5 * * * *", |_uuid, _l| {
            Box::pin(async move {
                info!("Worker heartbeat - all systems operational");
            })
        })?)
        .await?;
    info!("Scheduled: Health check heartbeat (every 5 minutes)");

    // Run one sweep immediately so a long-stopped worker converges on boot
    match entitlements
        .sweep
        .sweep_expired(OffsetDateTime::now_utc())
        .await
    {
        Ok(outcome) => info!(processed = outcome.processed_count, "Startup sweep complete"),
        Err(e) => error!(error = %e, "Startup sweep failed"),
    }

    // Start the scheduler
    info!("Starting job scheduler");
    scheduler.start().await?;

    info!("Motorlot Worker started successfully with {} scheduled jobs", 3);

    // Keep the main task running
    // The scheduler runs jobs in background tasks
    loop {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}
