//! Entitlement audit event log
//!
//! Append-only record of every entitlement mutation: grants, credit
//! spends, downgrades, sales, and sweep expirations. Logging failures are
//! reported but never fail the mutation they describe.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EntitlementResult;

/// Type of entitlement event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitlementEventType {
    PaymentApplied,
    PaymentRejected,
    PaymentDuplicate,
    CreditSpent,
    PlanDowngraded,
    ListingSold,
    SubscriptionExpired,
}

impl EntitlementEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementEventType::PaymentApplied => "payment_applied",
            EntitlementEventType::PaymentRejected => "payment_rejected",
            EntitlementEventType::PaymentDuplicate => "payment_duplicate",
            EntitlementEventType::CreditSpent => "credit_spent",
            EntitlementEventType::PlanDowngraded => "plan_downgraded",
            EntitlementEventType::ListingSold => "listing_sold",
            EntitlementEventType::SubscriptionExpired => "subscription_expired",
        }
    }
}

/// Who triggered an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorType {
    User,
    Operator,
    PaymentProvider,
    System,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::User => "user",
            ActorType::Operator => "operator",
            ActorType::PaymentProvider => "payment_provider",
            ActorType::System => "system",
        }
    }
}

/// Builder for an entitlement event record
pub struct EntitlementEventBuilder {
    user_id: Uuid,
    event_type: EntitlementEventType,
    actor_type: ActorType,
    actor_id: Option<Uuid>,
    data: serde_json::Value,
}

impl EntitlementEventBuilder {
    pub fn new(user_id: Uuid, event_type: EntitlementEventType) -> Self {
        Self {
            user_id,
            event_type,
            actor_type: ActorType::System,
            actor_id: None,
            data: serde_json::json!({}),
        }
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn actor(mut self, actor_id: Uuid, actor_type: ActorType) -> Self {
        self.actor_id = Some(actor_id);
        self.actor_type = actor_type;
        self
    }

    pub fn actor_opt(mut self, actor_id: Option<Uuid>, actor_type: ActorType) -> Self {
        self.actor_id = actor_id;
        self.actor_type = actor_type;
        self
    }
}

/// Writes entitlement events to the audit table
#[derive(Clone)]
pub struct EntitlementEventLogger {
    pool: PgPool,
}

impl EntitlementEventLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn log_event(&self, event: EntitlementEventBuilder) -> EntitlementResult<()> {
        sqlx::query(
            r#"
            INSERT INTO entitlement_events (user_id, event_type, actor_type, actor_id, data)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.user_id)
        .bind(event.event_type.as_str())
        .bind(event.actor_type.as_str())
        .bind(event.actor_id)
        .bind(&event.data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names_are_stable() {
        // These strings are stored in the audit table; renames are a migration
        assert_eq!(EntitlementEventType::PaymentApplied.as_str(), "payment_applied");
        assert_eq!(EntitlementEventType::CreditSpent.as_str(), "credit_spent");
        assert_eq!(
            EntitlementEventType::SubscriptionExpired.as_str(),
            "subscription_expired"
        );
    }

    #[test]
    fn test_builder_defaults_to_system_actor() {
        let event = EntitlementEventBuilder::new(
            Uuid::new_v4(),
            EntitlementEventType::SubscriptionExpired,
        );
        assert_eq!(event.actor_type, ActorType::System);
        assert!(event.actor_id.is_none());
    }
}
