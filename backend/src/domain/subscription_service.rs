//! Meal-plan subscription service.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use shared::{SubscriptionStatus, UserRole};

use crate::domain::commands::subscriptions::{
    CreateSubscriptionCommand, CreateSubscriptionResult, ListSubscriptionsResult,
};
use crate::domain::errors::DomainError;
use crate::domain::models::{Actor, Subscription};
use crate::domain::{parse_date_field, with_timeout};
use crate::storage::SubscriptionStorage;

#[derive(Clone)]
pub struct SubscriptionService {
    subscription_storage: Arc<dyn SubscriptionStorage>,
    storage_timeout: Duration,
}

impl SubscriptionService {
    pub fn new(
        subscription_storage: Arc<dyn SubscriptionStorage>,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            subscription_storage,
            storage_timeout,
        }
    }

    pub async fn create_subscription(
        &self,
        actor: &Actor,
        command: CreateSubscriptionCommand,
    ) -> Result<CreateSubscriptionResult, DomainError> {
        if actor.role != UserRole::Parent {
            return Err(DomainError::validation("only parents hold subscriptions"));
        }
        if command.amount <= 0.0 {
            return Err(DomainError::validation("subscription amount must be positive"));
        }

        let start_date = parse_date_field(&command.start_date, "start_date")?;
        let end_date = parse_date_field(&command.end_date, "end_date")?;
        if end_date <= start_date {
            return Err(DomainError::validation("end_date must be after start_date"));
        }

        let now = Utc::now();
        let subscription = Subscription {
            id: Subscription::generate_id(),
            user_id: actor.user_id.clone(),
            plan_type: command.plan_type,
            amount: command.amount,
            start_date,
            end_date,
            status: SubscriptionStatus::Active,
            created_at: now,
            updated_at: now,
        };
        with_timeout(
            self.storage_timeout,
            self.subscription_storage.store_subscription(&subscription),
        )
        .await?;

        info!("Created subscription {} for {}", subscription.id, subscription.user_id);
        Ok(CreateSubscriptionResult { subscription })
    }

    pub async fn cancel_subscription(
        &self,
        actor: &Actor,
        subscription_id: &str,
    ) -> Result<CreateSubscriptionResult, DomainError> {
        let mut subscription = with_timeout(
            self.storage_timeout,
            self.subscription_storage.get_subscription(subscription_id),
        )
        .await?
        .ok_or_else(|| DomainError::not_found(format!("subscription {}", subscription_id)))?;

        let permitted =
            actor.role == UserRole::SystemAdmin || subscription.user_id == actor.user_id;
        if !permitted {
            return Err(DomainError::not_found(format!("subscription {}", subscription_id)));
        }

        if subscription.status != SubscriptionStatus::Active {
            return Err(DomainError::invalid_transition(
                subscription.status,
                SubscriptionStatus::Cancelled,
            ));
        }
        subscription.status = SubscriptionStatus::Cancelled;
        subscription.updated_at = Utc::now();
        with_timeout(
            self.storage_timeout,
            self.subscription_storage.update_subscription(&subscription),
        )
        .await?;

        info!("Cancelled subscription {}", subscription.id);
        Ok(CreateSubscriptionResult { subscription })
    }

    pub async fn list_subscriptions(
        &self,
        actor: &Actor,
    ) -> Result<ListSubscriptionsResult, DomainError> {
        let subscriptions = with_timeout(
            self.storage_timeout,
            self.subscription_storage.list_subscriptions_for_user(&actor.user_id),
        )
        .await?;
        Ok(ListSubscriptionsResult { subscriptions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_STORAGE_TIMEOUT;
    use crate::storage::csv::{CsvConnection, SubscriptionRepository};
    use shared::PlanType;
    use tempfile::TempDir;

    async fn service() -> (TempDir, SubscriptionService) {
        let temp_dir = TempDir::new().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        let service = SubscriptionService::new(
            Arc::new(SubscriptionRepository::new(connection)),
            DEFAULT_STORAGE_TIMEOUT,
        );
        (temp_dir, service)
    }

    fn parent() -> Actor {
        Actor::new("user::parent1", UserRole::Parent)
    }

    fn command() -> CreateSubscriptionCommand {
        CreateSubscriptionCommand {
            plan_type: PlanType::Monthly,
            amount: 89.0,
            start_date: "2024-06-01".to_string(),
            end_date: "2024-06-30".to_string(),
        }
    }

    #[tokio::test]
    async fn subscriptions_start_active_and_cancel_once() {
        let (_dir, service) = service().await;
        let created = service.create_subscription(&parent(), command()).await.unwrap();
        assert_eq!(created.subscription.status, SubscriptionStatus::Active);

        let cancelled = service
            .cancel_subscription(&parent(), &created.subscription.id)
            .await
            .unwrap();
        assert_eq!(cancelled.subscription.status, SubscriptionStatus::Cancelled);

        let again = service
            .cancel_subscription(&parent(), &created.subscription.id)
            .await;
        assert!(matches!(again, Err(DomainError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn inverted_date_windows_are_rejected() {
        let (_dir, service) = service().await;
        let mut cmd = command();
        cmd.end_date = "2024-05-01".to_string();
        let result = service.create_subscription(&parent(), cmd).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
