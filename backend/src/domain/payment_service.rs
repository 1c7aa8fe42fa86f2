//! Payment service. Payments are simulated end to end: no gateway is
//! integrated, but the status moves follow the same one-way rules a real
//! integration would enforce.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use shared::{PaymentStatus, UserRole};

use crate::domain::commands::payments::{
    CreatePaymentCommand, CreatePaymentResult, ListPaymentsResult,
};
use crate::domain::errors::DomainError;
use crate::domain::models::{Actor, Payment};
use crate::domain::with_timeout;
use crate::storage::PaymentStorage;

#[derive(Clone)]
pub struct PaymentService {
    payment_storage: Arc<dyn PaymentStorage>,
    storage_timeout: Duration,
}

impl PaymentService {
    pub fn new(payment_storage: Arc<dyn PaymentStorage>, storage_timeout: Duration) -> Self {
        Self {
            payment_storage,
            storage_timeout,
        }
    }

    pub async fn create_payment(
        &self,
        actor: &Actor,
        command: CreatePaymentCommand,
    ) -> Result<CreatePaymentResult, DomainError> {
        if actor.role != UserRole::Parent {
            return Err(DomainError::validation("only parents make payments"));
        }
        if command.amount <= 0.0 {
            return Err(DomainError::validation("payment amount must be positive"));
        }

        let now = Utc::now();
        let payment = Payment {
            id: Payment::generate_id(),
            user_id: actor.user_id.clone(),
            booking_id: command.booking_id,
            amount: command.amount,
            currency: command.currency,
            payment_method: command.payment_method,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        with_timeout(self.storage_timeout, self.payment_storage.store_payment(&payment)).await?;

        info!("Created payment {} for {}", payment.id, payment.user_id);
        Ok(CreatePaymentResult { payment })
    }

    /// Mark a pending payment completed (the simulated gateway callback).
    pub async fn complete_payment(
        &self,
        actor: &Actor,
        payment_id: &str,
    ) -> Result<CreatePaymentResult, DomainError> {
        let payment = self.visible_payment(actor, payment_id).await?;
        self.move_status(payment, PaymentStatus::Pending, PaymentStatus::Completed)
            .await
    }

    /// Refund a completed payment. Admin-side operation.
    pub async fn refund_payment(
        &self,
        actor: &Actor,
        payment_id: &str,
    ) -> Result<CreatePaymentResult, DomainError> {
        if actor.role != UserRole::SystemAdmin {
            return Err(DomainError::validation("only system admins issue refunds"));
        }
        let payment = with_timeout(self.storage_timeout, self.payment_storage.get_payment(payment_id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("payment {}", payment_id)))?;
        self.move_status(payment, PaymentStatus::Completed, PaymentStatus::Refunded)
            .await
    }

    pub async fn list_payments(&self, actor: &Actor) -> Result<ListPaymentsResult, DomainError> {
        let payments = with_timeout(
            self.storage_timeout,
            self.payment_storage.list_payments_for_user(&actor.user_id),
        )
        .await?;
        Ok(ListPaymentsResult { payments })
    }

    async fn move_status(
        &self,
        mut payment: Payment,
        expected: PaymentStatus,
        next: PaymentStatus,
    ) -> Result<CreatePaymentResult, DomainError> {
        if payment.status != expected {
            return Err(DomainError::invalid_transition(payment.status, next));
        }
        payment.status = next;
        payment.updated_at = Utc::now();
        with_timeout(self.storage_timeout, self.payment_storage.update_payment(&payment)).await?;
        info!("Payment {} moved to {}", payment.id, payment.status);
        Ok(CreatePaymentResult { payment })
    }

    async fn visible_payment(
        &self,
        actor: &Actor,
        payment_id: &str,
    ) -> Result<Payment, DomainError> {
        let payment = with_timeout(self.storage_timeout, self.payment_storage.get_payment(payment_id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("payment {}", payment_id)))?;
        let permitted = actor.role == UserRole::SystemAdmin || payment.user_id == actor.user_id;
        if !permitted {
            return Err(DomainError::not_found(format!("payment {}", payment_id)));
        }
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_STORAGE_TIMEOUT;
    use crate::storage::csv::{CsvConnection, PaymentRepository};
    use tempfile::TempDir;

    async fn service() -> (TempDir, PaymentService) {
        let temp_dir = TempDir::new().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        let service = PaymentService::new(
            Arc::new(PaymentRepository::new(connection)),
            DEFAULT_STORAGE_TIMEOUT,
        );
        (temp_dir, service)
    }

    fn parent() -> Actor {
        Actor::new("user::parent1", UserRole::Parent)
    }

    fn admin() -> Actor {
        Actor::new("user::admin1", UserRole::SystemAdmin)
    }

    fn command() -> CreatePaymentCommand {
        CreatePaymentCommand {
            booking_id: Some("booking::1".to_string()),
            amount: 12.5,
            currency: "USD".to_string(),
            payment_method: "card".to_string(),
        }
    }

    #[tokio::test]
    async fn payments_start_pending_and_complete_once() {
        let (_dir, service) = service().await;
        let created = service.create_payment(&parent(), command()).await.unwrap();
        assert_eq!(created.payment.status, PaymentStatus::Pending);

        let completed = service
            .complete_payment(&parent(), &created.payment.id)
            .await
            .unwrap();
        assert_eq!(completed.payment.status, PaymentStatus::Completed);

        let again = service.complete_payment(&parent(), &created.payment.id).await;
        assert!(matches!(again, Err(DomainError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn refunds_require_a_completed_payment() {
        let (_dir, service) = service().await;
        let created = service.create_payment(&parent(), command()).await.unwrap();

        let result = service.refund_payment(&admin(), &created.payment.id).await;
        assert!(matches!(result, Err(DomainError::InvalidTransition { .. })));

        service.complete_payment(&parent(), &created.payment.id).await.unwrap();
        let refunded = service.refund_payment(&admin(), &created.payment.id).await.unwrap();
        assert_eq!(refunded.payment.status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let (_dir, service) = service().await;
        let mut cmd = command();
        cmd.amount = 0.0;
        let result = service.create_payment(&parent(), cmd).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
