//! Booking service: creation with eager delivery materialization, listing,
//! and cancellation.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use shared::{BookingStatus, DeliveryStatus, UserRole};

use crate::domain::commands::bookings::{
    CancelBookingCommand, CancelBookingResult, CreateBookingCommand, CreateBookingResult,
    GetBookingResult, ListBookingsResult,
};
use crate::domain::errors::DomainError;
use crate::domain::models::{Actor, Booking, Child, Delivery};
use crate::domain::{parse_date_field, parse_time_field, with_timeout};
use crate::storage::{BookingStorage, ChildStorage, DeliveryStorage};

#[derive(Clone)]
pub struct BookingService {
    booking_storage: Arc<dyn BookingStorage>,
    delivery_storage: Arc<dyn DeliveryStorage>,
    child_storage: Arc<dyn ChildStorage>,
    storage_timeout: Duration,
}

impl BookingService {
    pub fn new(
        booking_storage: Arc<dyn BookingStorage>,
        delivery_storage: Arc<dyn DeliveryStorage>,
        child_storage: Arc<dyn ChildStorage>,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            booking_storage,
            delivery_storage,
            child_storage,
            storage_timeout,
        }
    }

    /// Create a booking and materialize one delivery per occurrence, each
    /// with its own tracking code. Deliveries start `assigned` with no staff
    /// member attached.
    pub async fn create_booking(
        &self,
        actor: &Actor,
        command: CreateBookingCommand,
    ) -> Result<CreateBookingResult, DomainError> {
        if actor.role != UserRole::Parent {
            return Err(DomainError::validation("only parents can create bookings"));
        }

        let delivery_date = parse_date_field(&command.delivery_date, "delivery_date")?;
        let pickup_time = parse_time_field(&command.pickup_time, "pickup_time")?;
        let delivery_time = parse_time_field(&command.delivery_time, "delivery_time")?;

        if delivery_date <= Utc::now().date_naive() {
            return Err(DomainError::validation("delivery_date must be in the future"));
        }

        let child = self.owned_active_child(actor, &command.child_id).await?;

        let (recurring_pattern, recurring_end_date) = if command.is_recurring {
            let pattern = command
                .recurring_pattern
                .ok_or_else(|| DomainError::validation("recurring bookings need a recurring_pattern"))?;
            let end_raw = command
                .recurring_end_date
                .as_deref()
                .ok_or_else(|| DomainError::validation("recurring bookings need a recurring_end_date"))?;
            let end = parse_date_field(end_raw, "recurring_end_date")?;
            if end < delivery_date {
                return Err(DomainError::validation(
                    "recurring_end_date must not be before delivery_date",
                ));
            }
            (Some(pattern), Some(end))
        } else {
            (None, None)
        };

        let now = Utc::now();
        let booking = Booking {
            id: Booking::generate_id(),
            child_id: child.id.clone(),
            parent_id: actor.user_id.clone(),
            delivery_date,
            pickup_time,
            delivery_time,
            special_instructions: command.special_instructions,
            is_recurring: command.is_recurring,
            recurring_pattern,
            recurring_end_date,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let deliveries: Vec<Delivery> = booking
            .occurrence_dates()
            .into_iter()
            .map(|scheduled_date| Delivery {
                id: Delivery::generate_id(),
                booking_id: booking.id.clone(),
                delivery_staff_id: None,
                school_id: child.school_id.clone(),
                scheduled_date,
                qr_code: Delivery::generate_qr_code(),
                pickup_time_actual: None,
                delivery_time_actual: None,
                status: DeliveryStatus::Assigned,
                created_at: now,
                updated_at: now,
            })
            .collect();

        with_timeout(self.storage_timeout, self.booking_storage.store_booking(&booking)).await?;
        for delivery in &deliveries {
            with_timeout(self.storage_timeout, self.delivery_storage.store_delivery(delivery))
                .await?;
        }

        info!(
            "Created booking {} with {} deliveries for child {}",
            booking.id,
            deliveries.len(),
            child.id
        );
        Ok(CreateBookingResult { booking, deliveries })
    }

    /// List the calling parent's bookings, most recent delivery date first.
    pub async fn list_bookings(&self, actor: &Actor) -> Result<ListBookingsResult, DomainError> {
        if actor.role != UserRole::Parent {
            return Err(DomainError::validation("only parents have a booking list"));
        }
        let bookings = with_timeout(
            self.storage_timeout,
            self.booking_storage.list_bookings_for_parent(&actor.user_id),
        )
        .await?;
        Ok(ListBookingsResult { bookings })
    }

    /// Fetch one booking with its deliveries. Non-owners get `NotFound`
    /// rather than a hint that the booking exists.
    pub async fn get_booking(
        &self,
        actor: &Actor,
        booking_id: &str,
    ) -> Result<GetBookingResult, DomainError> {
        let booking = self.booking_or_not_found(booking_id).await?;

        let permitted =
            actor.role == UserRole::SystemAdmin || booking.parent_id == actor.user_id;
        if !permitted {
            return Err(DomainError::not_found(format!("booking {}", booking_id)));
        }

        let deliveries = with_timeout(
            self.storage_timeout,
            self.delivery_storage.list_deliveries_for_booking(&booking.id),
        )
        .await?;
        Ok(GetBookingResult { booking, deliveries })
    }

    /// Admin acknowledgement of a fresh booking. A plain field write, not
    /// part of the delivery lifecycle.
    pub async fn confirm_booking(
        &self,
        actor: &Actor,
        booking_id: &str,
    ) -> Result<Booking, DomainError> {
        if actor.role != UserRole::SystemAdmin {
            return Err(DomainError::validation("only system admins confirm bookings"));
        }
        let mut booking = self.booking_or_not_found(booking_id).await?;
        if booking.status != BookingStatus::Pending {
            return Err(DomainError::invalid_transition(
                booking.status,
                BookingStatus::Confirmed,
            ));
        }
        booking.status = BookingStatus::Confirmed;
        booking.updated_at = Utc::now();
        with_timeout(self.storage_timeout, self.booking_storage.update_booking(&booking)).await?;
        Ok(booking)
    }

    /// Cancel a booking. Every delivery not yet delivered is failed; already
    /// delivered occurrences keep their history.
    pub async fn cancel_booking(
        &self,
        actor: &Actor,
        command: CancelBookingCommand,
    ) -> Result<CancelBookingResult, DomainError> {
        let mut booking = self.booking_or_not_found(&command.booking_id).await?;

        let permitted = actor.role == UserRole::SystemAdmin
            || (actor.role == UserRole::Parent && booking.parent_id == actor.user_id);
        if !permitted {
            return Err(DomainError::not_found(format!("booking {}", command.booking_id)));
        }

        if matches!(booking.status, BookingStatus::Delivered | BookingStatus::Cancelled) {
            return Err(DomainError::invalid_transition(
                booking.status,
                BookingStatus::Cancelled,
            ));
        }

        booking.status = BookingStatus::Cancelled;
        booking.updated_at = Utc::now();
        with_timeout(self.storage_timeout, self.booking_storage.update_booking(&booking)).await?;

        let deliveries = with_timeout(
            self.storage_timeout,
            self.delivery_storage.list_deliveries_for_booking(&booking.id),
        )
        .await?;

        let mut failed_deliveries = Vec::new();
        for delivery in deliveries {
            if let Some(failed) = self.fail_delivery(delivery).await? {
                failed_deliveries.push(failed);
            }
        }

        info!(
            "Cancelled booking {} ({} deliveries failed)",
            booking.id,
            failed_deliveries.len()
        );
        Ok(CancelBookingResult { booking, failed_deliveries })
    }

    /// Move one delivery to `failed` as part of cancellation. Deliveries that
    /// already reached `delivered` (or `failed`) are left alone. A lost
    /// conditional update is retried once against fresh state.
    async fn fail_delivery(&self, delivery: Delivery) -> Result<Option<Delivery>, DomainError> {
        let mut current = delivery;
        for _ in 0..2 {
            if matches!(
                current.status,
                DeliveryStatus::Delivered | DeliveryStatus::Failed
            ) {
                return Ok(None);
            }

            let expected = current.status;
            let mut updated = current.clone();
            updated.status = DeliveryStatus::Failed;
            updated.updated_at = Utc::now();

            let applied = with_timeout(
                self.storage_timeout,
                self.delivery_storage.update_delivery_if_status(&updated, expected),
            )
            .await?;
            if applied {
                return Ok(Some(updated));
            }

            warn!(
                "Delivery {} changed while cancelling its booking; re-reading",
                current.id
            );
            current = with_timeout(
                self.storage_timeout,
                self.delivery_storage.get_delivery(&current.id),
            )
            .await?
            .ok_or_else(|| DomainError::not_found(format!("delivery {}", current.id)))?;
        }

        Err(DomainError::Conflict(format!(
            "delivery {} kept changing during cancellation",
            current.id
        )))
    }

    async fn booking_or_not_found(&self, booking_id: &str) -> Result<Booking, DomainError> {
        with_timeout(self.storage_timeout, self.booking_storage.get_booking(booking_id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("booking {}", booking_id)))
    }

    async fn owned_active_child(
        &self,
        actor: &Actor,
        child_id: &str,
    ) -> Result<Child, DomainError> {
        let child = with_timeout(self.storage_timeout, self.child_storage.get_child(child_id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("child {}", child_id)))?;
        if child.parent_id != actor.user_id {
            return Err(DomainError::not_found(format!("child {}", child_id)));
        }
        if !child.is_active {
            return Err(DomainError::validation("child profile is deactivated"));
        }
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::{
        BookingRepository, ChildRepository, CsvConnection, DeliveryRepository,
    };
    use crate::domain::DEFAULT_STORAGE_TIMEOUT;
    use chrono::{Duration as ChronoDuration, Utc};
    use shared::RecurringPattern;
    use std::collections::HashSet;
    use tempfile::TempDir;

    const PARENT_ID: &str = "user::parent1";

    struct Fixture {
        _temp_dir: TempDir,
        service: BookingService,
        delivery_storage: Arc<dyn DeliveryStorage>,
    }

    async fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        let booking_storage = Arc::new(BookingRepository::new(connection.clone()));
        let delivery_storage: Arc<dyn DeliveryStorage> =
            Arc::new(DeliveryRepository::new(connection.clone()));
        let child_storage = Arc::new(ChildRepository::new(connection));

        let now = Utc::now();
        child_storage
            .store_child(&Child {
                id: "child::1".to_string(),
                parent_id: PARENT_ID.to_string(),
                school_id: "school::1".to_string(),
                name: "Mika".to_string(),
                class_name: "3B".to_string(),
                allergies: None,
                special_notes: None,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let service = BookingService::new(
            booking_storage,
            delivery_storage.clone(),
            child_storage,
            DEFAULT_STORAGE_TIMEOUT,
        );
        Fixture {
            _temp_dir: temp_dir,
            service,
            delivery_storage,
        }
    }

    fn parent() -> Actor {
        Actor::new(PARENT_ID, UserRole::Parent)
    }

    fn future_date(days: i64) -> String {
        (Utc::now().date_naive() + ChronoDuration::days(days))
            .format("%Y-%m-%d")
            .to_string()
    }

    fn base_command() -> CreateBookingCommand {
        CreateBookingCommand {
            child_id: "child::1".to_string(),
            delivery_date: future_date(7),
            pickup_time: "08:30".to_string(),
            delivery_time: "12:00".to_string(),
            special_instructions: None,
            is_recurring: false,
            recurring_pattern: None,
            recurring_end_date: None,
        }
    }

    #[tokio::test]
    async fn non_recurring_booking_materializes_one_delivery() {
        let fx = fixture().await;
        let result = fx.service.create_booking(&parent(), base_command()).await.unwrap();

        assert_eq!(result.booking.status, BookingStatus::Pending);
        assert_eq!(result.deliveries.len(), 1);
        assert_eq!(result.deliveries[0].status, DeliveryStatus::Assigned);
        assert_eq!(result.deliveries[0].delivery_staff_id, None);
        assert_eq!(result.deliveries[0].school_id, "school::1");
        assert_eq!(result.deliveries[0].booking_id, result.booking.id);
    }

    #[tokio::test]
    async fn weekly_booking_materializes_one_delivery_per_occurrence() {
        let fx = fixture().await;
        let mut command = base_command();
        command.is_recurring = true;
        command.recurring_pattern = Some(RecurringPattern::Weekly);
        command.recurring_end_date = Some(future_date(7 + 21));

        let result = fx.service.create_booking(&parent(), command).await.unwrap();
        assert_eq!(result.deliveries.len(), 4);

        let codes: HashSet<&str> = result.deliveries.iter().map(|d| d.qr_code.as_str()).collect();
        assert_eq!(codes.len(), 4, "every occurrence gets its own tracking code");

        let stored = fx
            .delivery_storage
            .list_deliveries_for_booking(&result.booking.id)
            .await
            .unwrap();
        assert_eq!(stored.len(), 4);
    }

    #[tokio::test]
    async fn booking_in_the_past_is_rejected() {
        let fx = fixture().await;
        let mut command = base_command();
        command.delivery_date = "2020-01-01".to_string();

        let result = fx.service.create_booking(&parent(), command).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn recurring_booking_without_a_pattern_is_rejected() {
        let fx = fixture().await;
        let mut command = base_command();
        command.is_recurring = true;
        command.recurring_end_date = Some(future_date(14));

        let result = fx.service.create_booking(&parent(), command).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn someone_elses_child_reads_as_not_found() {
        let fx = fixture().await;
        let stranger = Actor::new("user::parent2", UserRole::Parent);

        let result = fx.service.create_booking(&stranger, base_command()).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn only_parents_create_bookings() {
        let fx = fixture().await;
        let staff = Actor::new("user::staff1", UserRole::DeliveryStaff);

        let result = fx.service.create_booking(&staff, base_command()).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn cancellation_fails_pending_deliveries_and_keeps_delivered_ones() {
        let fx = fixture().await;
        let mut command = base_command();
        command.is_recurring = true;
        command.recurring_pattern = Some(RecurringPattern::Weekly);
        command.recurring_end_date = Some(future_date(7 + 7));

        let created = fx.service.create_booking(&parent(), command).await.unwrap();
        assert_eq!(created.deliveries.len(), 2);

        // First occurrence already completed before the parent cancels.
        let mut delivered = created.deliveries[0].clone();
        delivered.status = DeliveryStatus::Delivered;
        delivered.delivery_time_actual = Some(Utc::now());
        fx.delivery_storage.update_delivery(&delivered).await.unwrap();

        let result = fx
            .service
            .cancel_booking(
                &parent(),
                CancelBookingCommand {
                    booking_id: created.booking.id.clone(),
                },
            )
            .await
            .unwrap();

        assert_eq!(result.booking.status, BookingStatus::Cancelled);
        assert_eq!(result.failed_deliveries.len(), 1);
        assert_eq!(result.failed_deliveries[0].id, created.deliveries[1].id);

        let kept = fx
            .delivery_storage
            .get_delivery(&delivered.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.status, DeliveryStatus::Delivered);
    }

    #[tokio::test]
    async fn cancelling_twice_is_an_invalid_transition() {
        let fx = fixture().await;
        let created = fx.service.create_booking(&parent(), base_command()).await.unwrap();

        let command = CancelBookingCommand {
            booking_id: created.booking.id.clone(),
        };
        fx.service.cancel_booking(&parent(), command.clone()).await.unwrap();

        let result = fx.service.cancel_booking(&parent(), command).await;
        assert!(matches!(result, Err(DomainError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn confirmation_is_admin_only_and_single_shot() {
        let fx = fixture().await;
        let created = fx.service.create_booking(&parent(), base_command()).await.unwrap();

        let result = fx.service.confirm_booking(&parent(), &created.booking.id).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));

        let admin = Actor::new("user::admin1", UserRole::SystemAdmin);
        let confirmed = fx.service.confirm_booking(&admin, &created.booking.id).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        let again = fx.service.confirm_booking(&admin, &created.booking.id).await;
        assert!(matches!(again, Err(DomainError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn get_booking_hides_other_parents_bookings() {
        let fx = fixture().await;
        let created = fx.service.create_booking(&parent(), base_command()).await.unwrap();

        let stranger = Actor::new("user::parent2", UserRole::Parent);
        let result = fx.service.get_booking(&stranger, &created.booking.id).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));

        let owner_view = fx.service.get_booking(&parent(), &created.booking.id).await.unwrap();
        assert_eq!(owner_view.deliveries.len(), 1);
    }
}
