//! Delivery service: tracking-code resolution, lifecycle transitions with
//! booking projection, staff assignment, and day-route planning.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use shared::{DeliveryStatus, UserRole};

use crate::domain::commands::deliveries::{
    ApplyTransitionCommand, ApplyTransitionResult, AssignStaffCommand, AssignStaffResult,
    RoutePlanResult, ScanResult, SchoolDeliveriesResult,
};
use crate::domain::errors::DomainError;
use crate::domain::lifecycle;
use crate::domain::models::{Actor, Booking, Delivery};
use crate::domain::{parse_date_field, with_timeout};
use crate::storage::{BookingStorage, DeliveryStorage, SchoolStorage, UserStorage};

#[derive(Clone)]
pub struct DeliveryService {
    delivery_storage: Arc<dyn DeliveryStorage>,
    booking_storage: Arc<dyn BookingStorage>,
    school_storage: Arc<dyn SchoolStorage>,
    user_storage: Arc<dyn UserStorage>,
    storage_timeout: Duration,
}

impl DeliveryService {
    pub fn new(
        delivery_storage: Arc<dyn DeliveryStorage>,
        booking_storage: Arc<dyn BookingStorage>,
        school_storage: Arc<dyn SchoolStorage>,
        user_storage: Arc<dyn UserStorage>,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            delivery_storage,
            booking_storage,
            school_storage,
            user_storage,
            storage_timeout,
        }
    }

    /// Resolve a scanned (or manually typed) tracking code to its delivery
    /// and booking. Resolution is read-only; transitions are a separate call.
    pub async fn scan(&self, qr_code: &str) -> Result<ScanResult, DomainError> {
        let delivery = self.delivery_by_qr(qr_code).await?;
        let booking = self.booking_for(&delivery).await?;
        Ok(ScanResult { delivery, booking })
    }

    /// Apply one lifecycle transition to the delivery behind a tracking code.
    ///
    /// The status write is conditional on the state the transition was
    /// validated against; a concurrent writer surfaces as `Conflict` and the
    /// caller retries against fresh state. On success the new status is
    /// projected onto the booking, except for `failed` which leaves the
    /// booking untouched.
    pub async fn apply_transition(
        &self,
        actor: &Actor,
        command: ApplyTransitionCommand,
    ) -> Result<ApplyTransitionResult, DomainError> {
        let delivery = self.delivery_by_qr(&command.qr_code).await?;
        lifecycle::validate_transition(&delivery, command.requested_status, actor)?;

        let now = Utc::now();
        let mut updated = delivery.clone();
        updated.status = command.requested_status;
        updated.updated_at = now;
        match command.requested_status {
            DeliveryStatus::PickedUp => updated.pickup_time_actual = Some(now),
            DeliveryStatus::Delivered => updated.delivery_time_actual = Some(now),
            _ => {}
        }

        let applied = with_timeout(
            self.storage_timeout,
            self.delivery_storage
                .update_delivery_if_status(&updated, delivery.status),
        )
        .await?;
        if !applied {
            return Err(DomainError::Conflict(format!(
                "delivery {} was updated concurrently",
                delivery.id
            )));
        }

        let mut booking = self.booking_for(&updated).await?;
        if let Some(projected) = lifecycle::project_booking_status(updated.status) {
            booking.status = projected;
            booking.updated_at = now;
            with_timeout(self.storage_timeout, self.booking_storage.update_booking(&booking))
                .await?;
        }

        info!(
            "Delivery {} moved {} -> {} by {}",
            updated.id, delivery.status, updated.status, actor.user_id
        );
        Ok(ApplyTransitionResult {
            delivery: updated,
            booking,
        })
    }

    /// School-side report that a lunchbox never arrived. Sugar for a
    /// transition to `failed`.
    pub async fn report_missing(
        &self,
        actor: &Actor,
        qr_code: &str,
    ) -> Result<ApplyTransitionResult, DomainError> {
        self.apply_transition(
            actor,
            ApplyTransitionCommand {
                qr_code: qr_code.to_string(),
                requested_status: DeliveryStatus::Failed,
            },
        )
        .await
    }

    /// Attach a staff member to a delivery awaiting pickup.
    pub async fn assign_staff(
        &self,
        actor: &Actor,
        command: AssignStaffCommand,
    ) -> Result<AssignStaffResult, DomainError> {
        if actor.role != UserRole::SystemAdmin {
            return Err(DomainError::validation("only system admins assign delivery staff"));
        }

        let staff = with_timeout(self.storage_timeout, self.user_storage.get_user(&command.staff_id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {}", command.staff_id)))?;
        if staff.role != UserRole::DeliveryStaff {
            return Err(DomainError::validation(format!(
                "user {} is not delivery staff",
                staff.id
            )));
        }
        if !staff.is_active {
            return Err(DomainError::validation(format!("user {} is deactivated", staff.id)));
        }

        let delivery = with_timeout(
            self.storage_timeout,
            self.delivery_storage.get_delivery(&command.delivery_id),
        )
        .await?
        .ok_or_else(|| DomainError::not_found(format!("delivery {}", command.delivery_id)))?;

        if delivery.status != DeliveryStatus::Assigned {
            return Err(DomainError::validation(
                "staff can only be assigned while the delivery is awaiting pickup",
            ));
        }

        let mut updated = delivery.clone();
        updated.delivery_staff_id = Some(staff.id.clone());
        updated.updated_at = Utc::now();

        let applied = with_timeout(
            self.storage_timeout,
            self.delivery_storage
                .update_delivery_if_status(&updated, DeliveryStatus::Assigned),
        )
        .await?;
        if !applied {
            return Err(DomainError::Conflict(format!(
                "delivery {} was updated concurrently",
                delivery.id
            )));
        }

        info!("Assigned staff {} to delivery {}", staff.id, updated.id);
        Ok(AssignStaffResult { delivery: updated })
    }

    /// A staff member's deliveries for one day, ordered by school name.
    pub async fn plan_route(
        &self,
        actor: &Actor,
        staff_id: &str,
        date: &str,
    ) -> Result<RoutePlanResult, DomainError> {
        let permitted = actor.role == UserRole::SystemAdmin
            || (actor.role == UserRole::DeliveryStaff && actor.user_id == staff_id);
        if !permitted {
            return Err(DomainError::validation("route plans are staff-only"));
        }

        let date = parse_date_field(date, "date")?;
        let mut deliveries = with_timeout(
            self.storage_timeout,
            self.delivery_storage.list_deliveries_for_staff(staff_id, date),
        )
        .await?;

        let school_names = self.school_names().await?;
        deliveries.sort_by(|a, b| {
            let name_a = school_names.get(&a.school_id).unwrap_or(&a.school_id);
            let name_b = school_names.get(&b.school_id).unwrap_or(&b.school_id);
            name_a.cmp(name_b)
        });

        Ok(RoutePlanResult { deliveries })
    }

    /// Deliveries arriving at a school on one day, for the school-side view.
    pub async fn list_for_school(
        &self,
        actor: &Actor,
        school_id: &str,
        date: &str,
    ) -> Result<SchoolDeliveriesResult, DomainError> {
        if !matches!(actor.role, UserRole::SchoolAdmin | UserRole::SystemAdmin) {
            return Err(DomainError::validation("school delivery lists are admin-only"));
        }

        let date = parse_date_field(date, "date")?;
        let deliveries = with_timeout(
            self.storage_timeout,
            self.delivery_storage.list_deliveries_for_school(school_id, date),
        )
        .await?;
        Ok(SchoolDeliveriesResult { deliveries })
    }

    async fn delivery_by_qr(&self, qr_code: &str) -> Result<Delivery, DomainError> {
        with_timeout(
            self.storage_timeout,
            self.delivery_storage.get_delivery_by_qr_code(qr_code),
        )
        .await?
        .ok_or_else(|| DomainError::not_found(format!("no delivery for tracking code {}", qr_code)))
    }

    async fn booking_for(&self, delivery: &Delivery) -> Result<Booking, DomainError> {
        with_timeout(
            self.storage_timeout,
            self.booking_storage.get_booking(&delivery.booking_id),
        )
        .await?
        .ok_or_else(|| DomainError::not_found(format!("booking {}", delivery.booking_id)))
    }

    async fn school_names(&self) -> Result<HashMap<String, String>, DomainError> {
        let schools =
            with_timeout(self.storage_timeout, self.school_storage.list_schools()).await?;
        Ok(schools.into_iter().map(|s| (s.id, s.name)).collect())
    }
}
