//! Delivery lifecycle state machine.
//!
//! States run `assigned -> picked_up -> in_transit -> delivered`, with
//! `failed` reachable only from `in_transit` (a school admin reporting a
//! missing lunchbox) or via booking-level cancellation. A status never
//! regresses. Every permitted transition is gated on the acting principal:
//! the UI may hide buttons, but the domain re-validates here regardless.

use shared::{BookingStatus, DeliveryStatus, UserRole};

use crate::domain::errors::DomainError;
use crate::domain::models::{Actor, Delivery};

/// Validate a requested transition against the delivery's current state and
/// the acting principal. Returns `InvalidTransition` both for non-adjacent
/// state changes and for actors who are not permitted to make the change.
pub fn validate_transition(
    delivery: &Delivery,
    requested: DeliveryStatus,
    actor: &Actor,
) -> Result<(), DomainError> {
    use DeliveryStatus::*;

    let from = delivery.status;
    let permitted = match (from, requested) {
        (Assigned, PickedUp) => is_assigned_staff(delivery, actor),
        (PickedUp, InTransit) => is_assigned_staff(delivery, actor),
        // Delivery can be self-reported by the courier or confirmed school-side.
        (InTransit, Delivered) => {
            is_assigned_staff(delivery, actor) || actor.role == UserRole::SchoolAdmin
        }
        (InTransit, Failed) => actor.role == UserRole::SchoolAdmin,
        _ => false,
    };

    if permitted {
        Ok(())
    } else {
        Err(DomainError::invalid_transition(from, requested))
    }
}

fn is_assigned_staff(delivery: &Delivery, actor: &Actor) -> bool {
    actor.role == UserRole::DeliveryStaff
        && delivery.delivery_staff_id.as_deref() == Some(actor.user_id.as_str())
}

/// Booking status projected by a successful delivery transition.
///
/// `failed` deliberately projects nothing: the source system records failure
/// on the delivery alone and never touches the booking.
pub fn project_booking_status(status: DeliveryStatus) -> Option<BookingStatus> {
    match status {
        DeliveryStatus::PickedUp => Some(BookingStatus::PickedUp),
        DeliveryStatus::InTransit => Some(BookingStatus::InTransit),
        DeliveryStatus::Delivered => Some(BookingStatus::Delivered),
        DeliveryStatus::Assigned | DeliveryStatus::Failed => None,
    }
}
