//! Domain model -> wire DTO conversion. Dates and times are formatted here
//! so every endpoint emits the same string forms (YYYY-MM-DD, HH:MM,
//! RFC 3339 timestamps).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use shared::{
    BookingDto, ChildDto, DeliveryDto, PaymentDto, SchoolDto, SubscriptionDto, UserDto,
};

use crate::domain::models::{Booking, Child, Delivery, Payment, School, Subscription, User};

fn date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339()
}

pub fn booking_to_dto(booking: &Booking) -> BookingDto {
    BookingDto {
        id: booking.id.clone(),
        child_id: booking.child_id.clone(),
        parent_id: booking.parent_id.clone(),
        delivery_date: date(booking.delivery_date),
        pickup_time: time(booking.pickup_time),
        delivery_time: time(booking.delivery_time),
        special_instructions: booking.special_instructions.clone(),
        is_recurring: booking.is_recurring,
        recurring_pattern: booking.recurring_pattern,
        recurring_end_date: booking.recurring_end_date.map(date),
        status: booking.status,
        created_at: timestamp(booking.created_at),
        updated_at: timestamp(booking.updated_at),
    }
}

pub fn delivery_to_dto(delivery: &Delivery) -> DeliveryDto {
    DeliveryDto {
        id: delivery.id.clone(),
        booking_id: delivery.booking_id.clone(),
        delivery_staff_id: delivery.delivery_staff_id.clone(),
        school_id: delivery.school_id.clone(),
        scheduled_date: date(delivery.scheduled_date),
        qr_code: delivery.qr_code.clone(),
        pickup_time_actual: delivery.pickup_time_actual.map(timestamp),
        delivery_time_actual: delivery.delivery_time_actual.map(timestamp),
        status: delivery.status,
        created_at: timestamp(delivery.created_at),
        updated_at: timestamp(delivery.updated_at),
    }
}

pub fn child_to_dto(child: &Child) -> ChildDto {
    ChildDto {
        id: child.id.clone(),
        parent_id: child.parent_id.clone(),
        school_id: child.school_id.clone(),
        name: child.name.clone(),
        class_name: child.class_name.clone(),
        allergies: child.allergies.clone(),
        special_notes: child.special_notes.clone(),
        is_active: child.is_active,
        created_at: timestamp(child.created_at),
        updated_at: timestamp(child.updated_at),
    }
}

pub fn school_to_dto(school: &School) -> SchoolDto {
    SchoolDto {
        id: school.id.clone(),
        name: school.name.clone(),
        address: school.address.clone(),
        phone: school.phone.clone(),
        email: school.email.clone(),
        lunch_time_start: time(school.lunch_time_start),
        lunch_time_end: time(school.lunch_time_end),
        is_active: school.is_active,
        created_at: timestamp(school.created_at),
        updated_at: timestamp(school.updated_at),
    }
}

pub fn user_to_dto(user: &User) -> UserDto {
    UserDto {
        id: user.id.clone(),
        email: user.email.clone(),
        role: user.role,
        full_name: user.full_name.clone(),
        phone: user.phone.clone(),
        is_active: user.is_active,
        created_at: timestamp(user.created_at),
        updated_at: timestamp(user.updated_at),
    }
}

pub fn payment_to_dto(payment: &Payment) -> PaymentDto {
    PaymentDto {
        id: payment.id.clone(),
        user_id: payment.user_id.clone(),
        booking_id: payment.booking_id.clone(),
        amount: payment.amount,
        currency: payment.currency.clone(),
        payment_method: payment.payment_method.clone(),
        status: payment.status,
        created_at: timestamp(payment.created_at),
        updated_at: timestamp(payment.updated_at),
    }
}

pub fn subscription_to_dto(subscription: &Subscription) -> SubscriptionDto {
    SubscriptionDto {
        id: subscription.id.clone(),
        user_id: subscription.user_id.clone(),
        plan_type: subscription.plan_type,
        amount: subscription.amount,
        start_date: date(subscription.start_date),
        end_date: date(subscription.end_date),
        status: subscription.status,
        created_at: timestamp(subscription.created_at),
        updated_at: timestamp(subscription.updated_at),
    }
}
