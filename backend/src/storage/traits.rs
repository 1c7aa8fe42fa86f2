//! Storage abstraction traits.
//!
//! The domain layer talks to storage only through these traits, so the
//! CSV-file backend can be swapped for a hosted relational service without
//! touching the services.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::DeliveryStatus;

use crate::domain::models::{Booking, Child, Delivery, Payment, School, Subscription, User};

#[async_trait]
pub trait BookingStorage: Send + Sync {
    /// Store a new booking
    async fn store_booking(&self, booking: &Booking) -> Result<()>;

    /// Retrieve a specific booking by ID
    async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>>;

    /// List bookings created by a parent, most recent delivery date first
    async fn list_bookings_for_parent(&self, parent_id: &str) -> Result<Vec<Booking>>;

    /// Update an existing booking
    async fn update_booking(&self, booking: &Booking) -> Result<()>;
}

#[async_trait]
pub trait DeliveryStorage: Send + Sync {
    /// Store a new delivery. Fails if the tracking code is already taken.
    async fn store_delivery(&self, delivery: &Delivery) -> Result<()>;

    /// Retrieve a specific delivery by ID
    async fn get_delivery(&self, delivery_id: &str) -> Result<Option<Delivery>>;

    /// Exact-match, case-sensitive lookup by tracking code
    async fn get_delivery_by_qr_code(&self, qr_code: &str) -> Result<Option<Delivery>>;

    /// List every delivery derived from a booking
    async fn list_deliveries_for_booking(&self, booking_id: &str) -> Result<Vec<Delivery>>;

    /// List a staff member's deliveries scheduled on a given date
    async fn list_deliveries_for_staff(&self, staff_id: &str, date: NaiveDate)
        -> Result<Vec<Delivery>>;

    /// List a school's deliveries scheduled on a given date
    async fn list_deliveries_for_school(&self, school_id: &str, date: NaiveDate)
        -> Result<Vec<Delivery>>;

    /// Update an existing delivery unconditionally
    async fn update_delivery(&self, delivery: &Delivery) -> Result<()>;

    /// Optimistic update: writes `delivery` only while the stored status
    /// still equals `expected`. Returns false (and writes nothing) when a
    /// concurrent writer got there first.
    async fn update_delivery_if_status(
        &self,
        delivery: &Delivery,
        expected: DeliveryStatus,
    ) -> Result<bool>;
}

#[async_trait]
pub trait ChildStorage: Send + Sync {
    async fn store_child(&self, child: &Child) -> Result<()>;
    async fn get_child(&self, child_id: &str) -> Result<Option<Child>>;
    async fn list_children_for_parent(&self, parent_id: &str) -> Result<Vec<Child>>;
    async fn update_child(&self, child: &Child) -> Result<()>;
}

#[async_trait]
pub trait SchoolStorage: Send + Sync {
    async fn store_school(&self, school: &School) -> Result<()>;
    async fn get_school(&self, school_id: &str) -> Result<Option<School>>;
    async fn list_schools(&self) -> Result<Vec<School>>;
    async fn update_school(&self, school: &School) -> Result<()>;
}

#[async_trait]
pub trait UserStorage: Send + Sync {
    async fn store_user(&self, user: &User) -> Result<()>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn update_user(&self, user: &User) -> Result<()>;
}

#[async_trait]
pub trait PaymentStorage: Send + Sync {
    async fn store_payment(&self, payment: &Payment) -> Result<()>;
    async fn get_payment(&self, payment_id: &str) -> Result<Option<Payment>>;
    async fn list_payments_for_user(&self, user_id: &str) -> Result<Vec<Payment>>;
    async fn update_payment(&self, payment: &Payment) -> Result<()>;
}

#[async_trait]
pub trait SubscriptionStorage: Send + Sync {
    async fn store_subscription(&self, subscription: &Subscription) -> Result<()>;
    async fn get_subscription(&self, subscription_id: &str) -> Result<Option<Subscription>>;
    async fn list_subscriptions_for_user(&self, user_id: &str) -> Result<Vec<Subscription>>;
    async fn update_subscription(&self, subscription: &Subscription) -> Result<()>;
}
