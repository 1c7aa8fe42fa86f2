//! CSV-file storage backend.
//!
//! One CSV file per entity in a shared data directory. Repositories read
//! whole files and rewrite them atomically (temp file + rename); mutating
//! sequences run under the connection's write lock.

pub mod booking_repository;
pub mod child_repository;
pub mod connection;
pub mod delivery_repository;
pub mod payment_repository;
pub mod school_repository;
pub mod subscription_repository;
pub mod user_repository;

pub use booking_repository::BookingRepository;
pub use child_repository::ChildRepository;
pub use connection::CsvConnection;
pub use delivery_repository::DeliveryRepository;
pub use payment_repository::PaymentRepository;
pub use school_repository::SchoolRepository;
pub use subscription_repository::SubscriptionRepository;
pub use user_repository::UserRepository;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub(crate) fn parse_date(field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(field, "%Y-%m-%d")
        .with_context(|| format!("invalid date in CSV record: '{}'", field))
}

pub(crate) fn parse_time(field: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(field, "%H:%M")
        .with_context(|| format!("invalid time in CSV record: '{}'", field))
}

pub(crate) fn parse_timestamp(field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(field)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp in CSV record: '{}'", field))
}

/// Empty CSV fields stand for `None`.
pub(crate) fn optional(field: &str) -> Option<String> {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

pub(crate) fn optional_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}
