//! Domain layer: models, the delivery lifecycle, and the services that
//! orchestrate validation, storage, and status projection.

pub mod booking_service;
pub mod child_service;
pub mod commands;
pub mod delivery_service;
pub mod errors;
pub mod lifecycle;
pub mod models;
pub mod payment_service;
pub mod school_service;
pub mod subscription_service;
pub mod user_service;

pub use booking_service::BookingService;
pub use child_service::ChildService;
pub use delivery_service::DeliveryService;
pub use errors::DomainError;
pub use payment_service::PaymentService;
pub use school_service::SchoolService;
pub use subscription_service::SubscriptionService;
pub use user_service::UserService;

use chrono::{NaiveDate, NaiveTime};
use std::future::Future;
use std::time::Duration;

/// Default bound on a single storage operation.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a storage future under a deadline. A storage layer that stops
/// responding surfaces as `DomainError::Timeout` instead of hanging the
/// request.
pub(crate) async fn with_timeout<T, F>(limit: Duration, future: F) -> Result<T, DomainError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result.map_err(DomainError::from),
        Err(_) => Err(DomainError::Timeout(limit)),
    }
}

/// Parse a YYYY-MM-DD request field, mapping failure to a validation error.
pub(crate) fn parse_date_field(value: &str, field: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| DomainError::validation(format!("{} must be YYYY-MM-DD, got '{}'", field, value)))
}

/// Parse an HH:MM request field, mapping failure to a validation error.
pub(crate) fn parse_time_field(value: &str, field: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| DomainError::validation(format!("{} must be HH:MM, got '{}'", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_wrapper_passes_results_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok::<_, anyhow::Error>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn slow_storage_surfaces_as_timeout() {
        let limit = Duration::from_millis(10);
        let result: Result<(), _> = with_timeout(limit, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(DomainError::Timeout(d)) if d == limit));
    }
}
