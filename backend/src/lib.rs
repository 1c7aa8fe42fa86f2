//! Lunchbox delivery coordination backend.
//!
//! Parents book lunchbox deliveries for their children; each booking
//! occurrence becomes a tracked delivery that moves through a strict
//! lifecycle (`assigned -> picked_up -> in_transit -> delivered`, with
//! `failed` for school-reported losses). The REST layer in [`io::rest`]
//! exposes the domain services over HTTP; storage is CSV files behind the
//! traits in [`storage`].

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::domain::{
    BookingService, ChildService, DeliveryService, PaymentService, SchoolService,
    SubscriptionService, UserService,
};
use crate::storage::csv::{
    BookingRepository, ChildRepository, CsvConnection, DeliveryRepository, PaymentRepository,
    SchoolRepository, SubscriptionRepository, UserRepository,
};

/// Shared application state: every service, wired over one CSV connection.
#[derive(Clone)]
pub struct Backend {
    pub booking_service: BookingService,
    pub delivery_service: DeliveryService,
    pub child_service: ChildService,
    pub school_service: SchoolService,
    pub user_service: UserService,
    pub payment_service: PaymentService,
    pub subscription_service: SubscriptionService,
}

impl Backend {
    pub fn new(config: &Config) -> Result<Self> {
        let connection = CsvConnection::new(&config.data_dir)?;
        info!("Using data directory {}", connection.base_directory().display());

        let booking_storage = Arc::new(BookingRepository::new(connection.clone()));
        let delivery_storage = Arc::new(DeliveryRepository::new(connection.clone()));
        let child_storage = Arc::new(ChildRepository::new(connection.clone()));
        let school_storage = Arc::new(SchoolRepository::new(connection.clone()));
        let user_storage = Arc::new(UserRepository::new(connection.clone()));
        let payment_storage = Arc::new(PaymentRepository::new(connection.clone()));
        let subscription_storage = Arc::new(SubscriptionRepository::new(connection));

        let timeout = config.storage_timeout;
        Ok(Self {
            booking_service: BookingService::new(
                booking_storage.clone(),
                delivery_storage.clone(),
                child_storage.clone(),
                timeout,
            ),
            delivery_service: DeliveryService::new(
                delivery_storage,
                booking_storage,
                school_storage.clone(),
                user_storage.clone(),
                timeout,
            ),
            child_service: ChildService::new(child_storage, school_storage.clone(), timeout),
            school_service: SchoolService::new(school_storage, timeout),
            user_service: UserService::new(user_storage, timeout),
            payment_service: PaymentService::new(payment_storage, timeout),
            subscription_service: SubscriptionService::new(subscription_storage, timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn backend_wires_up_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_string_lossy().into_owned(),
            ..Config::default()
        };
        assert!(Backend::new(&config).is_ok());
    }
}
