//! Storage layer: trait definitions plus the CSV-file backend.

pub mod csv;
pub mod traits;

pub use csv::CsvConnection;
pub use traits::{
    BookingStorage, ChildStorage, DeliveryStorage, PaymentStorage, SchoolStorage,
    SubscriptionStorage, UserStorage,
};
