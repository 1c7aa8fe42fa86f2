//! Domain models for the lunchbox delivery system.
//!
//! These are the chrono-typed counterparts of the string-dated DTOs in the
//! `shared` crate; the REST mappers convert between the two.

pub mod booking;
pub mod child;
pub mod delivery;
pub mod payment;
pub mod school;
pub mod subscription;
pub mod user;

pub use booking::Booking;
pub use child::Child;
pub use delivery::Delivery;
pub use payment::Payment;
pub use school::School;
pub use subscription::Subscription;
pub use user::{Actor, User};
