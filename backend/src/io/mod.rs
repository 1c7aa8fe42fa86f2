//! Interface layer: REST endpoints over the domain services.

pub mod rest;
