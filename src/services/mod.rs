//! Business logic services

pub mod geo;
pub mod routing;
pub mod scheduler;
