//! Type definitions

pub mod appointment;
pub mod location;
pub mod messages;
pub mod slot;
pub mod working_hours;

pub use appointment::*;
pub use location::*;
pub use messages::*;
pub use slot::*;
pub use working_hours::*;
