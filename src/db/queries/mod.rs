//! Database queries

pub mod appointments;
pub mod working_hours;

pub use appointments::PgAppointmentStore;
pub use working_hours::PgWorkingHoursSource;
