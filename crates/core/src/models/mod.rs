pub mod appointment;
pub mod availability;
pub mod calendar;
pub mod course;
pub mod feedback;
pub mod user;
