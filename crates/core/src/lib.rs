//! Domain types and pure logic for the meeting scheduler client.
//!
//! Nothing in this crate performs I/O. The booking state machine lives in
//! [`booking`]; the HTTP side is in `scheduler-client`.

pub mod booking;
pub mod errors;
pub mod models;
pub mod sorting;
pub mod time;
