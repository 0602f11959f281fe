//! Reservation documents.

pub mod model;

pub use model::{CreateReservation, ReservationDocument};
