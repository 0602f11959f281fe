//! Repository implementations.

pub mod document;
pub mod reservation;

pub use document::DocumentRepository;
pub use reservation::ReservationRepository;
