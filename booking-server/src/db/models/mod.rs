//! Database Models

// Serde helpers
pub mod serde_helpers;

// Shop Domain
pub mod shop;

// Reservations
pub mod reservation;

// Re-exports
pub use shop::{DailyOverride, OpenDay, OpenDays, Shop, ShopCreate, ShopUpdate, TableSpec};
pub use reservation::{Reservation, ReservationCreate, ReservationStatus};
