//! Reservation Domain
//!
//! State machine, allocator, lifecycle service and retention purge.

pub mod allocator;
pub mod machine;
pub mod purge;
pub mod service;

pub use allocator::{Assignment, NoCapacity};
pub use machine::{Action, CapacityEffect, InvalidTransition};
pub use purge::PurgeScheduler;
pub use service::{ReservationService, ShopStatusView};
