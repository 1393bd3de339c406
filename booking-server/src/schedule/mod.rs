//! Schedule Domain
//!
//! Open/closed resolution and next-occurrence math for shop schedules.

pub mod next_occurrence;
pub mod resolver;

pub use next_occurrence::next_occurrence;
pub use resolver::{ResolvedStatus, active_override, resolve_status};
