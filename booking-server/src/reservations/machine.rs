//! Reservation State Machine
//!
//! 纯状态转移表。时间窗口等外部策略由调用方把关, 这里只回答
//! "从这个状态允许做这个动作吗, 以及容量要怎么变"。

use std::fmt;

use thiserror::Error;

use crate::db::models::ReservationStatus;
use crate::utils::AppError;

/// Lifecycle actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Accept,
    Reject,
    /// Customer or owner withdrawal; lands in `deleted`
    Cancel,
    MarkDone,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Accept => "accept",
            Action::Reject => "reject",
            Action::Cancel => "cancel",
            Action::MarkDone => "mark done",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capacity side effect carried by a legal transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityEffect {
    /// Take `seats_requested` seats plus one table from the shop
    Reserve,
    /// Give `seats_requested` seats plus one table back
    Release,
    /// Status-only change
    None,
}

#[derive(Debug, Error)]
#[error("cannot {action} a reservation in status '{from}'")]
pub struct InvalidTransition {
    pub from: ReservationStatus,
    pub action: Action,
}

impl From<InvalidTransition> for AppError {
    fn from(err: InvalidTransition) -> Self {
        AppError::InvalidTransition(err.to_string())
    }
}

/// The transition table.
///
/// pending -> accepted (reserving capacity) | rejected | deleted;
/// accepted -> done | deleted | rejected (releasing capacity);
/// terminal states allow nothing.
pub fn transition(
    from: ReservationStatus,
    action: Action,
) -> Result<(ReservationStatus, CapacityEffect), InvalidTransition> {
    use CapacityEffect as Effect;
    use ReservationStatus as S;

    match (from, action) {
        (S::Pending, Action::Accept) => Ok((S::Accepted, Effect::Reserve)),
        (S::Pending, Action::Reject) => Ok((S::Rejected, Effect::None)),
        (S::Pending, Action::Cancel) => Ok((S::Deleted, Effect::None)),
        (S::Accepted, Action::Cancel) => Ok((S::Deleted, Effect::Release)),
        (S::Accepted, Action::Reject) => Ok((S::Rejected, Effect::Release)),
        (S::Accepted, Action::MarkDone) => Ok((S::Done, Effect::None)),
        _ => Err(InvalidTransition { from, action }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationStatus as S;

    const ALL_STATES: [S; 5] = [S::Pending, S::Accepted, S::Rejected, S::Done, S::Deleted];
    const ALL_ACTIONS: [Action; 4] = [
        Action::Accept,
        Action::Reject,
        Action::Cancel,
        Action::MarkDone,
    ];

    #[test]
    fn terminal_states_accept_nothing() {
        for from in [S::Rejected, S::Done, S::Deleted] {
            for action in ALL_ACTIONS {
                let err = transition(from, action).unwrap_err();
                assert_eq!(err.from, from);
            }
        }
    }

    #[test]
    fn accepting_done_reservation_is_invalid() {
        assert!(transition(S::Done, Action::Accept).is_err());
    }

    #[test]
    fn pending_transitions() {
        assert_eq!(
            transition(S::Pending, Action::Accept).unwrap(),
            (S::Accepted, CapacityEffect::Reserve)
        );
        assert_eq!(
            transition(S::Pending, Action::Reject).unwrap(),
            (S::Rejected, CapacityEffect::None)
        );
        assert_eq!(
            transition(S::Pending, Action::Cancel).unwrap(),
            (S::Deleted, CapacityEffect::None)
        );
        assert!(transition(S::Pending, Action::MarkDone).is_err());
    }

    #[test]
    fn accepted_transitions() {
        assert_eq!(
            transition(S::Accepted, Action::Cancel).unwrap(),
            (S::Deleted, CapacityEffect::Release)
        );
        assert_eq!(
            transition(S::Accepted, Action::Reject).unwrap(),
            (S::Rejected, CapacityEffect::Release)
        );
        assert_eq!(
            transition(S::Accepted, Action::MarkDone).unwrap(),
            (S::Done, CapacityEffect::None)
        );
        assert!(transition(S::Accepted, Action::Accept).is_err());
    }

    #[test]
    fn capacity_is_reserved_on_exactly_one_edge() {
        // only pending->accepted reserves, so a reservation can hold
        // capacity at most once
        let mut reserving = 0;
        for from in ALL_STATES {
            for action in ALL_ACTIONS {
                if let Ok((_, CapacityEffect::Reserve)) = transition(from, action) {
                    reserving += 1;
                }
            }
        }
        assert_eq!(reserving, 1);
    }
}
