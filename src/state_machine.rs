// Copyright 2025 Cowboy AI, LLC.

//! State machine traits for promise lifecycles
//!
//! Promise status and the callback lifecycle are both small enum state
//! machines. The traits here let the registry and the callback chain check a
//! transition before performing it, and let logs name states uniformly.
//!
//! Terminal states admit no outgoing transition, which is what makes
//! settlement happen at most once.

use crate::errors::{PromiseError, PromiseResult};
use crate::identifiers::PromiseId;
use std::fmt::Debug;

/// Trait for types that can be used as states in a state machine
pub trait State: Debug + Clone + PartialEq + Eq + Send + Sync {
    /// Get the name of this state for logging/debugging
    fn name(&self) -> &'static str;

    /// Check if this is a terminal state
    fn is_terminal(&self) -> bool {
        false
    }
}

/// Transition table for a state machine whose outputs live elsewhere
///
/// # Examples
///
/// ```rust
/// use cim_promise::state_machine::{State, StateTransitions};
/// use cim_promise::PromiseStatus;
///
/// assert!(PromiseStatus::Pending.can_transition_to(&PromiseStatus::Resolved));
/// assert!(!PromiseStatus::Rejected.can_transition_to(&PromiseStatus::Resolved));
/// assert!(PromiseStatus::Resolved.is_terminal());
/// ```
pub trait StateTransitions: State {
    /// Check if a transition to the target state is valid
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Get all valid target states from this state
    fn valid_transitions(&self) -> Vec<Self>;
}

/// Validate `from -> to` for the promise `id`
///
/// Terminal sources fail as already settled; any other disallowed edge is
/// reported the same way since it can only arise from a settled record.
pub fn ensure_transition<S>(id: &PromiseId, from: &S, to: &S) -> PromiseResult<()>
where
    S: StateTransitions + Into<crate::promise::PromiseStatus>,
{
    if from.is_terminal() || !from.can_transition_to(to) {
        return Err(PromiseError::AlreadySettled {
            id: *id,
            status: from.clone().into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::DomainId;
    use crate::promise::PromiseStatus;

    #[test]
    fn test_pending_transitions() {
        let id = PromiseId::derive(DomainId(1), 0);
        assert!(ensure_transition(&id, &PromiseStatus::Pending, &PromiseStatus::Resolved).is_ok());
        assert!(ensure_transition(&id, &PromiseStatus::Pending, &PromiseStatus::Rejected).is_ok());
    }

    #[test]
    fn test_terminal_states_refuse_everything() {
        let id = PromiseId::derive(DomainId(1), 0);
        for from in [PromiseStatus::Resolved, PromiseStatus::Rejected] {
            for to in [
                PromiseStatus::Pending,
                PromiseStatus::Resolved,
                PromiseStatus::Rejected,
            ] {
                let err = ensure_transition(&id, &from, &to).unwrap_err();
                assert_eq!(err, PromiseError::AlreadySettled { id, status: from });
            }
            assert!(from.valid_transitions().is_empty());
        }
    }
}
