use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::SelectError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Success,
    Failure,
}

/// Dropdown machine states, in the order a fill normally visits them.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropdownState {
    Idle,
    Located,
    NativeResolve,
    Opened,
    Typeahead,
    PanelEnumerate,
    Resolved(Resolution),
    Closed,
}

impl DropdownState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DropdownState::Closed)
    }
}

impl fmt::Display for DropdownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropdownState::Idle => f.write_str("idle"),
            DropdownState::Located => f.write_str("located"),
            DropdownState::NativeResolve => f.write_str("native_resolve"),
            DropdownState::Opened => f.write_str("opened"),
            DropdownState::Typeahead => f.write_str("typeahead"),
            DropdownState::PanelEnumerate => f.write_str("panel_enumerate"),
            DropdownState::Resolved(Resolution::Success) => f.write_str("resolved(success)"),
            DropdownState::Resolved(Resolution::Failure) => f.write_str("resolved(failure)"),
            DropdownState::Closed => f.write_str("closed"),
        }
    }
}

pub fn allowed_transitions(from: DropdownState) -> Vec<DropdownState> {
    use DropdownState::*;
    let fail = Resolved(Resolution::Failure);
    match from {
        Idle => vec![Located],
        Located => vec![NativeResolve, Opened, fail],
        NativeResolve => vec![Resolved(Resolution::Success), fail],
        Opened => vec![Typeahead, PanelEnumerate, fail],
        Typeahead => vec![Resolved(Resolution::Success), PanelEnumerate, fail],
        PanelEnumerate => vec![Resolved(Resolution::Success), fail],
        Resolved(_) => vec![Closed],
        Closed => vec![],
    }
}

pub fn validate_transition(from: DropdownState, to: DropdownState) -> Result<(), SelectError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(SelectError::IllegalTransition { from, to })
    }
}

/// Ordered record of the states one fill visited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trail {
    states: Vec<DropdownState>,
}

impl Default for Trail {
    fn default() -> Self {
        Self::new()
    }
}

impl Trail {
    pub fn new() -> Self {
        Self {
            states: vec![DropdownState::Idle],
        }
    }

    pub fn current(&self) -> DropdownState {
        self.states
            .last()
            .copied()
            .unwrap_or(DropdownState::Idle)
    }

    pub fn advance(&mut self, to: DropdownState) -> Result<(), SelectError> {
        validate_transition(self.current(), to)?;
        self.states.push(to);
        Ok(())
    }

    pub fn states(&self) -> &[DropdownState] {
        &self.states
    }

    pub fn visited(&self, state: DropdownState) -> bool {
        self.states.contains(&state)
    }

    /// Final resolution, once one has been reached.
    pub fn resolution(&self) -> Option<Resolution> {
        self.states.iter().rev().find_map(|s| match s {
            DropdownState::Resolved(r) => Some(*r),
            _ => None,
        })
    }

    /// Compact `idle > located > ...` form for logs.
    pub fn render(&self) -> String {
        self.states
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DropdownState::*;

    #[test]
    fn native_walk_is_legal() {
        let mut trail = Trail::new();
        for state in [
            Located,
            NativeResolve,
            Resolved(Resolution::Success),
            Closed,
        ] {
            trail.advance(state).unwrap();
        }
        assert!(trail.current().is_terminal());
        assert_eq!(trail.resolution(), Some(Resolution::Success));
        assert_eq!(
            trail.render(),
            "idle > located > native_resolve > resolved(success) > closed"
        );
    }

    #[test]
    fn typeahead_cannot_follow_enumeration() {
        assert!(validate_transition(PanelEnumerate, Typeahead).is_err());
        assert!(validate_transition(Idle, Opened).is_err());
        assert!(validate_transition(Closed, Idle).is_err());
    }

    #[test]
    fn rejected_transition_leaves_trail_unchanged() {
        let mut trail = Trail::new();
        trail.advance(Located).unwrap();
        let err = trail.advance(Closed).unwrap_err();
        assert!(matches!(err, SelectError::IllegalTransition { .. }));
        assert_eq!(trail.states(), &[Idle, Located]);
    }

    #[test]
    fn every_live_state_can_fail() {
        for state in [Located, NativeResolve, Opened, Typeahead, PanelEnumerate] {
            assert!(validate_transition(state, Resolved(Resolution::Failure)).is_ok());
        }
    }
}
