//! Per-operation state machine
//!
//! A rule rewrite operation moves through
//! `Pending -> Rewritten -> Persisted -> Compiled` on success, or to
//! `Failed` from any non-terminal state. The executor advances through
//! validated transitions so a skipped step is a bug, not a silent drift.

/// Lifecycle state of one rule rewrite operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpState {
    /// Not yet attempted
    Pending,
    /// Logic rewritten in memory
    Rewritten,
    /// Rewritten rule persisted to the rule store
    Persisted,
    /// Derived representation regenerated and persisted
    Compiled,
    /// Terminal failure
    Failed,
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: OpState) -> Vec<OpState> {
    use OpState::*;
    match from {
        Pending => vec![Rewritten, Failed],
        Rewritten => vec![Persisted, Failed],
        Persisted => vec![Compiled, Failed],
        Compiled => vec![],
        Failed => vec![],
    }
}

/// Validates a state transition
pub fn validate_transition(from: OpState, to: OpState) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

/// Transition not in the allowed set
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("illegal op transition: {from:?} -> {to:?}")]
pub struct IllegalTransition {
    /// State the operation was in
    pub from: OpState,
    /// State it tried to move to
    pub to: OpState,
}

/// Tracks one operation's progress through the state machine
#[derive(Debug, Clone, Copy)]
pub struct OpProgress {
    state: OpState,
}

impl OpProgress {
    /// Start at `Pending`
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: OpState::Pending,
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> OpState {
        self.state
    }

    /// Advance through a validated transition
    pub fn advance(&mut self, to: OpState) -> Result<(), IllegalTransition> {
        validate_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }
}

impl Default for OpProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_every_state() {
        let mut progress = OpProgress::new();
        for state in [OpState::Rewritten, OpState::Persisted, OpState::Compiled] {
            progress.advance(state).unwrap();
            assert_eq!(progress.state(), state);
        }
    }

    #[test]
    fn any_non_terminal_state_can_fail() {
        for from in [OpState::Pending, OpState::Rewritten, OpState::Persisted] {
            assert!(validate_transition(from, OpState::Failed).is_ok());
        }
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(allowed_transitions(OpState::Compiled).is_empty());
        assert!(allowed_transitions(OpState::Failed).is_empty());
    }

    #[test]
    fn skipping_a_step_is_illegal() {
        let err = validate_transition(OpState::Pending, OpState::Persisted).unwrap_err();
        assert_eq!(err.from, OpState::Pending);
        assert_eq!(err.to, OpState::Persisted);
    }
}
