//! Extraction run states and the trail a run leaves through them.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Start,
    ModeSelect,
    Initial,
    Incremental,
    Discover,
    Dedup,
    Enrich,
    Finalize,
    Done,
    /// Absorbing. Reached from any non-terminal state on an unrecoverable error.
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Start => "start",
            RunState::ModeSelect => "mode_select",
            RunState::Initial => "initial",
            RunState::Incremental => "incremental",
            RunState::Discover => "discover",
            RunState::Dedup => "dedup",
            RunState::Enrich => "enrich",
            RunState::Finalize => "finalize",
            RunState::Done => "done",
            RunState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }

    /// Whether `next` may directly follow `self`.
    pub fn can_advance_to(&self, next: RunState) -> bool {
        use RunState::*;

        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Start, ModeSelect)
                | (ModeSelect, Initial)
                | (ModeSelect, Incremental)
                | (Initial, Discover)
                | (Incremental, Discover)
                | (Discover, Dedup)
                | (Dedup, Enrich)
                | (Enrich, Finalize)
                | (Finalize, Done)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered states a run passed through, starting at [`RunState::Start`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTrail {
    states: Vec<RunState>,
}

impl StateTrail {
    pub fn new() -> Self {
        Self {
            states: vec![RunState::Start],
        }
    }

    pub fn current(&self) -> RunState {
        self.states.last().copied().unwrap_or(RunState::Start)
    }

    /// Moves to `next`. Transitions out of a terminal state are ignored.
    pub fn advance(&mut self, next: RunState) {
        let current = self.current();
        if current.is_terminal() {
            warn!(from = %current, to = %next, "Ignoring transition out of terminal state");
            return;
        }
        debug_assert!(
            current.can_advance_to(next),
            "illegal run transition {} -> {}",
            current,
            next
        );
        debug!(from = %current, to = %next, "Run state");
        self.states.push(next);
    }

    pub fn states(&self) -> &[RunState] {
        &self.states
    }

    pub fn into_states(self) -> Vec<RunState> {
        self.states
    }
}

impl Default for StateTrail {
    fn default() -> Self {
        Self::new()
    }
}
