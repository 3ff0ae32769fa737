use std::time::Duration;

use serde::Serialize;

/// How long the outgoing step stays on screen after a move.
pub const EXIT_DURATION: Duration = Duration::from_millis(150);
/// How long the incoming step takes to settle.
pub const ENTER_DURATION: Duration = Duration::from_millis(50);

/// Animation phase around a step change.
///
/// The step index changes as soon as a move is accepted; the phase only
/// sequences presentation and never blocks the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TransitionPhase {
    #[default]
    Idle,
    Exiting { from: usize, to: usize },
    Entering { to: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEvent {
    ExitFinished,
    EnterFinished,
}

impl TransitionPhase {
    pub fn begin(from: usize, to: usize) -> Self {
        TransitionPhase::Exiting { from, to }
    }

    /// Next phase after `event`. Events that don't apply to the current
    /// phase leave it unchanged.
    pub fn on_event(self, event: TransitionEvent) -> Self {
        match (self, event) {
            (TransitionPhase::Exiting { to, .. }, TransitionEvent::ExitFinished) => {
                TransitionPhase::Entering { to }
            }
            (TransitionPhase::Entering { .. }, TransitionEvent::EnterFinished) => {
                TransitionPhase::Idle
            }
            (phase, _) => phase,
        }
    }

    /// Time until this phase should receive its finishing event.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            TransitionPhase::Idle => None,
            TransitionPhase::Exiting { .. } => Some(EXIT_DURATION),
            TransitionPhase::Entering { .. } => Some(ENTER_DURATION),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TransitionPhase::Idle)
    }
}
