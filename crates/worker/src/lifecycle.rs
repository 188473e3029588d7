//! Worker lifecycle state machine.
//!
//! A worker version moves through `Installing -> Waiting -> Activating ->
//! Activated`. A successful install requests skip-waiting automatically,
//! and the control channel can request it while the worker is waiting;
//! either way the host still delivers the activate event that performs
//! the transition. Termination and idling are owned by the host, not
//! modeled here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle stage of the current worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Installing,
    Waiting,
    Activating,
    Activated,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Installing => "installing",
            LifecycleState::Waiting => "waiting",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: LifecycleState, to: LifecycleState },
}

/// Tracks the lifecycle stage and any pending skip-waiting request.
#[derive(Debug)]
pub struct Lifecycle {
    state: LifecycleState,
    skip_waiting_requested: bool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self { state: LifecycleState::Installing, skip_waiting_requested: false }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting_requested
    }

    /// Record a skip-waiting request.
    ///
    /// Returns false if the request was already pending or the worker is
    /// past the waiting stages.
    pub fn request_skip_waiting(&mut self) -> bool {
        if self.skip_waiting_requested || matches!(self.state, LifecycleState::Activating | LifecycleState::Activated) {
            return false;
        }
        self.skip_waiting_requested = true;
        true
    }

    /// Install completed: `Installing -> Waiting`.
    pub fn installed(&mut self) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::Installing, LifecycleState::Waiting)
    }

    /// Activation started: `Waiting -> Activating`.
    pub fn activating(&mut self) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::Waiting, LifecycleState::Activating)
    }

    /// Activation completed: `Activating -> Activated`.
    pub fn activated(&mut self) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::Activating, LifecycleState::Activated)
    }

    fn transition(&mut self, from: LifecycleState, to: LifecycleState) -> Result<(), LifecycleError> {
        if self.state != from {
            return Err(LifecycleError::InvalidTransition { from: self.state, to });
        }
        self.state = to;
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
