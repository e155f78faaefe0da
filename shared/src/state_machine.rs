//! Control Activation State Machine
//!
//! Defines the activation states a control session moves through and which
//! transitions between them are legal. The driver that issues takeoff and
//! control requests lives in the adapter crate.

use crate::Message;

/// States of one control-session attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// Nothing attempted yet
    TakeoffStart,
    /// Takeoff issued, waiting for the grace period check
    TakeoffAttempting,
    /// Airborne, control not yet acquired
    FlightControllerActivateStart,
    /// Control acquired; flight commands may be sent
    FlightControllerActivateComplete,
    /// Terminal failure or explicit shutdown
    Deactivated,
}

impl Default for ActivationState {
    fn default() -> Self {
        Self::TakeoffStart
    }
}

impl ActivationState {
    /// Deactivated never transitions again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deactivated)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::FlightControllerActivateComplete)
    }
}

/// Result of asking a control session whether flight commands may be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Control acquired
    Ready,
    /// Not yet; ask again later
    Pending,
    /// This attempt is over; a new control session is required
    Failed(Option<Message>),
}

impl Activation {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Check if a transition from one activation state to another is legal
pub fn is_valid_transition(from: ActivationState, to: ActivationState) -> bool {
    use ActivationState::*;

    match (from, to) {
        // Nothing leaves the terminal state
        (Deactivated, _) => false,

        // Deactivation is reachable from anywhere else
        (_, Deactivated) => true,

        // Motion disabled skips straight to complete
        (TakeoffStart, FlightControllerActivateComplete) => true,
        // Already flying skips takeoff
        (TakeoffStart, FlightControllerActivateStart) => true,
        (TakeoffStart, TakeoffAttempting) => true,

        (TakeoffAttempting, FlightControllerActivateStart) => true,

        (FlightControllerActivateStart, FlightControllerActivateComplete) => true,

        _ => false,
    }
}
