//! Command execution infrastructure for a drone session
//!
//! This module handles:
//! - Serializing commands per control surface and channel
//! - Timing out and retrying commands that never report back
//! - Dispatching drone, camera and gimbal commands to the vendor

pub mod handlers;
mod queue;
mod timeout;

pub use queue::{Command, CommandQueue, Finisher};
pub use timeout::{RetryDecision, RetryPolicy};
