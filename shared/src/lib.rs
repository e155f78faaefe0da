//! Parrot Adapter Shared Types
//!
//! This crate provides the vendor-neutral vocabulary used between the Parrot
//! adapter and the mission layer: kernel commands, telemetry instruments,
//! dated snapshots, disengage messages and the activation state table.

pub mod command;
pub mod error;
pub mod messages;
pub mod state_machine;
pub mod telemetry;

use std::time::{Duration, Instant};

pub use command::*;
pub use error::{CommandError, SessionError};
pub use state_machine::{Activation, ActivationState};
pub use telemetry::*;

/// Timing parameters for sessions, queues and control handoff
pub mod timing {
    /// Session polling loop period
    pub const POLL_INTERVAL_MS: u64 = 100;

    /// How long a takeoff may take before activation gives up
    pub const TAKEOFF_GRACE_MS: u64 = 5000;

    /// Delay between committing a camera edit and the first completion check
    pub const CAMERA_EDITOR_SETTLE_MS: u64 = 1000;

    /// Spacing between camera editor completion checks
    pub const CAMERA_EDITOR_POLL_MS: u64 = 100;

    /// Completion checks before a camera edit is reported as done anyway
    pub const CAMERA_EDITOR_MAX_ATTEMPTS: u32 = 20;

    /// Delay before a started photo/recording reports completion
    pub const CAPTURE_SETTLE_MS: u64 = 1000;

    /// GPS age after which telemetry is considered delayed
    pub const TELEMETRY_DELAYED_MS: u64 = 1000;

    /// Maximum retries a command may request
    pub const COMMAND_MAX_RETRIES: u32 = 3;

    /// Battery percentage at which a status warning is raised
    pub const BATTERY_LOW_PERCENT: u8 = 20;

    /// Link quality (0-5) at or below which a status warning is raised
    pub const SIGNAL_WEAK_QUALITY: u8 = 1;
}

/// An immutable value paired with the moment it was produced
///
/// Telemetry pushes never mutate a `DatedValue`; they replace it.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedValue<T> {
    pub value: T,
    pub date: Instant,
}

impl<T> DatedValue<T> {
    /// Stamp a value with the current instant
    pub fn new(value: T) -> Self {
        Self {
            value,
            date: Instant::now(),
        }
    }

    /// Stamp a value with an explicit instant
    pub fn with_date(value: T, date: Instant) -> Self {
        Self { value, date }
    }

    /// Time elapsed since the value was produced
    pub fn age(&self) -> Duration {
        self.date.elapsed()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DatedValue<U> {
        DatedValue {
            value: f(self.value),
            date: self.date,
        }
    }
}

/// Severity of a [`Message`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum MessageLevel {
    #[default]
    Info,
    Warning,
    Danger,
    Error,
}

/// A human-readable message surfaced to the mission layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub title: String,
    pub details: Option<String>,
    pub level: MessageLevel,
}

impl Message {
    /// Create a message from a localization key
    pub fn localized(key: &str, level: MessageLevel) -> Self {
        Self {
            title: messages::localized(key),
            details: None,
            level,
        }
    }

    /// Create a warning-level disengage message from a localization key
    pub fn disengage(key: &str) -> Self {
        Self::localized(key, MessageLevel::Warning)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {}", self.title, details),
            None => write!(f, "{}", self.title),
        }
    }
}
