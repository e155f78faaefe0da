//! Error taxonomy for command execution and submission
//!
//! Every variant carries a localized, human-readable message and displays as
//! exactly that message. None of these are fatal to the host.

use thiserror::Error;

use crate::messages;

/// Why a command did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The vendor capability the command needs is not present right now
    #[error("{0}")]
    Unavailable(String),

    /// The command has no equivalent vendor capability
    #[error("{0}")]
    Unsupported(String),

    /// The command type is not recognised by this adapter
    #[error("{0}")]
    Unhandled(String),

    /// The vendor refused or failed the operation
    #[error("{0}")]
    Failed(String),

    /// The command did not finish within its configured timeout
    #[error("{0}")]
    TimedOut(String),

    /// The command's completion handle was dropped without a result
    #[error("{0}")]
    Abandoned(String),
}

impl CommandError {
    pub fn unavailable(key: &str) -> Self {
        Self::Unavailable(messages::localized(key))
    }

    pub fn unsupported() -> Self {
        Self::Unsupported(messages::localized(messages::COMMAND_TYPE_UNSUPPORTED))
    }

    pub fn unhandled() -> Self {
        Self::Unhandled(messages::localized(messages::COMMAND_TYPE_UNHANDLED))
    }

    pub fn failed(key: &str) -> Self {
        Self::Failed(messages::localized(key))
    }

    pub fn timed_out() -> Self {
        Self::TimedOut(messages::localized(messages::COMMAND_TIMED_OUT))
    }

    pub fn abandoned() -> Self {
        Self::Abandoned(messages::localized(messages::COMMAND_ABANDONED))
    }

    /// The localized message
    pub fn message(&self) -> &str {
        match self {
            Self::Unavailable(m)
            | Self::Unsupported(m)
            | Self::Unhandled(m)
            | Self::Failed(m)
            | Self::TimedOut(m)
            | Self::Abandoned(m) => m,
        }
    }
}

/// Why a command could not be submitted to a session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("{0}")]
    CommandTypeUnhandled(String),

    #[error("{title} ({reason})")]
    InvalidConfiguration { title: String, reason: String },

    #[error("{0}")]
    Closed(String),
}

impl SessionError {
    pub fn command_type_unhandled() -> Self {
        Self::CommandTypeUnhandled(messages::localized(messages::COMMAND_TYPE_UNHANDLED))
    }

    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            title: messages::localized(messages::COMMAND_CONFIG_INVALID),
            reason: reason.into(),
        }
    }

    pub fn closed() -> Self {
        Self::Closed(messages::localized(messages::SESSION_CLOSED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_displays_message() {
        let err = CommandError::unsupported();
        assert_eq!(err.to_string(), "Command type unsupported");
        assert_eq!(err.message(), "Command type unsupported");
    }

    #[test]
    fn test_unavailable_uses_key() {
        let err = CommandError::unavailable(messages::CAMERA_UNAVAILABLE);
        assert_eq!(err, CommandError::Unavailable("Camera unavailable".into()));
    }

    #[test]
    fn test_invalid_configuration_display() {
        let err = SessionError::invalid_configuration("retries 9 exceeds 3");
        assert_eq!(
            err.to_string(),
            "Command configuration invalid (retries 9 exceeds 3)"
        );
    }
}
