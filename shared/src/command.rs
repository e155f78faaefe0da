//! Kernel command model
//!
//! Commands arrive from the mission layer in one of three kinds: drone-level
//! settings, camera commands and gimbal commands. Camera and gimbal commands
//! address a channel (the index of the camera or gimbal on the drone).

use std::time::Duration;

use crate::error::SessionError;
use crate::telemetry::Orientation3;
use crate::timing;

/// Index of a camera or gimbal on a drone
pub type Channel = u32;

/// Optional per-command execution policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandConfig {
    /// Per-attempt timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Additional attempts after the first one times out
    pub retries: u32,
}

impl CommandConfig {
    pub fn with_timeout(timeout: Duration, retries: u32) -> Self {
        Self {
            timeout: Some(timeout),
            retries,
        }
    }

    /// Check the configuration is usable before it is queued
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.timeout == Some(Duration::ZERO) {
            return Err(SessionError::invalid_configuration("timeout must be non-zero"));
        }
        if self.retries > 0 && self.timeout.is_none() {
            return Err(SessionError::invalid_configuration(
                "retries require a timeout",
            ));
        }
        if self.retries > timing::COMMAND_MAX_RETRIES {
            return Err(SessionError::invalid_configuration(format!(
                "retries {} exceeds {}",
                self.retries,
                timing::COMMAND_MAX_RETRIES
            )));
        }
        Ok(())
    }
}

/// Behaviour when the control link is lost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFailSafeBehavior {
    Hover,
    ReturnHome,
    AutoLand,
    Unknown,
}

/// Drone-level settings commands
#[derive(Debug, Clone, PartialEq)]
pub enum DroneCommandKind {
    ConnectionFailSafeBehavior(ConnectionFailSafeBehavior),
    LowBatteryWarningThreshold { percent: f64 },
    MaxAltitude { meters: f64 },
    MaxDistance { meters: f64 },
    ReturnHomeAltitude { meters: f64 },
    LightbridgeChannel { channel: u32 },
    OcuSyncChannel { channel: u32 },
}

impl DroneCommandKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ConnectionFailSafeBehavior(_) => "connectionFailSafeBehavior",
            Self::LowBatteryWarningThreshold { .. } => "lowBatteryWarningThreshold",
            Self::MaxAltitude { .. } => "maxAltitude",
            Self::MaxDistance { .. } => "maxDistance",
            Self::ReturnHomeAltitude { .. } => "returnHomeAltitude",
            Self::LightbridgeChannel { .. } => "lightbridgeChannel",
            Self::OcuSyncChannel { .. } => "ocuSyncChannel",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroneCommand {
    pub id: String,
    pub kind: DroneCommandKind,
    pub config: CommandConfig,
}

impl DroneCommand {
    pub fn new(id: impl Into<String>, kind: DroneCommandKind) -> Self {
        Self {
            id: id.into(),
            kind,
            config: CommandConfig::default(),
        }
    }
}

/// Kernel camera modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    Photo,
    Video,
    Playback,
    Download,
    Broadcast,
    Unknown,
}

/// Kernel photo modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPhotoMode {
    Single,
    Hdr,
    Burst,
    Aeb,
    Interval,
    TimeLapse,
    RawBurst,
    ShallowFocus,
    Panorama,
    Ehdr,
    HyperLight,
    HighResolution,
    Smart,
    HyperLapse,
    SuperResolution,
    Unknown,
}

/// Camera commands
#[derive(Debug, Clone, PartialEq)]
pub enum CameraCommandKind {
    Aperture { value: String },
    FileIndexMode { sequence: bool },
    FocusMode { value: String },
    FocusDistance { meters: f64 },
    FocusRing { value: f64 },
    Mode(CameraMode),
    PhotoMode(CameraPhotoMode),
    StartCapture,
    StopCapture,
    StorageLocation { internal: bool },
    VideoFileCompressionStandard { value: String },
    VideoFileFormat { value: String },
    /// A kernel camera command this adapter has no handling for
    Other { type_name: String },
}

impl CameraCommandKind {
    pub fn type_name(&self) -> &str {
        match self {
            Self::Aperture { .. } => "aperture",
            Self::FileIndexMode { .. } => "fileIndexMode",
            Self::FocusMode { .. } => "focusMode",
            Self::FocusDistance { .. } => "focusDistance",
            Self::FocusRing { .. } => "focusRing",
            Self::Mode(_) => "mode",
            Self::PhotoMode(_) => "photoMode",
            Self::StartCapture => "startCapture",
            Self::StopCapture => "stopCapture",
            Self::StorageLocation { .. } => "storageLocation",
            Self::VideoFileCompressionStandard { .. } => "videoFileCompressionStandard",
            Self::VideoFileFormat { .. } => "videoFileFormat",
            Self::Other { type_name } => type_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraCommand {
    pub id: String,
    pub channel: Channel,
    pub kind: CameraCommandKind,
    pub config: CommandConfig,
}

impl CameraCommand {
    pub fn new(id: impl Into<String>, channel: Channel, kind: CameraCommandKind) -> Self {
        Self {
            id: id.into(),
            channel,
            kind,
            config: CommandConfig::default(),
        }
    }
}

/// Kernel gimbal modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GimbalMode {
    Free,
    YawFollow,
    Fpv,
    Unknown,
}

/// A gimbal orientation where each axis is optional (radians)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GimbalOrientation {
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    pub yaw: Option<f64>,
}

impl GimbalOrientation {
    pub fn is_empty(&self) -> bool {
        self.pitch.is_none() && self.roll.is_none() && self.yaw.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GimbalCommandKind {
    Mode(GimbalMode),
    Orientation(GimbalOrientation),
    Other { type_name: String },
}

impl GimbalCommandKind {
    pub fn type_name(&self) -> &str {
        match self {
            Self::Mode(_) => "mode",
            Self::Orientation(_) => "orientation",
            Self::Other { type_name } => type_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GimbalCommand {
    pub id: String,
    pub channel: Channel,
    pub kind: GimbalCommandKind,
    pub config: CommandConfig,
}

impl GimbalCommand {
    pub fn new(id: impl Into<String>, channel: Channel, kind: GimbalCommandKind) -> Self {
        Self {
            id: id.into(),
            channel,
            kind,
            config: CommandConfig::default(),
        }
    }
}

/// Any command the mission layer can submit to a session
#[derive(Debug, Clone, PartialEq)]
pub enum MissionCommand {
    Drone(DroneCommand),
    Camera(CameraCommand),
    Gimbal(GimbalCommand),
    /// A command of a kind this adapter does not route
    Other { id: String, type_name: String },
}

impl MissionCommand {
    pub fn id(&self) -> &str {
        match self {
            Self::Drone(c) => &c.id,
            Self::Camera(c) => &c.id,
            Self::Gimbal(c) => &c.id,
            Self::Other { id, .. } => id,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Drone(c) => c.kind.type_name(),
            Self::Camera(c) => c.kind.type_name(),
            Self::Gimbal(c) => c.kind.type_name(),
            Self::Other { type_name, .. } => type_name,
        }
    }

    pub fn config(&self) -> CommandConfig {
        match self {
            Self::Drone(c) => c.config,
            Self::Camera(c) => c.config,
            Self::Gimbal(c) => c.config,
            Self::Other { .. } => CommandConfig::default(),
        }
    }
}

/// Direct velocity set-point for the drone
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityCommand {
    /// Forward velocity (m/s)
    pub forward: f64,
    /// Right velocity (m/s)
    pub right: f64,
    /// Upward velocity (m/s)
    pub vertical: f64,
    /// Yaw rate (rad/s), ignored when `heading` is set
    pub rotational: f64,
    /// Absolute heading (rad)
    pub heading: Option<f64>,
}

/// Direct angular velocity set-point for a gimbal (rad/s)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GimbalVelocityCommand {
    pub velocity: Orientation3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CommandConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_timeout() {
        let config = CommandConfig::with_timeout(Duration::ZERO, 0);
        assert!(matches!(
            config.validate(),
            Err(SessionError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_config_rejects_retries_without_timeout() {
        let config = CommandConfig {
            timeout: None,
            retries: 1,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_excess_retries() {
        let config = CommandConfig::with_timeout(
            Duration::from_secs(1),
            timing::COMMAND_MAX_RETRIES + 1,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mission_command_accessors() {
        let command = MissionCommand::Camera(CameraCommand::new(
            "cam-1",
            0,
            CameraCommandKind::StartCapture,
        ));
        assert_eq!(command.id(), "cam-1");
        assert_eq!(command.type_name(), "startCapture");
    }

    #[test]
    fn test_empty_gimbal_orientation() {
        assert!(GimbalOrientation::default().is_empty());
        let orientation = GimbalOrientation {
            pitch: Some(-0.5),
            ..Default::default()
        };
        assert!(!orientation.is_empty());
    }
}
