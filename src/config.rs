//! Session configuration

use parrot_shared::timing;
use std::time::Duration;

/// Configuration shared by a drone session, its command handlers and its
/// control sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Polling loop period (location tracking, queue draining)
    pub poll_interval: Duration,
    /// How long a takeoff may take before activation fails
    pub takeoff_grace: Duration,
    /// Wait after committing a camera edit before checking completion
    pub camera_editor_settle: Duration,
    /// Spacing between camera edit completion checks
    pub camera_editor_poll_interval: Duration,
    /// Completion checks before a camera edit is reported done regardless
    pub camera_editor_max_attempts: u32,
    /// Wait after starting a capture before the command finishes
    pub capture_settle: Duration,
    /// GPS age past which telemetry counts as delayed
    pub telemetry_delay_threshold: Duration,
    /// When false, control sessions never take off or take control
    pub motion_enabled: bool,
    /// Horizontal velocity mapped to a full-scale tilt set-point (m/s)
    pub max_velocity_horizontal: f64,
    /// Vertical velocity mapped to a full-scale set-point (m/s)
    pub max_velocity_vertical: f64,
    /// Yaw rate mapped to a full-scale set-point (deg/s)
    pub max_yaw_rate: f64,
    /// Gimbal pitch restored on reset (deg)
    pub reset_gimbal_pitch: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(timing::POLL_INTERVAL_MS),
            takeoff_grace: Duration::from_millis(timing::TAKEOFF_GRACE_MS),
            camera_editor_settle: Duration::from_millis(timing::CAMERA_EDITOR_SETTLE_MS),
            camera_editor_poll_interval: Duration::from_millis(timing::CAMERA_EDITOR_POLL_MS),
            camera_editor_max_attempts: timing::CAMERA_EDITOR_MAX_ATTEMPTS,
            capture_settle: Duration::from_millis(timing::CAPTURE_SETTLE_MS),
            telemetry_delay_threshold: Duration::from_millis(timing::TELEMETRY_DELAYED_MS),
            motion_enabled: true,
            max_velocity_horizontal: 10.0,
            max_velocity_vertical: 4.0,
            max_yaw_rate: 180.0,
            reset_gimbal_pitch: -12.0,
        }
    }
}
