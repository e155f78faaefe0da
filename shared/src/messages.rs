//! Localized message table
//!
//! Keys follow the mission layer's `Component.subject.detail` naming. Only an
//! English table ships with the adapter.

pub const LOCALIZATION_MISSING: &str = "MISSING STRING LOCALIZATION";

pub const TAKE_OFF_FAILED: &str = "MissionDisengageReason.take.off.failed.title";
pub const TAKE_CONTROL_FAILED: &str = "MissionDisengageReason.take.control.failed.title";
pub const CONTROL_OVERRIDE: &str = "MissionDisengageReason.control.override.title";
pub const DRONE_CONTROL_UNAVAILABLE: &str = "MissionDisengageReason.drone.control.unavailable.title";
pub const TELEMETRY_UNAVAILABLE: &str = "MissionDisengageReason.telemetry.unavailable.title";
pub const TELEMETRY_DELAYED: &str = "MissionDisengageReason.telemetry.delayed.title";
pub const CAMERA_UNAVAILABLE: &str = "MissionDisengageReason.drone.camera.unavailable.title";
pub const GIMBAL_UNAVAILABLE: &str = "MissionDisengageReason.drone.gimbal.unavailable.title";
pub const COMMAND_TYPE_UNSUPPORTED: &str = "MissionDisengageReason.command.type.unsupported";
pub const COMMAND_TYPE_UNHANDLED: &str = "MissionDisengageReason.command.type.unhandled";
pub const CAMERA_START_PHOTO_FAILED: &str = "MissionDisengageReason.drone.camera.start.photo.failed.title";
pub const CAMERA_START_VIDEO_FAILED: &str = "MissionDisengageReason.drone.camera.start.video.failed.title";
pub const CAMERA_STOP_PHOTO_FAILED: &str = "MissionDisengageReason.drone.camera.stop.photo.failed.title";
pub const CAMERA_STOP_VIDEO_FAILED: &str = "MissionDisengageReason.drone.camera.stop.video.failed.title";
pub const COMMAND_TIMED_OUT: &str = "CommandQueue.command.timeout";
pub const COMMAND_ABANDONED: &str = "CommandQueue.command.abandoned";
pub const COMMAND_CONFIG_INVALID: &str = "CommandQueue.command.config.invalid";
pub const SESSION_CLOSED: &str = "DroneSession.closed";
pub const GO_HOME_UNAVAILABLE: &str = "ParrotDroneAdapter.startGoHome.unavailable";
pub const GO_HOME_FAILED: &str = "ParrotDroneAdapter.startGoHome.failed";
pub const LANDING_UNAVAILABLE: &str = "ParrotDroneAdapter.startLanding.unavailable";
pub const STATUS_BATTERY_LOW: &str = "DroneStatus.battery.low";
pub const STATUS_SIGNAL_WEAK: &str = "DroneStatus.signal.weak";
pub const STATUS_EMERGENCY: &str = "DroneStatus.flying.emergency";

const ENGLISH: &[(&str, &str)] = &[
    (TAKE_OFF_FAILED, "Takeoff failed"),
    (TAKE_CONTROL_FAILED, "Unable to take control of the drone"),
    (CONTROL_OVERRIDE, "Drone control was taken over"),
    (DRONE_CONTROL_UNAVAILABLE, "Drone control unavailable"),
    (TELEMETRY_UNAVAILABLE, "Telemetry unavailable"),
    (TELEMETRY_DELAYED, "Telemetry delayed"),
    (CAMERA_UNAVAILABLE, "Camera unavailable"),
    (GIMBAL_UNAVAILABLE, "Gimbal unavailable"),
    (COMMAND_TYPE_UNSUPPORTED, "Command type unsupported"),
    (COMMAND_TYPE_UNHANDLED, "Command type unhandled"),
    (CAMERA_START_PHOTO_FAILED, "Unable to start photo capture"),
    (CAMERA_START_VIDEO_FAILED, "Unable to start video recording"),
    (CAMERA_STOP_PHOTO_FAILED, "Unable to stop photo capture"),
    (CAMERA_STOP_VIDEO_FAILED, "Unable to stop video recording"),
    (COMMAND_TIMED_OUT, "Command timed out"),
    (COMMAND_ABANDONED, "Command ended without reporting a result"),
    (COMMAND_CONFIG_INVALID, "Command configuration invalid"),
    (SESSION_CLOSED, "Drone session closed"),
    (GO_HOME_UNAVAILABLE, "Return home unavailable"),
    (GO_HOME_FAILED, "Return home failed"),
    (LANDING_UNAVAILABLE, "Landing unavailable"),
    (STATUS_BATTERY_LOW, "Battery low"),
    (STATUS_SIGNAL_WEAK, "Weak radio signal"),
    (STATUS_EMERGENCY, "Drone emergency"),
];

/// Look up the display string for a key
///
/// Unknown keys resolve to [`LOCALIZATION_MISSING`].
pub fn localized(key: &str) -> String {
    ENGLISH
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| (*v).to_string())
        .unwrap_or_else(|| LOCALIZATION_MISSING.to_string())
}
