//! Point-in-time views of a session's drone, cameras and gimbals

use crate::mapping::ToKernel;
use crate::vendor::{Camera, Gimbal};
use parrot_shared::{CameraMode, Channel, GimbalMode, Location, Message, Orientation3};

/// Drone state as of one instant
#[derive(Debug, Clone, PartialEq)]
pub struct DroneStateSnapshot {
    pub flying: bool,
    pub motors_on: bool,
    pub location: Option<Location>,
    pub home_location: Option<Location>,
    /// Last position reported while on the ground
    pub last_known_ground_location: Option<Location>,
    pub takeoff_location: Option<Location>,
    /// Course over ground (rad)
    pub course: f64,
    /// Ground speed (m/s)
    pub horizontal_speed: f64,
    /// Upward speed (m/s)
    pub vertical_speed: f64,
    /// Altitude above the takeoff point (m)
    pub altitude: f64,
    /// Pitch, roll, heading (rad)
    pub orientation: Orientation3,
    pub battery_percent: Option<u8>,
    /// Link quality, 0 (worst) to 5 (best)
    pub signal_quality: Option<u8>,
    pub status_messages: Vec<Message>,
}

/// Camera state as of one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraStateSnapshot {
    pub channel: Channel,
    pub mode: CameraMode,
    pub capturing_photo_interval: bool,
    pub capturing_video: bool,
}

impl CameraStateSnapshot {
    pub fn from_camera(channel: Channel, camera: &dyn Camera) -> Self {
        Self {
            channel,
            mode: camera.mode().to_kernel(),
            capturing_photo_interval: camera.is_capturing_photo_interval(),
            capturing_video: camera.is_capturing_video(),
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing_photo_interval || self.capturing_video
    }
}

/// Gimbal state as of one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GimbalStateSnapshot {
    pub channel: Channel,
    pub mode: GimbalMode,
    /// Pitch, roll, yaw (rad); unreported axes read as zero
    pub orientation: Orientation3,
}

impl GimbalStateSnapshot {
    /// The vendor gimbal only follows the drone's yaw
    pub fn from_gimbal(channel: Channel, gimbal: &dyn Gimbal) -> Self {
        let attitude = gimbal.current_attitude();
        Self {
            channel,
            mode: GimbalMode::YawFollow,
            orientation: Orientation3 {
                x: attitude.pitch.unwrap_or(0.0).to_radians(),
                y: attitude.roll.unwrap_or(0.0).to_radians(),
                z: attitude.yaw.unwrap_or(0.0).to_radians(),
            },
        }
    }
}
