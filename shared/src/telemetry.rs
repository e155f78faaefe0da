//! Telemetry instrument values pushed by the vendor SDK

/// Orientation in radians: x = pitch, y = roll, z = yaw
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A geographic position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude above sea level (m), when known
    pub altitude: Option<f64>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
        }
    }
}

/// Vendor link state of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceState {
    pub connection_state: ConnectionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlyingState {
    #[default]
    Landed,
    Flying,
    EmergencyLanding,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LandedState {
    #[default]
    None,
    Initializing,
    Idle,
    MotorRamping,
    WaitingUserAction,
}

/// Coarse flight state reported by the drone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlyingIndicators {
    pub state: FlyingState,
    pub landed_state: LandedState,
}

impl FlyingIndicators {
    pub fn landed(landed_state: LandedState) -> Self {
        Self {
            state: FlyingState::Landed,
            landed_state,
        }
    }

    pub fn flying() -> Self {
        Self {
            state: FlyingState::Flying,
            landed_state: LandedState::None,
        }
    }

    pub fn is_flying(&self) -> bool {
        !matches!(self.state, FlyingState::Landed)
    }

    pub fn are_motors_on(&self) -> bool {
        match self.state {
            FlyingState::Landed => matches!(
                self.landed_state,
                LandedState::MotorRamping | LandedState::WaitingUserAction
            ),
            FlyingState::Flying | FlyingState::EmergencyLanding | FlyingState::Emergency => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gps {
    pub last_known_location: Option<Location>,
    pub fixed: bool,
    pub satellite_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Compass {
    /// Heading (deg)
    pub heading: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Altimeter {
    /// Altitude relative to the takeoff point (m)
    pub takeoff_relative_altitude: Option<f64>,
}

/// NED speeds (m/s)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Speedometer {
    pub ground_speed: f64,
    pub north_speed: f64,
    pub east_speed: f64,
    pub down_speed: f64,
}

impl Speedometer {
    pub fn vertical_speed(&self) -> f64 {
        -self.down_speed
    }

    pub fn course(&self) -> f64 {
        self.north_speed.atan2(self.east_speed)
    }
}

/// Drone attitude (deg)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttitudeIndicator {
    pub roll: f64,
    pub pitch: f64,
}

impl AttitudeIndicator {
    pub fn orientation(&self) -> Orientation3 {
        Orientation3 {
            x: self.pitch.to_radians(),
            y: self.roll.to_radians(),
            z: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatteryInfo {
    /// Charge level (%)
    pub battery_level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Radio {
    /// Link quality on a 0 (worst) to 5 (best) scale, when known
    pub link_signal_quality: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flying_states() {
        assert!(!FlyingIndicators::landed(LandedState::Idle).is_flying());
        assert!(FlyingIndicators::flying().is_flying());
        let emergency = FlyingIndicators {
            state: FlyingState::Emergency,
            landed_state: LandedState::None,
        };
        assert!(emergency.is_flying());
    }

    #[test]
    fn test_motors_on_while_landed() {
        assert!(!FlyingIndicators::landed(LandedState::Idle).are_motors_on());
        assert!(!FlyingIndicators::landed(LandedState::Initializing).are_motors_on());
        assert!(FlyingIndicators::landed(LandedState::MotorRamping).are_motors_on());
        assert!(FlyingIndicators::landed(LandedState::WaitingUserAction).are_motors_on());
        assert!(FlyingIndicators::flying().are_motors_on());
    }

    #[test]
    fn test_speedometer_derived_values() {
        let speed = Speedometer {
            ground_speed: 1.0,
            north_speed: 1.0,
            east_speed: 0.0,
            down_speed: 2.0,
        };
        assert_eq!(speed.vertical_speed(), -2.0);
        assert!((speed.course() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_attitude_orientation() {
        let attitude = AttitudeIndicator {
            roll: 90.0,
            pitch: 180.0,
        };
        let orientation = attitude.orientation();
        assert!((orientation.x - std::f64::consts::PI).abs() < 1e-9);
        assert!((orientation.y - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert_eq!(orientation.z, 0.0);
    }
}
