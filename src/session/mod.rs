//! Drone session management
//!
//! This module handles:
//! - Tracking the connected drone's session
//! - Mirroring telemetry into dated snapshots
//! - Routing mission commands to the drone, camera and gimbal queues
//! - Delivering lifecycle events to observers

mod delegate;
mod drone_session;
mod manager;
mod state;

pub use delegate::{DroneSessionDelegate, MulticastDelegate, SessionManagerDelegate};
pub use drone_session::DroneSession;
pub use manager::SessionManager;
pub use state::{CameraStateSnapshot, DroneStateSnapshot, GimbalStateSnapshot};
