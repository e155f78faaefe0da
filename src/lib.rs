//! Parrot drone adapter
//!
//! Binds the Parrot vendor SDK (consumed through the capability traits in
//! [`vendor`]) to the mission layer's command and session model: one
//! [`DroneSession`] per connected drone, per-channel command queues, and
//! [`ControlSession`]s that take off and take control before flight
//! commands are allowed.

pub mod command;
pub mod config;
pub mod control;
pub mod mapping;
pub mod session;
pub mod vendor;

pub use config::SessionConfig;
pub use control::ControlSession;
pub use session::{
    CameraStateSnapshot, DroneSession, DroneSessionDelegate, DroneStateSnapshot,
    GimbalStateSnapshot, SessionManager, SessionManagerDelegate,
};
