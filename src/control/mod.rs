//! Drone control sessions

mod session;

pub use session::ControlSession;
