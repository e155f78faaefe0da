//! Command handlers for the drone, camera and gimbal queues
//!
//! A handler either refuses synchronously (the command never reached the
//! vendor) or takes the [`Finisher`](crate::command::Finisher) and reports
//! once the vendor side has settled.

mod camera;
mod drone;
mod gimbal;

pub use camera::handle_camera_command;
pub use drone::handle_drone_command;
pub use gimbal::handle_gimbal_command;

use crate::config::SessionConfig;
use crate::vendor::Drone;
use std::sync::Arc;

/// Context passed to command handlers
#[derive(Clone)]
pub struct HandlerContext {
    pub drone: Arc<dyn Drone>,
    pub config: SessionConfig,
}

impl HandlerContext {
    pub fn new(drone: Arc<dyn Drone>, config: SessionConfig) -> Self {
        Self { drone, config }
    }
}
