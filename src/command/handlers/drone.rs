//! Drone-level settings command handler

use super::HandlerContext;
use crate::command::Finisher;
use parrot_shared::{messages, CommandError, DroneCommand, DroneCommandKind};
use tracing::debug;

/// Handle a drone settings command
///
/// Every supported setting is applied immediately; the vendor does not
/// acknowledge them.
pub fn handle_drone_command(
    ctx: &HandlerContext,
    command: &DroneCommand,
    finisher: Finisher,
) -> Result<(), CommandError> {
    if matches!(
        command.kind,
        DroneCommandKind::LightbridgeChannel { .. } | DroneCommandKind::OcuSyncChannel { .. }
    ) {
        return Err(CommandError::unsupported());
    }

    let return_home = ctx
        .drone
        .return_home_controller()
        .ok_or_else(|| CommandError::unavailable(messages::DRONE_CONTROL_UNAVAILABLE))?;
    let geofence = ctx
        .drone
        .geofence()
        .ok_or_else(|| CommandError::unavailable(messages::DRONE_CONTROL_UNAVAILABLE))?;

    match &command.kind {
        DroneCommandKind::ConnectionFailSafeBehavior(_)
        | DroneCommandKind::LowBatteryWarningThreshold { .. }
        | DroneCommandKind::LightbridgeChannel { .. }
        | DroneCommandKind::OcuSyncChannel { .. } => Err(CommandError::unsupported()),

        DroneCommandKind::MaxAltitude { meters } => {
            debug!("[DRONE] geofence max altitude -> {} m", meters);
            geofence.set_max_altitude(*meters);
            finisher.succeed();
            Ok(())
        }

        DroneCommandKind::MaxDistance { meters } => {
            debug!("[DRONE] geofence max distance -> {} m", meters);
            geofence.set_max_distance(*meters);
            finisher.succeed();
            Ok(())
        }

        DroneCommandKind::ReturnHomeAltitude { meters } => {
            if !return_home.set_min_altitude(*meters) {
                return Err(CommandError::unavailable(messages::DRONE_CONTROL_UNAVAILABLE));
            }
            debug!("[DRONE] return home min altitude -> {} m", meters);
            finisher.succeed();
            Ok(())
        }
    }
}
