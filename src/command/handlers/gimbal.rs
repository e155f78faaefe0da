//! Gimbal command handler

use super::HandlerContext;
use crate::command::Finisher;
use crate::vendor::GimbalControlMode;
use parrot_shared::{messages, CommandError, GimbalCommand, GimbalCommandKind};
use tracing::debug;

/// Handle a gimbal command for the gimbal on the command's channel
pub fn handle_gimbal_command(
    ctx: &HandlerContext,
    command: &GimbalCommand,
    finisher: Finisher,
) -> Result<(), CommandError> {
    let gimbal = ctx
        .drone
        .gimbal(command.channel)
        .ok_or_else(|| CommandError::unavailable(messages::GIMBAL_UNAVAILABLE))?;

    match &command.kind {
        GimbalCommandKind::Mode(_) => Err(CommandError::unsupported()),

        GimbalCommandKind::Orientation(orientation) => {
            if !orientation.is_empty() {
                let yaw = orientation.yaw.map(f64::to_degrees);
                let pitch = orientation.pitch.map(f64::to_degrees);
                let roll = orientation.roll.map(f64::to_degrees);
                debug!(
                    "[GIMBAL] channel {} orientation yaw={:?} pitch={:?} roll={:?}",
                    command.channel, yaw, pitch, roll
                );
                gimbal.control(GimbalControlMode::Position, yaw, pitch, roll);
            }
            finisher.succeed();
            Ok(())
        }

        GimbalCommandKind::Other { .. } => Err(CommandError::unhandled()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::vendor::sim::SimDrone;
    use parrot_shared::{GimbalMode, GimbalOrientation};
    use std::f64::consts::FRAC_PI_2;

    fn context(drone: &std::sync::Arc<SimDrone>) -> HandlerContext {
        HandlerContext::new(drone.clone(), SessionConfig::default())
    }

    #[test]
    fn test_orientation_converted_to_degrees() {
        let drone = SimDrone::new("d1");
        let (finisher, mut rx) = Finisher::channel();
        let command = GimbalCommand::new(
            "g1",
            0,
            GimbalCommandKind::Orientation(GimbalOrientation {
                pitch: Some(-FRAC_PI_2),
                ..Default::default()
            }),
        );

        handle_gimbal_command(&context(&drone), &command, finisher).unwrap();

        assert_eq!(rx.try_recv().unwrap(), None);
        let calls = drone.sim_gimbal(0).unwrap().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].mode, GimbalControlMode::Position);
        assert!((calls[0].pitch.unwrap() + 90.0).abs() < 1e-9);
        assert_eq!(calls[0].yaw, None);
    }

    #[test]
    fn test_empty_orientation_finishes_without_vendor_call() {
        let drone = SimDrone::new("d1");
        let (finisher, mut rx) = Finisher::channel();
        let command = GimbalCommand::new(
            "g1",
            0,
            GimbalCommandKind::Orientation(GimbalOrientation::default()),
        );

        handle_gimbal_command(&context(&drone), &command, finisher).unwrap();

        assert_eq!(rx.try_recv().unwrap(), None);
        assert!(drone.sim_gimbal(0).unwrap().calls().is_empty());
    }

    #[test]
    fn test_mode_unsupported() {
        let drone = SimDrone::new("d1");
        let (finisher, _rx) = Finisher::channel();
        let command = GimbalCommand::new("g1", 0, GimbalCommandKind::Mode(GimbalMode::Fpv));

        let result = handle_gimbal_command(&context(&drone), &command, finisher);
        assert_eq!(result, Err(CommandError::unsupported()));
        assert!(drone.sim_gimbal(0).unwrap().calls().is_empty());
    }

    #[test]
    fn test_missing_gimbal_unavailable() {
        let drone = SimDrone::new("d1");
        let (finisher, _rx) = Finisher::channel();
        let command = GimbalCommand::new(
            "g1",
            1,
            GimbalCommandKind::Other {
                type_name: "yawFollow".into(),
            },
        );

        let result = handle_gimbal_command(&context(&drone), &command, finisher);
        assert_eq!(
            result,
            Err(CommandError::unavailable(messages::GIMBAL_UNAVAILABLE))
        );
    }
}
