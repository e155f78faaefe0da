//! Camera command handler

use super::HandlerContext;
use crate::command::Finisher;
use crate::mapping::ToVendor;
use crate::vendor::{Camera, CameraEditor, VendorCameraMode};
use parrot_shared::{messages, CameraCommand, CameraCommandKind, CommandError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Handle a camera command for the camera on the command's channel
pub fn handle_camera_command(
    ctx: &HandlerContext,
    command: &CameraCommand,
    finisher: Finisher,
) -> Result<(), CommandError> {
    let camera = ctx
        .drone
        .camera(command.channel)
        .ok_or_else(|| CommandError::unavailable(messages::CAMERA_UNAVAILABLE))?;

    match &command.kind {
        CameraCommandKind::Aperture { .. }
        | CameraCommandKind::FileIndexMode { .. }
        | CameraCommandKind::FocusMode { .. }
        | CameraCommandKind::FocusDistance { .. }
        | CameraCommandKind::FocusRing { .. }
        | CameraCommandKind::StorageLocation { .. }
        | CameraCommandKind::VideoFileCompressionStandard { .. }
        | CameraCommandKind::VideoFileFormat { .. } => Err(CommandError::unsupported()),

        CameraCommandKind::Mode(mode) => {
            let vendor = mode.to_vendor();
            edit(ctx, camera.as_ref(), finisher, |editor| editor.set_mode(vendor));
            Ok(())
        }

        CameraCommandKind::PhotoMode(photo_mode) => {
            let vendor = photo_mode.to_vendor();
            edit(ctx, camera.as_ref(), finisher, |editor| {
                editor.set_photo_mode(vendor)
            });
            Ok(())
        }

        CameraCommandKind::StartCapture => start_capture(ctx, camera, finisher),

        CameraCommandKind::StopCapture => stop_capture(camera.as_ref(), finisher),

        CameraCommandKind::Other { .. } => Err(CommandError::unhandled()),
    }
}

/// Apply one configuration change and wait for the drone to acknowledge it
///
/// Reports success once the attempt ceiling is reached even without an
/// acknowledgment.
fn edit<F>(ctx: &HandlerContext, camera: &dyn Camera, finisher: Finisher, apply: F)
where
    F: FnOnce(&mut dyn CameraEditor) -> bool,
{
    let mut editor = camera.edit_config();
    if !apply(editor.as_mut()) {
        finisher.fail(CommandError::unsupported());
        return;
    }
    editor.commit();

    let settle = ctx.config.camera_editor_settle;
    let poll = ctx.config.camera_editor_poll_interval;
    let max_attempts = ctx.config.camera_editor_max_attempts;

    tokio::spawn(async move {
        tokio::time::sleep(settle).await;

        for attempt in 1..=max_attempts {
            if editor.is_complete() {
                debug!("[CAMERA] edit acknowledged after {} attempts", attempt);
                finisher.succeed();
                return;
            }
            debug!("[CAMERA] waiting for edit ({}/{})", attempt, max_attempts);
            if attempt < max_attempts {
                tokio::time::sleep(poll).await;
            }
        }

        warn!(
            "[CAMERA] edit not acknowledged after {} attempts, assuming applied",
            max_attempts
        );
        finisher.succeed();
    });
}

fn start_capture(
    ctx: &HandlerContext,
    camera: Arc<dyn Camera>,
    finisher: Finisher,
) -> Result<(), CommandError> {
    match camera.mode() {
        VendorCameraMode::Photo => {
            if camera.is_capturing_photo_interval() {
                debug!("[CAMERA] interval capture already running");
                finisher.succeed();
                return Ok(());
            }
            if !camera.can_start_photo_capture() {
                return Err(CommandError::failed(messages::CAMERA_START_PHOTO_FAILED));
            }
            camera.start_photo_capture();
        }
        VendorCameraMode::Recording => {
            if camera.is_capturing_video() {
                debug!("[CAMERA] recording already running");
                finisher.succeed();
                return Ok(());
            }
            if !camera.can_start_recording() {
                return Err(CommandError::failed(messages::CAMERA_START_VIDEO_FAILED));
            }
            camera.start_recording();
        }
    }

    finish_after(ctx.config.capture_settle, finisher);
    Ok(())
}

fn stop_capture(camera: &dyn Camera, finisher: Finisher) -> Result<(), CommandError> {
    match camera.mode() {
        VendorCameraMode::Photo => {
            if !camera.is_capturing_photo_interval() {
                debug!("[CAMERA] stop skipped, no interval capture running");
            } else if camera.can_stop_photo_capture() {
                camera.stop_photo_capture();
            } else {
                return Err(CommandError::failed(messages::CAMERA_STOP_PHOTO_FAILED));
            }
        }
        VendorCameraMode::Recording => {
            if !camera.is_capturing_video() {
                debug!("[CAMERA] stop skipped, not recording");
            } else if camera.can_stop_recording() {
                camera.stop_recording();
            } else {
                return Err(CommandError::failed(messages::CAMERA_STOP_VIDEO_FAILED));
            }
        }
    }

    finisher.succeed();
    Ok(())
}

fn finish_after(delay: Duration, finisher: Finisher) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        finisher.succeed();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::vendor::sim::{CameraCall, SimDrone};
    use crate::vendor::{PhotoFunctionState, RecordingFunctionState, VendorPhotoMode};
    use parrot_shared::{CameraMode, CameraPhotoMode};
    use tokio::time::Instant;

    fn context(drone: &Arc<SimDrone>) -> HandlerContext {
        HandlerContext::new(drone.clone(), SessionConfig::default())
    }

    fn command(kind: CameraCommandKind) -> CameraCommand {
        CameraCommand::new("cam", 0, kind)
    }

    #[test]
    fn test_unsupported_never_reaches_vendor() {
        let drone = SimDrone::new("d1");
        for kind in [
            CameraCommandKind::Aperture { value: "f2.8".into() },
            CameraCommandKind::FileIndexMode { sequence: true },
            CameraCommandKind::FocusMode { value: "auto".into() },
            CameraCommandKind::FocusDistance { meters: 12.0 },
            CameraCommandKind::FocusRing { value: 0.5 },
            CameraCommandKind::StorageLocation { internal: true },
            CameraCommandKind::VideoFileCompressionStandard { value: "h265".into() },
            CameraCommandKind::VideoFileFormat { value: "mp4".into() },
        ] {
            let (finisher, _rx) = Finisher::channel();
            let result = handle_camera_command(&context(&drone), &command(kind), finisher);
            assert_eq!(result, Err(CommandError::unsupported()));
        }
        assert!(drone.sim_camera(0).unwrap().calls().is_empty());
    }

    #[test]
    fn test_missing_camera_unavailable() {
        let drone = SimDrone::bare("d1");
        let (finisher, _rx) = Finisher::channel();
        let start = command(CameraCommandKind::StartCapture);
        let result = handle_camera_command(&context(&drone), &start, finisher);
        assert_eq!(
            result,
            Err(CommandError::unavailable(messages::CAMERA_UNAVAILABLE))
        );
    }

    #[test]
    fn test_other_unhandled() {
        let drone = SimDrone::new("d1");
        let (finisher, _rx) = Finisher::channel();
        let kind = CameraCommandKind::Other {
            type_name: "whiteBalance".into(),
        };
        let result = handle_camera_command(&context(&drone), &command(kind), finisher);
        assert_eq!(result, Err(CommandError::unhandled()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_edit_acknowledged() {
        let drone = SimDrone::new("d1");
        let (finisher, rx) = Finisher::channel();

        handle_camera_command(
            &context(&drone),
            &command(CameraCommandKind::Mode(CameraMode::Video)),
            finisher,
        )
        .unwrap();

        assert_eq!(rx.await.unwrap(), None);
        let camera = drone.sim_camera(0).unwrap();
        assert_eq!(camera.mode(), VendorCameraMode::Recording);
        assert_eq!(camera.completion_checks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_succeeds_after_attempt_ceiling() {
        let drone = SimDrone::new("d1");
        let camera = drone.sim_camera(0).unwrap();
        camera.set_editor_acknowledges(false);
        let (finisher, rx) = Finisher::channel();
        let started = Instant::now();

        handle_camera_command(
            &context(&drone),
            &command(CameraCommandKind::PhotoMode(CameraPhotoMode::TimeLapse)),
            finisher,
        )
        .unwrap();

        assert_eq!(rx.await.unwrap(), None);
        assert_eq!(camera.completion_checks(), 20);
        assert_eq!(camera.photo_mode(), VendorPhotoMode::TimeLapse);
        assert!(started.elapsed() >= Duration::from_millis(2900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_editable_parameter_unsupported() {
        let drone = SimDrone::new("d1");
        let camera = drone.sim_camera(0).unwrap();
        camera.set_photo_mode_editable(false);
        let (finisher, rx) = Finisher::channel();

        handle_camera_command(
            &context(&drone),
            &command(CameraCommandKind::PhotoMode(CameraPhotoMode::Burst)),
            finisher,
        )
        .unwrap();

        assert_eq!(rx.await.unwrap(), Some(CommandError::unsupported()));
        assert!(camera.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_photo_capture_waits_settle() {
        let drone = SimDrone::new("d1");
        let (finisher, rx) = Finisher::channel();
        let started = Instant::now();

        handle_camera_command(
            &context(&drone),
            &command(CameraCommandKind::StartCapture),
            finisher,
        )
        .unwrap();

        assert_eq!(rx.await.unwrap(), None);
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(
            drone.sim_camera(0).unwrap().calls(),
            vec![CameraCall::StartPhotoCapture]
        );
    }

    #[test]
    fn test_start_photo_refused() {
        let drone = SimDrone::new("d1");
        drone.sim_camera(0).unwrap().set_can_start_photo(false);
        let (finisher, _rx) = Finisher::channel();

        let start = command(CameraCommandKind::StartCapture);
        let result = handle_camera_command(&context(&drone), &start, finisher);
        assert_eq!(
            result,
            Err(CommandError::failed(messages::CAMERA_START_PHOTO_FAILED))
        );
    }

    #[test]
    fn test_start_capture_skips_when_recording() {
        let drone = SimDrone::new("d1");
        let camera = drone.sim_camera(0).unwrap();
        camera.set_mode(VendorCameraMode::Recording);
        camera.set_recording_state(RecordingFunctionState::Started);
        let (finisher, mut rx) = Finisher::channel();

        let start = command(CameraCommandKind::StartCapture);
        handle_camera_command(&context(&drone), &start, finisher).unwrap();

        assert_eq!(rx.try_recv().unwrap(), None);
        assert!(camera.calls().is_empty());
    }

    #[test]
    fn test_stop_capture() {
        let drone = SimDrone::new("d1");
        let camera = drone.sim_camera(0).unwrap();
        camera.set_photo_state(PhotoFunctionState::Started);
        let (finisher, mut rx) = Finisher::channel();

        let stop = command(CameraCommandKind::StopCapture);
        handle_camera_command(&context(&drone), &stop, finisher).unwrap();

        assert_eq!(rx.try_recv().unwrap(), None);
        assert_eq!(camera.calls(), vec![CameraCall::StopPhotoCapture]);
    }

    #[test]
    fn test_stop_capture_follows_camera_mode() {
        let drone = SimDrone::new("d1");
        let camera = drone.sim_camera(0).unwrap();
        camera.set_mode(VendorCameraMode::Recording);
        camera.set_photo_state(PhotoFunctionState::Started);
        let (finisher, mut rx) = Finisher::channel();

        let stop = command(CameraCommandKind::StopCapture);
        handle_camera_command(&context(&drone), &stop, finisher).unwrap();

        assert_eq!(rx.try_recv().unwrap(), None);
        assert!(camera.calls().is_empty());

        camera.set_mode(VendorCameraMode::Photo);
        camera.set_photo_state(PhotoFunctionState::Stopped);
        camera.set_recording_state(RecordingFunctionState::Started);
        let (finisher, mut rx) = Finisher::channel();

        handle_camera_command(&context(&drone), &stop, finisher).unwrap();

        assert_eq!(rx.try_recv().unwrap(), None);
        assert!(camera.calls().is_empty());
    }

    #[test]
    fn test_stop_recording_refused() {
        let drone = SimDrone::new("d1");
        let camera = drone.sim_camera(0).unwrap();
        camera.set_mode(VendorCameraMode::Recording);
        camera.set_recording_state(RecordingFunctionState::Started);
        camera.set_can_stop_recording(false);
        let (finisher, _rx) = Finisher::channel();

        let stop = command(CameraCommandKind::StopCapture);
        let result = handle_camera_command(&context(&drone), &stop, finisher);
        assert_eq!(
            result,
            Err(CommandError::failed(messages::CAMERA_STOP_VIDEO_FAILED))
        );
        assert!(camera.calls().is_empty());
    }
}
