//! Drives a simulated drone through one full session

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parrot_bridge::vendor::sim::{SimDrone, SimRemoteControl};
use parrot_bridge::vendor::{Connectivity, Drone, RemoteControl};
use parrot_bridge::{
    DroneSession, DroneSessionDelegate, SessionConfig, SessionManager, SessionManagerDelegate,
};
use parrot_shared::{
    Activation, CameraCommand, CameraCommandKind, CameraMode, CommandError, DroneCommand,
    DroneCommandKind, GimbalCommand, GimbalCommandKind, GimbalOrientation, Location,
    MissionCommand, VelocityCommand,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logs everything the session reports
struct Observer;

#[async_trait]
impl SessionManagerDelegate for Observer {
    async fn on_opened(&self, session: &DroneSession) {
        info!("[MAIN] Session opened: {} ({:?})", session.id(), session.name());
    }

    async fn on_closed(&self, session: &DroneSession) {
        info!("[MAIN] Session closed: {}", session.id());
    }
}

#[async_trait]
impl DroneSessionDelegate for Observer {
    async fn on_located(&self, session: &DroneSession) {
        info!("[MAIN] Located: {:?}", session.location());
    }

    async fn on_motors_changed(&self, _session: &DroneSession, motors_on: bool) {
        info!("[MAIN] Motors on: {}", motors_on);
    }

    async fn on_command_finished(
        &self,
        _session: &DroneSession,
        command: &MissionCommand,
        error: Option<&CommandError>,
    ) {
        match error {
            Some(error) => warn!("[MAIN] {} failed: {}", command.type_name(), error),
            None => info!("[MAIN] {} done", command.type_name()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = SessionConfig::default();
    let manager = Arc::new(SessionManager::new(config));
    let observer = Arc::new(Observer);
    let manager_delegate: Arc<dyn SessionManagerDelegate> = observer.clone();
    manager.add_delegate(&manager_delegate);

    let (connectivity_tx, connectivity_rx) = watch::channel(Connectivity::default());
    let runner = manager.clone();
    let connectivity_task = tokio::spawn(async move { runner.run(connectivity_rx).await });

    // Connect a simulated drone and remote
    let drone = SimDrone::new("PI040416AA9J000000");
    let remote = SimRemoteControl::new("SKYCONTROLLER-3");
    drone.set_location(Some(Location::new(48.8785, 2.3674)));
    drone.set_battery(87);
    connectivity_tx.send_replace(Connectivity {
        drone: Some(drone.clone() as Arc<dyn Drone>),
        remote_control: Some(remote.clone() as Arc<dyn RemoteControl>),
    });
    sleep(Duration::from_millis(200)).await;

    let session = manager
        .session()
        .ok_or_else(|| anyhow!("no session after connecting"))?;
    let session_delegate: Arc<dyn DroneSessionDelegate> = observer.clone();
    session.add_delegate(&session_delegate);

    // Mission settings and payload setup
    let commands = [
        MissionCommand::Drone(DroneCommand::new(
            "alt",
            DroneCommandKind::MaxAltitude { meters: 120.0 },
        )),
        MissionCommand::Drone(DroneCommand::new(
            "rth",
            DroneCommandKind::ReturnHomeAltitude { meters: 40.0 },
        )),
        MissionCommand::Drone(DroneCommand::new(
            "ocu",
            DroneCommandKind::OcuSyncChannel { channel: 4 },
        )),
        MissionCommand::Camera(CameraCommand::new(
            "mode",
            0,
            CameraCommandKind::Mode(CameraMode::Video),
        )),
        MissionCommand::Camera(CameraCommand::new("rec", 0, CameraCommandKind::StartCapture)),
        MissionCommand::Gimbal(GimbalCommand::new(
            "tilt",
            0,
            GimbalCommandKind::Orientation(GimbalOrientation {
                pitch: Some(-std::f64::consts::FRAC_PI_4),
                ..Default::default()
            }),
        )),
    ];
    for command in commands {
        session.add(command)?;
    }

    // Take off and take control
    let control = session.create_control_session();
    loop {
        match control.activate() {
            Activation::Ready => break,
            Activation::Pending => sleep(Duration::from_millis(500)).await,
            Activation::Failed(reason) => {
                return Err(anyhow!("activation failed: {:?}", reason));
            }
        }
    }
    info!("[MAIN] Control acquired, state: {:?}", session.state().value);

    session.send_velocity_command(Some(VelocityCommand {
        forward: 2.0,
        ..Default::default()
    }));
    sleep(Duration::from_secs(1)).await;
    session.send_velocity_command(None);

    if let Some(reason) = control.disengage_reason() {
        warn!("[MAIN] Disengage: {}", reason);
    }
    control.deactivate();

    if let Err(e) = session.start_landing() {
        warn!("[MAIN] Landing: {}", e);
    }
    sleep(Duration::from_millis(500)).await;

    // Disconnect
    connectivity_tx.send_replace(Connectivity::default());
    drop(connectivity_tx);
    connectivity_task.await?;
    sleep(Duration::from_millis(100)).await;

    info!("[MAIN] Done");
    Ok(())
}
