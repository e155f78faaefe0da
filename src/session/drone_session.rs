//! Drone session
//!
//! One session per connected drone. The session mirrors every telemetry
//! instrument into a dated snapshot, tracks the first position fix and the
//! last position seen on the ground, and drains the drone, camera and gimbal
//! command queues on a fixed period until it is closed.

use super::delegate::{
    dispatch_session_events, Addressed, DroneSessionDelegate, MulticastDelegate, SessionDispatch,
    SessionEvent,
};
use super::state::{CameraStateSnapshot, DroneStateSnapshot, GimbalStateSnapshot};
use crate::command::handlers::{
    handle_camera_command, handle_drone_command, handle_gimbal_command, HandlerContext,
};
use crate::command::{Command, CommandQueue, Finisher};
use crate::config::SessionConfig;
use crate::control::ControlSession;
use crate::vendor::{Drone, GimbalControlMode, RemoteControl, TelemetryFeeds};
use parking_lot::{Mutex, RwLock};
use parrot_shared::{
    messages, timing, Altimeter, AttitudeIndicator, BatteryInfo, Channel, CommandError, Compass,
    DatedValue, DeviceState, FlyingIndicators, FlyingState, GimbalVelocityCommand, Gps, Location,
    Message, MessageLevel, MissionCommand, Orientation3, Radio, SessionError, Speedometer,
    VelocityCommand,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

type Slot<T> = RwLock<Option<DatedValue<T>>>;

/// Latest value of every telemetry instrument
#[derive(Default)]
struct Telemetry {
    device_state: Slot<DeviceState>,
    flying_indicators: Slot<FlyingIndicators>,
    gps: Slot<Gps>,
    compass: Slot<Compass>,
    altimeter: Slot<Altimeter>,
    speedometer: Slot<Speedometer>,
    attitude: Slot<AttitudeIndicator>,
    battery: Slot<BatteryInfo>,
    radio: Slot<Radio>,
}

fn latest<T: Copy>(slot: &Slot<T>) -> Option<T> {
    slot.read().as_ref().map(|dated| dated.value)
}

pub(crate) struct SessionShared {
    id: RwLock<String>,
    identified: AtomicBool,
    opened: SystemTime,
    context: HandlerContext,
    remote_control: RwLock<Option<Arc<dyn RemoteControl>>>,
    closed: watch::Sender<bool>,
    initialized: AtomicBool,
    located: AtomicBool,
    /// Held while a milestone is announced or an observer is caught up
    milestones: Mutex<()>,
    last_known_ground_location: RwLock<Option<Location>>,
    telemetry: Telemetry,
    drone_commands: Mutex<CommandQueue>,
    camera_commands: Mutex<CommandQueue>,
    gimbal_commands: Mutex<CommandQueue>,
    delegates: MulticastDelegate<dyn DroneSessionDelegate>,
    events: mpsc::UnboundedSender<SessionDispatch>,
}

impl SessionShared {
    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(Addressed::all(&self.delegates, event));
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn is_flying(&self) -> bool {
        latest(&self.telemetry.flying_indicators)
            .map(|indicators| indicators.is_flying())
            .unwrap_or(false)
    }

    fn location(&self) -> Option<Location> {
        latest(&self.telemetry.gps).and_then(|gps| gps.last_known_location)
    }

    fn telemetry_delayed(&self) -> bool {
        self.telemetry
            .gps
            .read()
            .as_ref()
            .map(|gps| gps.age() > self.context.config.telemetry_delay_threshold)
            .unwrap_or(false)
    }

    fn store_flying_indicators(&self, value: DatedValue<FlyingIndicators>) {
        let motors_on = value.value.are_motors_on();
        let previous = self.telemetry.flying_indicators.write().replace(value);
        let motors_were_on = previous
            .map(|dated| dated.value.are_motors_on())
            .unwrap_or(false);

        if motors_were_on != motors_on {
            info!("[SESSION] motors {}", if motors_on { "on" } else { "off" });
            self.emit(SessionEvent::MotorsChanged(motors_on));
        }
    }

    /// One pass of the poll loop
    fn tick(&self) {
        if let Some(location) = self.location() {
            {
                let _milestones = self.milestones.lock();
                if !self.located.swap(true, Ordering::SeqCst) {
                    info!(
                        "[SESSION] located at {:.6}, {:.6}",
                        location.latitude, location.longitude
                    );
                    self.emit(SessionEvent::Located);
                }
            }

            if !self.is_flying() {
                *self.last_known_ground_location.write() = Some(location);
            }
        }

        self.drone_commands.lock().process();
        self.camera_commands.lock().process();
        self.gimbal_commands.lock().process();
    }
}

/// Handle to an open drone session
///
/// Cheap to clone; every clone refers to the same session.
#[derive(Clone)]
pub struct DroneSession {
    shared: Arc<SessionShared>,
}

impl std::fmt::Debug for DroneSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DroneSession")
            .field("id", &self.id())
            .field("serial_number", &self.serial_number())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl DroneSession {
    /// Open a session for a connected drone and start its background tasks
    pub fn open(
        drone: Arc<dyn Drone>,
        remote_control: Option<Arc<dyn RemoteControl>>,
        config: SessionConfig,
    ) -> Self {
        let (closed, _) = watch::channel(false);
        let (events, event_rx) = mpsc::unbounded_channel();
        let feeds = drone.telemetry();
        let poll_interval = config.poll_interval;

        let shared = Arc::new(SessionShared {
            id: RwLock::new(Uuid::new_v4().to_string()),
            identified: AtomicBool::new(false),
            opened: SystemTime::now(),
            context: HandlerContext::new(drone, config),
            remote_control: RwLock::new(remote_control),
            closed,
            initialized: AtomicBool::new(false),
            located: AtomicBool::new(false),
            milestones: Mutex::new(()),
            last_known_ground_location: RwLock::new(None),
            telemetry: Telemetry::default(),
            drone_commands: Mutex::new(CommandQueue::new("drone")),
            camera_commands: Mutex::new(CommandQueue::new("camera")),
            gimbal_commands: Mutex::new(CommandQueue::new("gimbal")),
            delegates: MulticastDelegate::new(),
            events,
        });
        let weak = Arc::downgrade(&shared);

        tokio::spawn(dispatch_session_events(weak.clone(), event_rx));
        spawn_telemetry_listeners(&weak, feeds, &shared.closed);
        tokio::spawn(poll_loop(weak, shared.closed.subscribe(), poll_interval));

        let session = Self { shared };
        info!(
            "[SESSION] opened {} for {}",
            session.id(),
            session.serial_number()
        );

        session.shared.initialized.store(true, Ordering::SeqCst);
        session.shared.emit(SessionEvent::Initialized);
        session
    }

    pub(crate) fn from_shared(shared: Arc<SessionShared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> String {
        self.shared.id.read().clone()
    }

    /// Replace the generated session id; only the first call takes effect
    pub fn identify(&self, id: impl Into<String>) -> bool {
        if self.shared.identified.swap(true, Ordering::SeqCst) {
            warn!("[SESSION] {} already identified", self.id());
            return false;
        }
        *self.shared.id.write() = id.into();
        true
    }

    pub fn manufacturer(&self) -> &'static str {
        "Parrot"
    }

    pub fn serial_number(&self) -> String {
        self.shared.context.drone.uid()
    }

    pub fn name(&self) -> Option<String> {
        self.shared.context.drone.name()
    }

    pub fn model(&self) -> Option<String> {
        self.shared.context.drone.model()
    }

    pub fn opened(&self) -> SystemTime {
        self.shared.opened
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::SeqCst)
    }

    pub fn is_located(&self) -> bool {
        self.shared.located.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    pub fn is_flying(&self) -> bool {
        self.shared.is_flying()
    }

    pub fn drone(&self) -> Arc<dyn Drone> {
        self.shared.context.drone.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.context.config
    }

    pub fn remote_control(&self) -> Option<Arc<dyn RemoteControl>> {
        self.shared.remote_control.read().clone()
    }

    pub fn set_remote_control(&self, remote_control: Option<Arc<dyn RemoteControl>>) {
        debug!(
            "[SESSION] remote control -> {:?}",
            remote_control.as_ref().map(|rc| rc.uid())
        );
        *self.shared.remote_control.write() = remote_control;
    }

    pub fn location(&self) -> Option<Location> {
        self.shared.location()
    }

    pub fn last_known_ground_location(&self) -> Option<Location> {
        *self.shared.last_known_ground_location.read()
    }

    pub fn gps(&self) -> Option<DatedValue<Gps>> {
        self.shared.telemetry.gps.read().clone()
    }

    pub fn flying_indicators(&self) -> Option<DatedValue<FlyingIndicators>> {
        self.shared.telemetry.flying_indicators.read().clone()
    }

    pub fn device_state(&self) -> Option<DatedValue<DeviceState>> {
        self.shared.telemetry.device_state.read().clone()
    }

    pub fn add_delegate(&self, delegate: &Arc<dyn DroneSessionDelegate>) {
        let _milestones = self.shared.milestones.lock();
        if !self.shared.delegates.add(delegate) {
            return;
        }

        // Catch the new observer up on what was announced before it joined
        if self.is_initialized() {
            let _ = self
                .shared
                .events
                .send(Addressed::one(delegate, SessionEvent::Initialized));
        }
        if self.is_located() {
            let _ = self
                .shared
                .events
                .send(Addressed::one(delegate, SessionEvent::Located));
        }
    }

    pub fn remove_delegate(&self, delegate: &Arc<dyn DroneSessionDelegate>) {
        self.shared.delegates.remove(delegate);
    }

    /// Queue a mission command on the drone, camera or gimbal queue
    pub fn add(&self, command: MissionCommand) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::closed());
        }

        match &command {
            MissionCommand::Drone(drone_command) => {
                let drone_command = drone_command.clone();
                let queued = self.queued(command.clone(), move |ctx, finisher| {
                    handle_drone_command(ctx, &drone_command, finisher)
                });
                self.shared.drone_commands.lock().add(0, queued)
            }
            MissionCommand::Camera(camera_command) => {
                let channel = camera_command.channel;
                let camera_command = camera_command.clone();
                let queued = self.queued(command.clone(), move |ctx, finisher| {
                    handle_camera_command(ctx, &camera_command, finisher)
                });
                self.shared.camera_commands.lock().add(channel, queued)
            }
            MissionCommand::Gimbal(gimbal_command) => {
                let channel = gimbal_command.channel;
                let gimbal_command = gimbal_command.clone();
                let queued = self.queued(command.clone(), move |ctx, finisher| {
                    handle_gimbal_command(ctx, &gimbal_command, finisher)
                });
                self.shared.gimbal_commands.lock().add(channel, queued)
            }
            MissionCommand::Other { id, type_name } => {
                warn!("[SESSION] unhandled command {} ({})", type_name, id);
                Err(SessionError::command_type_unhandled())
            }
        }
    }

    fn queued<H>(&self, command: MissionCommand, handler: H) -> Command
    where
        H: Fn(&HandlerContext, Finisher) -> Result<(), CommandError> + Send + 'static,
    {
        let executing = Arc::downgrade(&self.shared);
        let finishing = executing.clone();
        let executed = command.clone();
        let finished = command.clone();

        Command::new(
            command.id(),
            command.type_name(),
            move |finisher| {
                let shared = executing.upgrade().ok_or_else(CommandError::abandoned)?;
                info!(
                    "[SESSION] command executed: {} ({})",
                    executed.type_name(),
                    executed.id()
                );
                shared.emit(SessionEvent::CommandExecuted(executed.clone()));
                handler(&shared.context, finisher)
            },
            move |error| {
                match &error {
                    Some(error) => warn!(
                        "[SESSION] command finished: {} ({}): {}",
                        finished.type_name(),
                        finished.id(),
                        error
                    ),
                    None => info!(
                        "[SESSION] command finished: {} ({})",
                        finished.type_name(),
                        finished.id()
                    ),
                }
                if let Some(shared) = finishing.upgrade() {
                    shared.emit(SessionEvent::CommandFinished(finished, error));
                }
            },
        )
        .with_config(command.config())
    }

    /// Drop every pending and in-flight command
    pub fn remove_commands(&self) {
        self.shared.drone_commands.lock().remove_all();
        self.shared.camera_commands.lock().remove_all();
        self.shared.gimbal_commands.lock().remove_all();
    }

    pub fn create_control_session(&self) -> ControlSession {
        ControlSession::new(self.clone())
    }

    /// Why automated control should stop, if it should
    pub fn disengage_reason(&self) -> Option<Message> {
        if self.shared.context.drone.flight_controller().is_none() {
            return Some(Message::disengage(messages::DRONE_CONTROL_UNAVAILABLE));
        }

        if self.shared.telemetry.gps.read().is_none() {
            return Some(Message::disengage(messages::TELEMETRY_UNAVAILABLE));
        }

        if self.shared.telemetry_delayed() {
            return Some(Message::disengage(messages::TELEMETRY_DELAYED));
        }

        None
    }

    /// Drone state, dated by the last device state push
    pub fn state(&self) -> DatedValue<DroneStateSnapshot> {
        let shared = &self.shared;
        let telemetry = &shared.telemetry;
        let date = telemetry
            .device_state
            .read()
            .as_ref()
            .map(|dated| dated.date)
            .unwrap_or_else(Instant::now);

        let indicators = latest(&telemetry.flying_indicators);
        let flying = indicators.map(|i| i.is_flying()).unwrap_or(false);
        let location = shared.location();
        let home_location = shared
            .context
            .drone
            .return_home_controller()
            .and_then(|rth| rth.home_location());
        let last_known_ground_location = *shared.last_known_ground_location.read();
        let takeoff_location = if flying {
            last_known_ground_location.or(home_location)
        } else {
            location
        };

        let speedometer = latest(&telemetry.speedometer);
        let heading = latest(&telemetry.compass)
            .map(|compass| compass.heading.to_radians())
            .unwrap_or(0.0);
        let orientation = latest(&telemetry.attitude)
            .map(|attitude| attitude.orientation())
            .unwrap_or_default();
        let battery = latest(&telemetry.battery);
        let radio = latest(&telemetry.radio);

        let snapshot = DroneStateSnapshot {
            flying,
            motors_on: indicators.map(|i| i.are_motors_on()).unwrap_or(false),
            location,
            home_location,
            last_known_ground_location,
            takeoff_location,
            course: speedometer.map(|s| s.course()).unwrap_or(0.0),
            horizontal_speed: speedometer.map(|s| s.ground_speed).unwrap_or(0.0),
            vertical_speed: speedometer.map(|s| s.vertical_speed()).unwrap_or(0.0),
            altitude: latest(&telemetry.altimeter)
                .and_then(|a| a.takeoff_relative_altitude)
                .unwrap_or(0.0),
            orientation: Orientation3 {
                z: heading,
                ..orientation
            },
            battery_percent: battery.map(|b| b.battery_level),
            signal_quality: radio.and_then(|r| r.link_signal_quality),
            status_messages: self.status_messages(indicators, battery, radio),
        };

        DatedValue::with_date(snapshot, date)
    }

    fn status_messages(
        &self,
        indicators: Option<FlyingIndicators>,
        battery: Option<BatteryInfo>,
        radio: Option<Radio>,
    ) -> Vec<Message> {
        let mut status = Vec::new();

        if indicators.map(|i| i.state) == Some(FlyingState::Emergency) {
            status.push(Message::localized(messages::STATUS_EMERGENCY, MessageLevel::Error));
        }

        if let Some(battery) = battery {
            if battery.battery_level < timing::BATTERY_LOW_PERCENT {
                status.push(
                    Message::localized(messages::STATUS_BATTERY_LOW, MessageLevel::Warning)
                        .with_details(format!("{}%", battery.battery_level)),
                );
            }
        }

        if let Some(quality) = radio.and_then(|r| r.link_signal_quality) {
            if quality <= timing::SIGNAL_WEAK_QUALITY {
                status.push(Message::localized(
                    messages::STATUS_SIGNAL_WEAK,
                    MessageLevel::Warning,
                ));
            }
        }

        if self.shared.telemetry_delayed() {
            status.push(Message::localized(
                messages::TELEMETRY_DELAYED,
                MessageLevel::Warning,
            ));
        }

        status
    }

    pub fn camera_state(&self, channel: Channel) -> Option<DatedValue<CameraStateSnapshot>> {
        let camera = self.shared.context.drone.camera(channel)?;
        Some(DatedValue::new(CameraStateSnapshot::from_camera(
            channel,
            camera.as_ref(),
        )))
    }

    pub fn gimbal_state(&self, channel: Channel) -> Option<DatedValue<GimbalStateSnapshot>> {
        let gimbal = self.shared.context.drone.gimbal(channel)?;
        Some(DatedValue::new(GimbalStateSnapshot::from_gimbal(
            channel,
            gimbal.as_ref(),
        )))
    }

    /// Drive the drone directly; `None` hovers
    ///
    /// Velocities are scaled against the configured maxima into the
    /// flight controller's percentage set-points. An absolute heading has
    /// no vendor equivalent, so the yaw set-point is left untouched then.
    pub fn send_velocity_command(&self, command: Option<VelocityCommand>) {
        let Some(command) = command else {
            self.send_reset_velocity_command();
            return;
        };
        let Some(flight_controller) = self.shared.context.drone.flight_controller() else {
            return;
        };
        let config = self.config();

        flight_controller.set_pitch(percent(command.forward, config.max_velocity_horizontal));
        flight_controller.set_roll(percent(command.right, config.max_velocity_horizontal));
        flight_controller
            .set_vertical_speed(percent(command.vertical, config.max_velocity_vertical));
        if command.heading.is_none() {
            flight_controller.set_yaw_rotation_speed(percent(
                command.rotational.to_degrees(),
                config.max_yaw_rate,
            ));
        }
    }

    pub fn send_reset_velocity_command(&self) {
        if let Some(flight_controller) = self.shared.context.drone.flight_controller() {
            flight_controller.hover();
        }
    }

    /// Drive a gimbal at an angular velocity (rad/s)
    pub fn send_gimbal_velocity_command(
        &self,
        channel: Channel,
        command: GimbalVelocityCommand,
    ) -> Result<(), CommandError> {
        let gimbal = self
            .shared
            .context
            .drone
            .gimbal(channel)
            .ok_or_else(|| CommandError::unavailable(messages::GIMBAL_UNAVAILABLE))?;

        gimbal.control(
            GimbalControlMode::Velocity,
            Some(command.velocity.z.to_degrees()),
            Some(command.velocity.x.to_degrees()),
            Some(command.velocity.y.to_degrees()),
        );
        Ok(())
    }

    /// Level every gimbal to the configured reset pitch
    pub fn send_reset_gimbal_commands(&self) {
        let pitch = self.config().reset_gimbal_pitch;
        for gimbal in self.shared.context.drone.gimbals() {
            gimbal.control(GimbalControlMode::Position, Some(0.0), Some(pitch), Some(0.0));
        }
    }

    /// Stop any capture in progress on every camera
    pub fn send_reset_camera_commands(&self) {
        for camera in self.shared.context.drone.cameras() {
            if camera.is_capturing_photo_interval() && camera.can_stop_photo_capture() {
                camera.stop_photo_capture();
            } else if camera.is_capturing_video() && camera.can_stop_recording() {
                camera.stop_recording();
            }
        }
    }

    pub fn start_go_home(&self) -> Result<(), CommandError> {
        let return_home = self
            .shared
            .context
            .drone
            .return_home_controller()
            .ok_or_else(|| CommandError::unavailable(messages::GO_HOME_UNAVAILABLE))?;

        if !return_home.activate() {
            return Err(CommandError::failed(messages::GO_HOME_FAILED));
        }
        info!("[SESSION] returning home");
        Ok(())
    }

    pub fn start_landing(&self) -> Result<(), CommandError> {
        let flight_controller = self
            .shared
            .context
            .drone
            .flight_controller()
            .ok_or_else(|| CommandError::unavailable(messages::LANDING_UNAVAILABLE))?;

        flight_controller.land();
        info!("[SESSION] landing");
        Ok(())
    }

    /// Stop polling and drop queued commands; in-flight vendor work is not
    /// cancelled
    pub fn close(&self) {
        if self.shared.closed.send_replace(true) {
            return;
        }
        self.remove_commands();
        info!("[SESSION] closed {}", self.id());
    }
}

/// Scale a value against its maximum into a clamped percentage
fn percent(value: f64, max: f64) -> i32 {
    if max <= 0.0 {
        return 0;
    }
    (value / max * 100.0).round().clamp(-100.0, 100.0) as i32
}

fn spawn_telemetry_listeners(
    session: &Weak<SessionShared>,
    feeds: TelemetryFeeds,
    closed: &watch::Sender<bool>,
) {
    listen(session, feeds.device_state, closed, |s, v| {
        *s.telemetry.device_state.write() = Some(v)
    });
    listen(session, feeds.flying_indicators, closed, |s, v| {
        s.store_flying_indicators(v)
    });
    listen(session, feeds.gps, closed, |s, v| *s.telemetry.gps.write() = Some(v));
    listen(session, feeds.compass, closed, |s, v| {
        *s.telemetry.compass.write() = Some(v)
    });
    listen(session, feeds.altimeter, closed, |s, v| {
        *s.telemetry.altimeter.write() = Some(v)
    });
    listen(session, feeds.speedometer, closed, |s, v| {
        *s.telemetry.speedometer.write() = Some(v)
    });
    listen(session, feeds.attitude, closed, |s, v| {
        *s.telemetry.attitude.write() = Some(v)
    });
    listen(session, feeds.battery, closed, |s, v| {
        *s.telemetry.battery.write() = Some(v)
    });
    listen(session, feeds.radio, closed, |s, v| *s.telemetry.radio.write() = Some(v));
}

/// Mirror one instrument into the session until it closes
///
/// An unavailable instrument (`None`) leaves the previous value in place.
fn listen<T, F>(
    session: &Weak<SessionShared>,
    mut feed: watch::Receiver<Option<T>>,
    closed: &watch::Sender<bool>,
    store: F,
) where
    T: Clone + Send + Sync + 'static,
    F: Fn(&SessionShared, DatedValue<T>) + Send + 'static,
{
    let session = session.clone();
    let mut closed = closed.subscribe();

    tokio::spawn(async move {
        loop {
            if *closed.borrow() {
                break;
            }

            let value = feed.borrow_and_update().clone();
            if let Some(value) = value {
                let Some(shared) = session.upgrade() else {
                    break;
                };
                store(&shared, DatedValue::new(value));
            }

            tokio::select! {
                changed = feed.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = closed.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

async fn poll_loop(
    session: Weak<SessionShared>,
    mut closed: watch::Receiver<bool>,
    period: Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = closed.changed() => {}
        }

        let Some(shared) = session.upgrade() else {
            break;
        };
        if shared.is_closed() {
            break;
        }
        shared.tick();
    }

    debug!("[SESSION] poll loop stopped");
}
