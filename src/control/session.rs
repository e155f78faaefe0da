//! Control session: takeoff and control acquisition
//!
//! Sequences takeoff and flight-controller activation exactly once per
//! control session, then keeps watching for control being taken back by
//! the remote.

use crate::session::DroneSession;
use crate::vendor::{PilotingItfState, PilotingSource};
use parking_lot::Mutex;
use parrot_shared::state_machine::is_valid_transition;
use parrot_shared::{messages, Activation, ActivationState, Message};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

struct ControlInner {
    state: ActivationState,
    attempt_disengage_reason: Option<Message>,
}

struct ControlCore {
    inner: Mutex<ControlInner>,
    session: DroneSession,
}

/// One attempt at taking control of a drone
///
/// Once deactivated it never activates again; create a new one from the
/// drone session instead.
#[derive(Clone)]
pub struct ControlSession {
    core: Arc<ControlCore>,
}

impl ControlSession {
    pub fn new(session: DroneSession) -> Self {
        Self {
            core: Arc::new(ControlCore {
                inner: Mutex::new(ControlInner {
                    state: ActivationState::default(),
                    attempt_disengage_reason: None,
                }),
                session,
            }),
        }
    }

    pub fn state(&self) -> ActivationState {
        self.core.inner.lock().state
    }

    /// Advance activation as far as currently possible
    pub fn activate(&self) -> Activation {
        let session = &self.core.session;
        let mut inner = self.core.inner.lock();

        loop {
            let state = inner.state;
            match state {
                ActivationState::TakeoffStart => {
                    if !session.config().motion_enabled {
                        debug!("[CONTROL] motion disabled, skipping takeoff");
                        transition(&mut inner, ActivationState::FlightControllerActivateComplete);
                        continue;
                    }

                    if session.is_flying() {
                        info!("[CONTROL] already flying, skipping takeoff");
                        transition(&mut inner, ActivationState::FlightControllerActivateStart);
                        continue;
                    }

                    let Some(flight_controller) = session.drone().flight_controller() else {
                        return Activation::Pending;
                    };

                    if !flight_controller.can_take_off() {
                        warn!("[CONTROL] flight controller cannot take off");
                        return self.fail(&mut inner, messages::TAKE_OFF_FAILED);
                    }

                    info!("[CONTROL] attempting takeoff");
                    flight_controller.take_off();
                    transition(&mut inner, ActivationState::TakeoffAttempting);
                    self.schedule_takeoff_check();
                    return Activation::Pending;
                }

                ActivationState::TakeoffAttempting => return Activation::Pending,

                ActivationState::FlightControllerActivateStart => {
                    let Some(flight_controller) = session.drone().flight_controller() else {
                        return Activation::Pending;
                    };

                    if let Some(remote_control) = session.remote_control() {
                        remote_control.set_piloting_source(PilotingSource::Application);
                    }

                    if flight_controller.state() == PilotingItfState::Active
                        || flight_controller.activate()
                    {
                        info!("[CONTROL] flight controller active");
                        transition(&mut inner, ActivationState::FlightControllerActivateComplete);
                        continue;
                    }

                    warn!("[CONTROL] flight controller activation refused");
                    return self.fail(&mut inner, messages::TAKE_CONTROL_FAILED);
                }

                ActivationState::FlightControllerActivateComplete => return Activation::Ready,

                ActivationState::Deactivated => {
                    return Activation::Failed(inner.attempt_disengage_reason.clone())
                }
            }
        }
    }

    /// Hand control back to the remote and stop; a no-op once deactivated
    pub fn deactivate(&self) {
        let mut inner = self.core.inner.lock();
        self.deactivate_locked(&mut inner);
    }

    /// Why this control session stopped or should stop
    ///
    /// After activation completes, losing the active flight controller
    /// reports an override on every query.
    pub fn disengage_reason(&self) -> Option<Message> {
        let inner = self.core.inner.lock();
        if let Some(reason) = &inner.attempt_disengage_reason {
            return Some(reason.clone());
        }

        let session = &self.core.session;
        if inner.state.is_active() && session.config().motion_enabled {
            let active = session
                .drone()
                .flight_controller()
                .map(|fc| fc.state() == PilotingItfState::Active)
                .unwrap_or(false);
            if !active {
                debug!("[CONTROL] control override detected");
                return Some(Message::disengage(messages::CONTROL_OVERRIDE));
            }
        }

        None
    }

    fn fail(&self, inner: &mut ControlInner, key: &str) -> Activation {
        let reason = Message::disengage(key);
        inner.attempt_disengage_reason = Some(reason.clone());
        self.deactivate_locked(inner);
        Activation::Failed(Some(reason))
    }

    fn deactivate_locked(&self, inner: &mut ControlInner) {
        if inner.state.is_terminal() {
            return;
        }
        info!("[CONTROL] deactivating from {:?}", inner.state);

        let session = &self.core.session;
        if let Some(remote_control) = session.remote_control() {
            remote_control.set_piloting_source(PilotingSource::RemoteControl);
        }
        session.send_reset_velocity_command();
        if let Some(flight_controller) = session.drone().flight_controller() {
            flight_controller.deactivate();
        }
        session.send_reset_gimbal_commands();
        session.send_reset_camera_commands();

        transition(inner, ActivationState::Deactivated);
    }

    fn schedule_takeoff_check(&self) {
        let core: Weak<ControlCore> = Arc::downgrade(&self.core);
        let grace = self.core.session.config().takeoff_grace;

        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(core) = core.upgrade() {
                ControlSession { core }.resolve_takeoff();
            }
        });
    }

    fn resolve_takeoff(&self) {
        let mut inner = self.core.inner.lock();
        if inner.state != ActivationState::TakeoffAttempting {
            return;
        }

        if self.core.session.is_flying() {
            info!("[CONTROL] takeoff succeeded");
            transition(&mut inner, ActivationState::FlightControllerActivateStart);
        } else {
            warn!("[CONTROL] takeoff failed");
            inner.attempt_disengage_reason = Some(Message::disengage(messages::TAKE_OFF_FAILED));
            self.deactivate_locked(&mut inner);
        }
    }
}

fn transition(inner: &mut ControlInner, to: ActivationState) {
    if is_valid_transition(inner.state, to) {
        debug!("[CONTROL] {:?} -> {:?}", inner.state, to);
        inner.state = to;
    } else {
        warn!("[CONTROL] rejected transition {:?} -> {:?}", inner.state, to);
    }
}
