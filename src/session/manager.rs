//! Session manager for the connected drone

use super::delegate::{
    dispatch_manager_events, Addressed, ManagerDispatch, ManagerEvent, MulticastDelegate,
    SessionManagerDelegate,
};
use super::DroneSession;
use crate::config::SessionConfig;
use crate::vendor::Connectivity;
use parking_lot::RwLock;
use parrot_shared::Message;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Owns at most one drone session and follows the vendor's connectivity
pub struct SessionManager {
    config: SessionConfig,
    session: RwLock<Option<DroneSession>>,
    delegates: MulticastDelegate<dyn SessionManagerDelegate>,
    events: mpsc::UnboundedSender<ManagerDispatch>,
}

impl SessionManager {
    /// Create a session manager and start its event dispatcher
    pub fn new(config: SessionConfig) -> Self {
        let (events, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch_manager_events(event_rx));

        Self {
            config,
            session: RwLock::new(None),
            delegates: MulticastDelegate::new(),
            events,
        }
    }

    fn emit(&self, event: ManagerEvent) {
        let _ = self.events.send(Addressed::all(&self.delegates, event));
    }

    /// React to one connectivity report
    ///
    /// A different drone (or none) closes the current session; a newly
    /// present drone opens one. The remote control handle follows along.
    pub fn handle_connectivity(&self, connectivity: &Connectivity) {
        let mut current = self.session.write();

        let current_uid = current.as_ref().map(|s| s.serial_number());
        let next_uid = connectivity.drone.as_ref().map(|d| d.uid());

        if current_uid != next_uid {
            if let Some(session) = current.take() {
                session.close();
                info!("[MANAGER] session closed for {}", session.serial_number());
                self.emit(ManagerEvent::Closed(session));
            }

            if let Some(drone) = &connectivity.drone {
                let session = DroneSession::open(
                    drone.clone(),
                    connectivity.remote_control.clone(),
                    self.config.clone(),
                );
                info!("[MANAGER] session opened for {}", session.serial_number());
                *current = Some(session.clone());
                self.emit(ManagerEvent::Opened(session));
            }
        }

        if let Some(session) = current.as_ref() {
            let current_rc = session.remote_control().map(|rc| rc.uid());
            let next_rc = connectivity.remote_control.as_ref().map(|rc| rc.uid());
            if current_rc != next_rc {
                session.set_remote_control(connectivity.remote_control.clone());
            }
        }
    }

    /// Follow a connectivity source until its sender is dropped
    pub async fn run(&self, mut connectivity: watch::Receiver<Connectivity>) {
        loop {
            let report = connectivity.borrow_and_update().clone();
            debug!("[MANAGER] connectivity {:?}", report);
            self.handle_connectivity(&report);

            if connectivity.changed().await.is_err() {
                break;
            }
        }
        info!("[MANAGER] connectivity source closed");
    }

    pub fn session(&self) -> Option<DroneSession> {
        self.session.read().clone()
    }

    /// Close the current session, if any
    pub fn close_session(&self) {
        if let Some(session) = self.session.write().take() {
            session.close();
            info!("[MANAGER] session closed for {}", session.serial_number());
            self.emit(ManagerEvent::Closed(session));
        }
    }

    /// Register an observer; it is told about an already open session
    pub fn add_delegate(&self, delegate: &Arc<dyn SessionManagerDelegate>) {
        // Opening and closing announce under the write lock
        let current = self.session.read();
        if !self.delegates.add(delegate) {
            return;
        }
        if let Some(session) = current.as_ref() {
            let replay = Addressed::one(delegate, ManagerEvent::Opened(session.clone()));
            let _ = self.events.send(replay);
        }
    }

    pub fn remove_delegate(&self, delegate: &Arc<dyn SessionManagerDelegate>) {
        self.delegates.remove(delegate);
    }

    /// Status messages of the current session's drone
    pub fn status_messages(&self) -> Option<Vec<Message>> {
        self.session().map(|s| s.state().value.status_messages)
    }
}
