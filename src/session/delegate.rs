//! Observer registries and event delivery
//!
//! Observers are held weakly; a dropped observer simply stops receiving
//! events. Events are queued to a dispatcher task so the poll loop never
//! waits on an observer.

use super::DroneSession;
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use parrot_shared::{CommandError, MissionCommand};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// A set of non-owning observer handles
pub struct MulticastDelegate<T: ?Sized> {
    delegates: Mutex<Vec<Weak<T>>>,
}

impl<T: ?Sized> Default for MulticastDelegate<T> {
    fn default() -> Self {
        Self {
            delegates: Mutex::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> MulticastDelegate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; registering the same one twice is a no-op
    ///
    /// Returns whether the observer was newly added.
    pub fn add(&self, delegate: &Arc<T>) -> bool {
        let mut delegates = self.delegates.lock();
        delegates.retain(|d| d.strong_count() > 0);
        if delegates.iter().any(|d| same(d, delegate)) {
            return false;
        }
        delegates.push(Arc::downgrade(delegate));
        true
    }

    pub fn remove(&self, delegate: &Arc<T>) {
        self.delegates
            .lock()
            .retain(|d| d.strong_count() > 0 && !same(d, delegate));
    }

    /// Live observers at this instant
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.delegates.lock().iter().filter_map(Weak::upgrade).collect()
    }

    /// Handles to the live observers at this instant
    pub(crate) fn recipients(&self) -> Vec<Weak<T>> {
        self.delegates
            .lock()
            .iter()
            .filter(|d| d.strong_count() > 0)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.delegates
            .lock()
            .iter()
            .filter(|d| d.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn same<T: ?Sized>(weak: &Weak<T>, strong: &Arc<T>) -> bool {
    Weak::as_ptr(weak) as *const () == Arc::as_ptr(strong) as *const ()
}

/// Observer of one drone session
#[async_trait]
pub trait DroneSessionDelegate: Send + Sync {
    async fn on_initialized(&self, _session: &DroneSession) {}

    /// First position fix of the session
    async fn on_located(&self, _session: &DroneSession) {}

    async fn on_motors_changed(&self, _session: &DroneSession, _motors_on: bool) {}

    async fn on_command_executed(&self, _session: &DroneSession, _command: &MissionCommand) {}

    async fn on_command_finished(
        &self,
        _session: &DroneSession,
        _command: &MissionCommand,
        _error: Option<&CommandError>,
    ) {
    }
}

/// Observer of the session manager
#[async_trait]
pub trait SessionManagerDelegate: Send + Sync {
    async fn on_opened(&self, _session: &DroneSession) {}

    async fn on_closed(&self, _session: &DroneSession) {}
}

/// An event and the observers registered when it was raised
pub(crate) struct Addressed<E, T: ?Sized> {
    pub recipients: Vec<Weak<T>>,
    pub event: E,
}

impl<E, T: ?Sized> Addressed<E, T> {
    /// Address every observer currently in the registry
    pub fn all(delegates: &MulticastDelegate<T>, event: E) -> Self {
        Self {
            recipients: delegates.recipients(),
            event,
        }
    }

    /// Address a single observer
    pub fn one(delegate: &Arc<T>, event: E) -> Self {
        Self {
            recipients: vec![Arc::downgrade(delegate)],
            event,
        }
    }

    fn live(&self) -> Vec<Arc<T>> {
        self.recipients.iter().filter_map(Weak::upgrade).collect()
    }
}

pub(crate) enum SessionEvent {
    Initialized,
    Located,
    MotorsChanged(bool),
    CommandExecuted(MissionCommand),
    CommandFinished(MissionCommand, Option<CommandError>),
}

pub(crate) type SessionDispatch = Addressed<SessionEvent, dyn DroneSessionDelegate>;

/// Deliver session events in order until the session is gone
pub(crate) async fn dispatch_session_events(
    shared: Weak<super::drone_session::SessionShared>,
    mut events: mpsc::UnboundedReceiver<SessionDispatch>,
) {
    while let Some(dispatch) = events.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        let session = DroneSession::from_shared(shared);

        let observers = dispatch.live();
        join_all(
            observers
                .iter()
                .map(|d| deliver(d.as_ref(), &session, &dispatch.event)),
        )
        .await;
    }
}

async fn deliver(
    delegate: &dyn DroneSessionDelegate,
    session: &DroneSession,
    event: &SessionEvent,
) {
    match event {
        SessionEvent::Initialized => delegate.on_initialized(session).await,
        SessionEvent::Located => delegate.on_located(session).await,
        SessionEvent::MotorsChanged(on) => delegate.on_motors_changed(session, *on).await,
        SessionEvent::CommandExecuted(command) => {
            delegate.on_command_executed(session, command).await
        }
        SessionEvent::CommandFinished(command, error) => {
            delegate
                .on_command_finished(session, command, error.as_ref())
                .await
        }
    }
}

pub(crate) enum ManagerEvent {
    Opened(DroneSession),
    Closed(DroneSession),
}

pub(crate) type ManagerDispatch = Addressed<ManagerEvent, dyn SessionManagerDelegate>;

/// Deliver manager events in order until the manager is dropped
pub(crate) async fn dispatch_manager_events(
    mut events: mpsc::UnboundedReceiver<ManagerDispatch>,
) {
    while let Some(dispatch) = events.recv().await {
        let observers = dispatch.live();
        match &dispatch.event {
            ManagerEvent::Opened(session) => {
                join_all(observers.iter().map(|d| d.on_opened(session))).await;
            }
            ManagerEvent::Closed(session) => {
                join_all(observers.iter().map(|d| d.on_closed(session))).await;
            }
        }
    }
}
