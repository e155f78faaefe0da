//! Per-channel command queue
//!
//! Commands for one control surface run strictly one at a time, in the
//! order they were added. Channels are independent of each other.

use super::timeout::{RetryDecision, RetryPolicy};
use parrot_shared::{Channel, CommandConfig, CommandError, SessionError};
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Completion handle handed to a command's execute step
///
/// Reporting through a handle whose attempt was abandoned (queue cleared,
/// attempt timed out) is a no-op.
#[derive(Debug)]
pub struct Finisher {
    tx: oneshot::Sender<Option<CommandError>>,
}

impl Finisher {
    /// Create a handle and the receiver its result arrives on
    pub fn channel() -> (Self, oneshot::Receiver<Option<CommandError>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn finish(self, error: Option<CommandError>) {
        let _ = self.tx.send(error);
    }

    pub fn succeed(self) {
        self.finish(None);
    }

    pub fn fail(self, error: CommandError) {
        self.finish(Some(error));
    }

    /// Nobody is waiting for this result any more
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

type ExecuteFn = Box<dyn FnMut(Finisher) -> Result<(), CommandError> + Send>;
type FinishedFn = Box<dyn FnOnce(Option<CommandError>) + Send>;

/// A queued unit of work
///
/// `execute` either refuses synchronously (`Err`, the command never
/// started) or takes ownership of the [`Finisher`] and reports later.
/// `finished` runs exactly once with the outcome.
pub struct Command {
    pub id: String,
    pub name: String,
    pub config: CommandConfig,
    execute: ExecuteFn,
    finished: FinishedFn,
}

impl Command {
    pub fn new<E, F>(
        id: impl Into<String>,
        name: impl Into<String>,
        execute: E,
        finished: F,
    ) -> Self
    where
        E: FnMut(Finisher) -> Result<(), CommandError> + Send + 'static,
        F: FnOnce(Option<CommandError>) + Send + 'static,
    {
        Self {
            id: id.into(),
            name: name.into(),
            config: CommandConfig::default(),
            execute: Box::new(execute),
            finished: Box::new(finished),
        }
    }

    pub fn with_config(mut self, config: CommandConfig) -> Self {
        self.config = config;
        self
    }

    fn complete(self, error: Option<CommandError>) {
        (self.finished)(error);
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("config", &self.config)
            .finish()
    }
}

struct InFlight {
    command: Command,
    completion: oneshot::Receiver<Option<CommandError>>,
    started_at: Instant,
    attempt: u32,
}

#[derive(Default)]
struct ChannelQueue {
    pending: VecDeque<Command>,
    in_flight: Option<InFlight>,
}

impl ChannelQueue {
    fn process(&mut self, label: &str, channel: Channel, now: Instant) {
        if let Some(mut in_flight) = self.in_flight.take() {
            match in_flight.completion.try_recv() {
                Ok(error) => {
                    debug!(
                        "[QUEUE] {}[{}] finished {} ({}): {:?}",
                        label, channel, in_flight.command.name, in_flight.command.id, error
                    );
                    in_flight.command.complete(error);
                }
                Err(TryRecvError::Closed) => {
                    warn!(
                        "[QUEUE] {}[{}] {} ({}) dropped its completion handle",
                        label, channel, in_flight.command.name, in_flight.command.id
                    );
                    in_flight.command.complete(Some(CommandError::abandoned()));
                }
                Err(TryRecvError::Empty) => {
                    let policy = RetryPolicy::from(&in_flight.command.config);
                    match policy.evaluate(in_flight.started_at, in_flight.attempt, now) {
                        RetryDecision::Wait => self.in_flight = Some(in_flight),
                        RetryDecision::Retry => {
                            let attempt = in_flight.attempt + 1;
                            warn!(
                                "[QUEUE] {}[{}] {} ({}) timed out, retrying ({}/{})",
                                label,
                                channel,
                                in_flight.command.name,
                                in_flight.command.id,
                                attempt,
                                in_flight.command.config.retries
                            );
                            self.start(label, channel, in_flight.command, attempt, now);
                        }
                        RetryDecision::GiveUp => {
                            warn!(
                                "[QUEUE] {}[{}] {} ({}) timed out after {} attempts",
                                label,
                                channel,
                                in_flight.command.name,
                                in_flight.command.id,
                                in_flight.attempt + 1
                            );
                            in_flight.command.complete(Some(CommandError::timed_out()));
                        }
                    }
                }
            }
            return;
        }

        if let Some(command) = self.pending.pop_front() {
            self.start(label, channel, command, 0, now);
        }
    }

    fn start(
        &mut self,
        label: &str,
        channel: Channel,
        mut command: Command,
        attempt: u32,
        now: Instant,
    ) {
        let (finisher, completion) = Finisher::channel();
        debug!(
            "[QUEUE] {}[{}] executing {} ({})",
            label, channel, command.name, command.id
        );

        match (command.execute)(finisher) {
            Ok(()) => {
                self.in_flight = Some(InFlight {
                    command,
                    completion,
                    started_at: now,
                    attempt,
                });
            }
            Err(error) => {
                debug!(
                    "[QUEUE] {}[{}] {} ({}) refused: {}",
                    label, channel, command.name, command.id, error
                );
                command.complete(Some(error));
            }
        }
    }
}

/// FIFO command queues keyed by channel
///
/// Single-surface queues use channel 0.
pub struct CommandQueue {
    label: &'static str,
    channels: BTreeMap<Channel, ChannelQueue>,
}

impl CommandQueue {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            channels: BTreeMap::new(),
        }
    }

    /// Append a command to the tail of a channel
    pub fn add(&mut self, channel: Channel, command: Command) -> Result<(), SessionError> {
        command.config.validate()?;
        self.channels
            .entry(channel)
            .or_default()
            .pending
            .push_back(command);
        Ok(())
    }

    /// Advance every channel by one step
    pub fn process(&mut self) {
        self.process_at(Instant::now());
    }

    pub fn process_at(&mut self, now: Instant) {
        for (channel, queue) in self.channels.iter_mut() {
            queue.process(self.label, *channel, now);
        }
    }

    /// Forget every pending and in-flight command without finishing them
    pub fn remove_all(&mut self) {
        let dropped: usize = self
            .channels
            .values()
            .map(|q| q.pending.len() + usize::from(q.in_flight.is_some()))
            .sum();
        if dropped > 0 {
            debug!("[QUEUE] {} removed {} commands", self.label, dropped);
        }
        self.channels.clear();
    }

    /// Commands waiting to start, across channels
    pub fn pending_count(&self) -> usize {
        self.channels.values().map(|q| q.pending.len()).sum()
    }

    pub fn is_executing(&self, channel: Channel) -> bool {
        self.channels
            .get(&channel)
            .map(|q| q.in_flight.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;
    type Finishers = Arc<Mutex<Vec<(String, Finisher)>>>;

    /// A command that parks its finisher for the test to complete
    fn parked(name: &str, log: &Log, finishers: &Finishers) -> Command {
        let exec_log = log.clone();
        let done_log = log.clone();
        let parked = finishers.clone();
        let exec_name = name.to_string();
        let done_name = name.to_string();
        Command::new(
            name,
            name,
            move |finisher| {
                exec_log.lock().push(format!("execute {}", exec_name));
                parked.lock().push((exec_name.clone(), finisher));
                Ok(())
            },
            move |error| {
                done_log
                    .lock()
                    .push(format!("finished {} {:?}", done_name, error.is_some()));
            },
        )
    }

    fn complete(finishers: &Finishers, name: &str) {
        let mut parked = finishers.lock();
        let index = parked.iter().position(|(n, _)| n == name).unwrap();
        let (_, finisher) = parked.remove(index);
        finisher.succeed();
    }

    #[test]
    fn test_fifo_one_in_flight() {
        let log: Log = Default::default();
        let finishers: Finishers = Default::default();
        let mut queue = CommandQueue::new("drone");

        for name in ["A", "B", "C"] {
            queue.add(0, parked(name, &log, &finishers)).unwrap();
        }

        // A runs for three ticks
        queue.process();
        queue.process();
        queue.process();
        assert_eq!(*log.lock(), vec!["execute A"]);
        assert!(queue.is_executing(0));
        assert_eq!(queue.pending_count(), 2);

        complete(&finishers, "A");
        queue.process();
        assert_eq!(*log.lock(), vec!["execute A", "finished A false"]);

        queue.process();
        complete(&finishers, "B");
        queue.process();
        queue.process();
        complete(&finishers, "C");
        queue.process();

        assert_eq!(
            *log.lock(),
            vec![
                "execute A",
                "finished A false",
                "execute B",
                "finished B false",
                "execute C",
                "finished C false",
            ]
        );
    }

    #[test]
    fn test_channels_are_independent() {
        let log: Log = Default::default();
        let finishers: Finishers = Default::default();
        let mut queue = CommandQueue::new("camera");

        queue.add(0, parked("main", &log, &finishers)).unwrap();
        queue.add(1, parked("thermal", &log, &finishers)).unwrap();
        queue.process();

        assert!(queue.is_executing(0));
        assert!(queue.is_executing(1));
        assert_eq!(*log.lock(), vec!["execute main", "execute thermal"]);
    }

    #[test]
    fn test_synchronous_refusal_finishes_immediately() {
        let outcome: Arc<Mutex<Option<Option<CommandError>>>> = Default::default();
        let seen = outcome.clone();
        let mut queue = CommandQueue::new("drone");

        queue
            .add(
                0,
                Command::new(
                    "x",
                    "unsupported",
                    |_finisher| Err(CommandError::unsupported()),
                    move |error| *seen.lock() = Some(error),
                ),
            )
            .unwrap();
        queue.process();

        assert_eq!(*outcome.lock(), Some(Some(CommandError::unsupported())));
        assert!(!queue.is_executing(0));
    }

    #[test]
    fn test_next_command_waits_a_tick_after_refusal() {
        let log: Log = Default::default();
        let finishers: Finishers = Default::default();
        let mut queue = CommandQueue::new("drone");

        queue
            .add(
                0,
                Command::new("r", "r", |_f| Err(CommandError::unhandled()), |_e| {}),
            )
            .unwrap();
        queue.add(0, parked("B", &log, &finishers)).unwrap();

        queue.process();
        assert!(log.lock().is_empty());
        queue.process();
        assert_eq!(*log.lock(), vec!["execute B"]);
    }

    #[test]
    fn test_dropped_finisher_is_abandoned() {
        let outcome: Arc<Mutex<Option<Option<CommandError>>>> = Default::default();
        let seen = outcome.clone();
        let mut queue = CommandQueue::new("gimbal");

        queue
            .add(
                0,
                Command::new(
                    "d",
                    "drop",
                    |finisher| {
                        drop(finisher);
                        Ok(())
                    },
                    move |error| *seen.lock() = Some(error),
                ),
            )
            .unwrap();
        queue.process();
        queue.process();

        assert_eq!(*outcome.lock(), Some(Some(CommandError::abandoned())));
    }

    #[test]
    fn test_invalid_config_rejected_at_add() {
        let mut queue = CommandQueue::new("drone");
        let command = Command::new("bad", "bad", |_f| Ok(()), |_e| {})
            .with_config(CommandConfig::with_timeout(Duration::ZERO, 0));

        assert!(matches!(
            queue.add(0, command),
            Err(SessionError::InvalidConfiguration { .. })
        ));
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_timeout_retries_then_gives_up() {
        let executions = Arc::new(Mutex::new(0u32));
        let counter = executions.clone();
        let outcome: Arc<Mutex<Option<Option<CommandError>>>> = Default::default();
        let seen = outcome.clone();
        let parked: Finishers = Default::default();
        let park = parked.clone();
        let mut queue = CommandQueue::new("drone");

        let command = Command::new(
            "slow",
            "slow",
            move |finisher| {
                *counter.lock() += 1;
                park.lock().push(("slow".into(), finisher));
                Ok(())
            },
            move |error| *seen.lock() = Some(error),
        )
        .with_config(CommandConfig::with_timeout(Duration::from_secs(1), 1));
        queue.add(0, command).unwrap();

        let start = Instant::now();
        queue.process_at(start);
        assert_eq!(*executions.lock(), 1);

        queue.process_at(start + Duration::from_millis(500));
        assert_eq!(*executions.lock(), 1);

        // First attempt times out and is executed again
        queue.process_at(start + Duration::from_secs(1));
        assert_eq!(*executions.lock(), 2);

        // Completing the stale attempt does nothing
        let (_, stale) = parked.lock().remove(0);
        assert!(stale.is_abandoned());
        stale.succeed();
        queue.process_at(start + Duration::from_millis(1500));
        assert!(outcome.lock().is_none());

        queue.process_at(start + Duration::from_secs(2));
        assert_eq!(*outcome.lock(), Some(Some(CommandError::timed_out())));
    }

    #[test]
    fn test_remove_all() {
        let log: Log = Default::default();
        let finishers: Finishers = Default::default();
        let mut queue = CommandQueue::new("drone");

        queue.add(0, parked("A", &log, &finishers)).unwrap();
        queue.add(0, parked("B", &log, &finishers)).unwrap();
        queue.process();
        queue.remove_all();

        assert!(!queue.is_executing(0));
        assert_eq!(queue.pending_count(), 0);

        // Late completion of the removed command is tolerated
        complete(&finishers, "A");
        queue.process();
        assert_eq!(*log.lock(), vec!["execute A"]);
    }
}
