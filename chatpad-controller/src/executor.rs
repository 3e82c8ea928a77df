//! Concurrent execution of parsed input sequences.
//!
//! Each accepted sequence runs on its own tokio task. Within a task, every
//! simultaneous group is pressed together with one batched commit per
//! touched port, waited out against each member's own duration, and
//! released with one batched commit per poll tick. A single shared stop
//! flag cancels all running sequences cooperatively; the atomic in-flight
//! counter is the basis for the drain barrier callers run before switching
//! consoles or controller topology.

use crate::console::ConsoleDefinition;
use crate::controller::{ControllerError, ControllerManager};
use chatpad_parsing::{InputSequence, ParsedInput};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Granularity of the per-group release poll.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Granularity of the drain-barrier poll.
const DRAIN_INTERVAL: Duration = Duration::from_millis(5);

/// Errors from submitting a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("controller port {port} does not exist ({count} controller(s) attached)")]
    PortOutOfRange { port: u8, count: usize },

    #[error("input execution is stopped; resume before submitting")]
    Stopped,

    #[error("sequence has no input groups")]
    Empty,
}

/// Schedules and cancels input sequence executions.
pub struct InputExecutor {
    manager: Arc<ControllerManager>,
    console: Arc<ConsoleDefinition>,
    in_flight: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
}

impl InputExecutor {
    pub fn new(manager: Arc<ControllerManager>, console: Arc<ConsoleDefinition>) -> Self {
        Self {
            manager,
            console,
            in_flight: Arc::new(AtomicUsize::new(0)),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn console(&self) -> &Arc<ConsoleDefinition> {
        &self.console
    }

    pub fn manager(&self) -> &Arc<ControllerManager> {
        &self.manager
    }

    /// Swap in a new console and controller set. Only sound after a drain:
    /// cancel, wait for in-flight to reach zero, reconfigure, resume.
    pub fn reconfigure(&mut self, manager: Arc<ControllerManager>, console: Arc<ConsoleDefinition>) {
        self.manager = manager;
        self.console = console;
    }

    /// Schedule a sequence for execution. Non-blocking: the sequence plays
    /// out on its own task.
    ///
    /// The groups are copied into a compact array form so execution is
    /// decoupled from the caller's sequence. The in-flight counter is
    /// incremented here, not on the task, so a drain barrier started right
    /// after `submit` returns can never observe a missing execution.
    pub fn submit(&self, sequence: &InputSequence) -> Result<(), SubmitError> {
        if self.stop.load(Ordering::SeqCst) {
            return Err(SubmitError::Stopped);
        }
        if sequence.groups.is_empty() {
            return Err(SubmitError::Empty);
        }

        let count = self.manager.controller_count();
        for input in sequence.groups.iter().flatten() {
            if usize::from(input.port) >= count {
                return Err(SubmitError::PortOutOfRange {
                    port: input.port,
                    count,
                });
            }
        }

        let groups: Arc<[Box<[ParsedInput]>]> = sequence
            .groups
            .iter()
            .map(|group| group.clone().into_boxed_slice())
            .collect();

        self.in_flight.fetch_add(1, Ordering::SeqCst);

        let manager = Arc::clone(&self.manager);
        let console = Arc::clone(&self.console);
        let stop = Arc::clone(&self.stop);
        let in_flight = Arc::clone(&self.in_flight);

        tokio::spawn(async move {
            run_sequence(&groups, &manager, &console, &stop).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(())
    }

    /// Request cancellation of every running sequence. Cancellation is
    /// complete once [`in_flight`](Self::in_flight) reaches zero.
    pub fn cancel_all(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Allow new submissions again. Already-aborted sequences are not
    /// resurrected.
    pub fn resume(&self) {
        self.stop.store(false, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Number of sequences currently executing.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until every running sequence has finished or aborted. Combined
    /// with [`cancel_all`](Self::cancel_all) this is the drain barrier used
    /// before console or controller-count switches.
    pub async fn drain(&self) {
        while self.in_flight() > 0 {
            sleep(DRAIN_INTERVAL).await;
        }
    }
}

async fn run_sequence(
    groups: &[Box<[ParsedInput]>],
    manager: &ControllerManager,
    console: &ConsoleDefinition,
    stop: &AtomicBool,
) {
    let mut fault = false;

    'groups: for group in groups {
        // Press (or release, for '-' inputs) every non-wait member, then
        // commit each touched port exactly once for this group.
        let mut touched: BTreeSet<u8> = BTreeSet::new();
        for input in group.iter() {
            if console.is_wait(&input.name) {
                continue;
            }
            let staged = manager.with_port(input.port, |controller| {
                if input.release {
                    controller.release(&input.name)
                } else {
                    controller.press(&input.name, input.percent)
                }
            });
            match staged {
                Some(Ok(())) => {
                    touched.insert(input.port);
                }
                Some(Err(error)) => {
                    warn!("controller fault on \"{}\": {error}", input.name);
                    fault = true;
                    break 'groups;
                }
                None => {
                    warn!("controller port {} vanished mid-sequence", input.port);
                    fault = true;
                    break 'groups;
                }
            }
        }
        if let Err(error) = commit_ports(manager, &touched) {
            warn!("controller commit fault: {error}");
            fault = true;
            break 'groups;
        }

        // Wait out each member's own duration, releasing members as they
        // expire. One commit per poll tick per touched port, never one per
        // input.
        let started = Instant::now();
        let mut remaining: Vec<usize> = (0..group.len()).collect();

        while !remaining.is_empty() {
            if stop.load(Ordering::Relaxed) {
                break 'groups;
            }

            let elapsed_ms = started.elapsed().as_millis() as u64;
            let mut released: BTreeSet<u8> = BTreeSet::new();
            let mut release_fault = false;

            remaining.retain(|&index| {
                let input = &group[index];
                if elapsed_ms < input.duration_ms {
                    return true;
                }
                // Holds stay pressed until the sequence ends or a later
                // '-' token releases them; waits only consume time.
                if !input.hold && !console.is_wait(&input.name) {
                    match manager.with_port(input.port, |controller| controller.release(&input.name)) {
                        Some(Ok(())) => {
                            released.insert(input.port);
                        }
                        Some(Err(error)) => {
                            warn!("controller fault releasing \"{}\": {error}", input.name);
                            release_fault = true;
                        }
                        None => release_fault = true,
                    }
                }
                false
            });

            if release_fault {
                fault = true;
                break 'groups;
            }
            if let Err(error) = commit_ports(manager, &released) {
                warn!("controller commit fault: {error}");
                fault = true;
                break 'groups;
            }
            if remaining.is_empty() {
                break;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    if fault || stop.load(Ordering::Relaxed) {
        debug!("sequence aborted, releasing all of its inputs");
    }

    release_all(groups, manager, console);
}

/// Unconditionally release every input that was ever part of the sequence
/// and commit once per port, so nothing is left stuck pressed. This runs on
/// normal completion, cancellation, and controller faults alike.
fn release_all(groups: &[Box<[ParsedInput]>], manager: &ControllerManager, console: &ConsoleDefinition) {
    let mut ports: BTreeSet<u8> = BTreeSet::new();

    for input in groups.iter().flat_map(|group| group.iter()) {
        if console.is_wait(&input.name) {
            continue;
        }
        match manager.with_port(input.port, |controller| controller.release(&input.name)) {
            Some(Ok(())) => {
                ports.insert(input.port);
            }
            Some(Err(error)) => {
                warn!("cleanup release failed for \"{}\": {error}", input.name);
                ports.insert(input.port);
            }
            None => {}
        }
    }

    if let Err(error) = commit_ports(manager, &ports) {
        warn!("cleanup commit failed: {error}");
    }
}

fn commit_ports(manager: &ControllerManager, ports: &BTreeSet<u8>) -> Result<(), ControllerError> {
    for &port in ports {
        if let Some(result) = manager.with_port(port, |controller| controller.commit()) {
            result?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::DummyController;
    use chatpad_parsing::ParsedInput;

    fn executor() -> InputExecutor {
        let console = Arc::new(ConsoleDefinition::builtin("nes").unwrap());
        let (controller, _probe) = DummyController::new(Arc::clone(&console));
        let controllers: Vec<Box<dyn crate::controller::VirtualController>> =
            vec![Box::new(controller)];
        let manager = Arc::new(ControllerManager::new(controllers));
        InputExecutor::new(manager, console)
    }

    fn sequence(port: u8) -> InputSequence {
        InputSequence {
            groups: vec![vec![ParsedInput {
                name: "a".to_string(),
                hold: false,
                release: false,
                percent: 100,
                duration_ms: 10,
                port,
            }]],
            total_duration_ms: 10,
        }
    }

    #[tokio::test]
    async fn submit_rejects_unknown_port() {
        let executor = executor();
        assert_eq!(
            executor.submit(&sequence(3)),
            Err(SubmitError::PortOutOfRange { port: 3, count: 1 })
        );
    }

    #[tokio::test]
    async fn submit_rejects_empty_sequence() {
        let executor = executor();
        let empty = InputSequence::default();
        assert_eq!(executor.submit(&empty), Err(SubmitError::Empty));
    }

    #[tokio::test]
    async fn submit_rejects_while_stopped() {
        let executor = executor();
        executor.cancel_all();
        assert_eq!(executor.submit(&sequence(0)), Err(SubmitError::Stopped));
        executor.resume();
        assert!(executor.submit(&sequence(0)).is_ok());
        executor.drain().await;
    }

    #[tokio::test]
    async fn in_flight_returns_to_zero() {
        let executor = executor();
        executor.submit(&sequence(0)).unwrap();
        assert!(executor.in_flight() >= 1);
        executor.drain().await;
        assert_eq!(executor.in_flight(), 0);
    }
}
