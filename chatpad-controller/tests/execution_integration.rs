//! Integration tests for the execution pipeline.
//!
//! These exercise the full public API: parsing command text against a
//! console grammar, submitting the sequence to the executor, and observing
//! what a controller backend saw: the boundary between `chatpad-parsing`,
//! the executor, and the `VirtualController` contract.
//!
//! Timing assertions use generous margins; the poll granularity must not
//! materially change observed press/release timing, but exact equality is
//! not part of the contract.

use chatpad_controller::{
    ButtonState, ConsoleDefinition, ControllerManager, DummyController, DummyProbe, InputExecutor,
    VirtualController,
};
use chatpad_parsing::{parse, InputGrammar, InputSequence, Parsed, ParserOptions};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

fn setup(ports: usize) -> (InputExecutor, Vec<DummyProbe>) {
    let console = Arc::new(ConsoleDefinition::builtin("nes").unwrap());
    let mut controllers: Vec<Box<dyn VirtualController>> = Vec::new();
    let mut probes = Vec::new();
    for _ in 0..ports {
        let (controller, probe) = DummyController::new(Arc::clone(&console));
        controllers.push(Box::new(controller));
        probes.push(probe);
    }
    let manager = Arc::new(ControllerManager::new(controllers));
    (InputExecutor::new(manager, Arc::clone(&console)), probes)
}

fn sequence(text: &str) -> InputSequence {
    let console = ConsoleDefinition::builtin("nes").unwrap();
    let grammar = InputGrammar::build(&console.valid_inputs()).unwrap();
    match parse(text, &grammar, &ParserOptions::default()) {
        Parsed::Valid(seq) => seq,
        other => panic!("expected a valid sequence for {text:?}, got {other:?}"),
    }
}

#[tokio::test]
async fn press_then_release_lifecycle() {
    let (executor, probes) = setup(1);

    executor.submit(&sequence("a200ms")).unwrap();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(probes[0].state("a"), ButtonState::Pressed);

    executor.drain().await;
    assert_eq!(probes[0].state("a"), ButtonState::Released);
    assert_eq!(probes[0].touched_inputs(), vec!["a"]);
}

#[tokio::test]
async fn simultaneous_group_presses_together_and_releases_independently() {
    let (executor, probes) = setup(1);

    executor.submit(&sequence("a600ms+b150ms")).unwrap();

    sleep(Duration::from_millis(75)).await;
    assert_eq!(probes[0].state("a"), ButtonState::Pressed);
    assert_eq!(probes[0].state("b"), ButtonState::Pressed);

    // b's own duration has expired, a's has not.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(probes[0].state("b"), ButtonState::Released);
    assert_eq!(probes[0].state("a"), ButtonState::Pressed);

    executor.drain().await;
    assert_eq!(probes[0].state("a"), ButtonState::Released);
}

#[tokio::test]
async fn groups_execute_in_order() {
    let (executor, probes) = setup(1);

    let started = Instant::now();
    executor.submit(&sequence("a150ms b150ms")).unwrap();

    sleep(Duration::from_millis(75)).await;
    assert_eq!(probes[0].state("a"), ButtonState::Pressed);
    assert_eq!(probes[0].state("b"), ButtonState::Released);

    executor.drain().await;
    // Two 150ms groups run back to back, never overlapped.
    assert!(started.elapsed() >= Duration::from_millis(280));
    assert_eq!(probes[0].state("b"), ButtonState::Released);
}

#[tokio::test]
async fn hold_input_survives_its_duration_window() {
    let (executor, probes) = setup(1);

    executor.submit(&sequence("_a100ms b400ms")).unwrap();

    // Well past a's 100ms window, but the sequence is still running.
    sleep(Duration::from_millis(250)).await;
    assert_eq!(probes[0].state("a"), ButtonState::Pressed);

    // The end-of-sequence cleanup releases holds too.
    executor.drain().await;
    assert_eq!(probes[0].state("a"), ButtonState::Released);
}

#[tokio::test]
async fn release_token_releases_a_held_input() {
    let (executor, probes) = setup(1);

    executor.submit(&sequence("_a200ms -a300ms")).unwrap();

    sleep(Duration::from_millis(100)).await;
    assert_eq!(probes[0].state("a"), ButtonState::Pressed);

    // The second group enters at ~200ms and stages the release up front.
    sleep(Duration::from_millis(200)).await;
    assert_eq!(probes[0].state("a"), ButtonState::Released);

    executor.drain().await;
}

#[tokio::test]
async fn cancel_all_releases_everything_after_drain() {
    let (executor, probes) = setup(1);

    executor.submit(&sequence("_a10s+_b10s")).unwrap();
    sleep(Duration::from_millis(75)).await;
    assert_eq!(probes[0].state("a"), ButtonState::Pressed);
    assert_eq!(probes[0].state("b"), ButtonState::Pressed);

    let cancelled_at = Instant::now();
    executor.cancel_all();
    executor.drain().await;

    // Aborted long before the declared 10s durations.
    assert!(cancelled_at.elapsed() < Duration::from_secs(5));
    for name in probes[0].touched_inputs() {
        assert_eq!(probes[0].state(&name), ButtonState::Released);
    }

    executor.resume();
    assert_eq!(executor.in_flight(), 0);
    executor.submit(&sequence("a50ms")).unwrap();
    executor.drain().await;
}

#[tokio::test]
async fn sequences_on_different_ports_run_concurrently() {
    let (executor, probes) = setup(2);

    executor.submit(&sequence("a400ms")).unwrap();
    executor.submit(&sequence("&1b400ms")).unwrap();

    sleep(Duration::from_millis(100)).await;
    assert_eq!(probes[0].state("a"), ButtonState::Pressed);
    assert_eq!(probes[1].state("b"), ButtonState::Pressed);
    // Each port only saw its own input.
    assert_eq!(probes[0].state("b"), ButtonState::Released);
    assert_eq!(probes[1].state("a"), ButtonState::Released);

    executor.drain().await;
    assert_eq!(probes[0].state("a"), ButtonState::Released);
    assert_eq!(probes[1].state("b"), ButtonState::Released);
}

#[tokio::test]
async fn wait_inputs_consume_time_without_touching_the_controller() {
    let (executor, probes) = setup(1);

    let started = Instant::now();
    executor.submit(&sequence("#300ms")).unwrap();
    executor.drain().await;

    assert!(started.elapsed() >= Duration::from_millis(250));
    assert!(probes[0].touched_inputs().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_sequences_drain_cleanly() {
    let (executor, probes) = setup(1);

    for _ in 0..20 {
        executor.submit(&sequence("a20ms")).unwrap();
    }
    executor.drain().await;

    assert_eq!(executor.in_flight(), 0);
    assert_eq!(probes[0].state("a"), ButtonState::Released);
}
