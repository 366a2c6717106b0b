//! Poller behavior against a fake node whose replies are released by the test.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use erlytop::node::{FetchFuture, NodeCollaborator};
use erlytop::poller::{ControllerEvent, PollingState, ProcController};
use erlytop::property::Property;
use erlytop::{NodeError, ProcessInfo};
use tokio::sync::{watch, Semaphore};
use tokio::time::timeout;

/// Every fetch waits for one permit before replying.
struct GatedNode {
    calls: AtomicUsize,
    gate: Arc<Semaphore>,
    procs: Vec<ProcessInfo>,
    connected: Property<bool>,
}

impl GatedNode {
    fn new(procs: Vec<ProcessInfo>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Arc::new(Semaphore::new(0)),
            procs,
            connected: Property::new(true),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

impl NodeCollaborator for GatedNode {
    fn fetch_process_snapshot(&self) -> FetchFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.clone();
        let procs = self.procs.clone();
        Box::pin(async move {
            match gate.acquire_owned().await {
                Ok(permit) => {
                    permit.forget();
                    Ok(procs)
                }
                Err(e) => Err(NodeError::Request(e.to_string())),
            }
        })
    }

    fn connected(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }
}

fn proc(pid: &str, heap: u64) -> ProcessInfo {
    ProcessInfo {
        pid: pid.into(),
        process_name: String::new(),
        reductions: 0,
        msg_queue_len: 0,
        heap_size: heap,
        stack_size: 0,
        total_heap_size: heap,
    }
}

async fn next(ctl: &mut ProcController) -> ControllerEvent {
    timeout(Duration::from_secs(5), ctl.next_event())
        .await
        .expect("controller event within 5s")
}

#[tokio::test]
async fn second_refresh_while_outstanding_is_a_noop() {
    let node = GatedNode::new(vec![proc("<0.1.0>", 10)]);
    let mut ctl = ProcController::new(node.clone());

    assert!(ctl.refresh_once());
    assert!(!ctl.refresh_once());
    assert!(ctl.in_flight());
    assert_eq!(node.calls(), 1);

    node.release(1);
    assert_eq!(next(&mut ctl).await, ControllerEvent::Applied { count: 1 });
    assert!(!ctl.in_flight());

    // idle again: a new request goes out
    assert!(ctl.refresh_once());
    assert_eq!(node.calls(), 2);
}

#[tokio::test]
async fn toggling_twice_restores_state_without_requests() {
    let node = GatedNode::new(vec![]);
    let mut ctl = ProcController::new(node.clone());
    let mut polling = ctl.polling_property();

    assert_eq!(ctl.toggle_polling(), PollingState::Polling);
    assert_eq!(node.calls(), 0);
    assert_eq!(ctl.toggle_polling(), PollingState::Stopped);
    assert_eq!(node.calls(), 0);
    assert_eq!(ctl.polling(), PollingState::Stopped);
    assert_eq!(*polling.borrow_and_update(), PollingState::Stopped);
}

#[tokio::test]
async fn ticks_are_skipped_while_a_refresh_is_outstanding() {
    let node = GatedNode::new(vec![proc("<0.1.0>", 1), proc("<0.2.0>", 2)]);
    let mut ctl = ProcController::with_interval(node.clone(), Duration::from_millis(5));

    assert!(ctl.refresh_once());
    ctl.toggle_polling();

    // the reply is held back, so every tick finds the request outstanding
    for _ in 0..3 {
        assert_eq!(next(&mut ctl).await, ControllerEvent::TickSkipped);
    }
    assert_eq!(node.calls(), 1);

    node.release(1);
    let mut applied = false;
    while !applied {
        match next(&mut ctl).await {
            ControllerEvent::Applied { count } => {
                assert_eq!(count, 2);
                applied = true;
            }
            ControllerEvent::TickSkipped => {}
            other => panic!("unexpected event {other:?}"),
        }
    }

    // next tick issues a fresh request
    loop {
        match next(&mut ctl).await {
            ControllerEvent::TickIssued => break,
            ControllerEvent::TickSkipped => {}
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(node.calls(), 2);
}

#[tokio::test]
async fn stopping_while_in_flight_still_applies_the_result() {
    let node = GatedNode::new(vec![proc("<0.9.0>", 4)]);
    let mut ctl = ProcController::with_interval(node.clone(), Duration::from_millis(5));
    let mut snapshots = ctl.store().subscribe();
    snapshots.borrow_and_update();

    ctl.toggle_polling();
    assert_eq!(next(&mut ctl).await, ControllerEvent::TickIssued);
    ctl.toggle_polling();
    assert_eq!(ctl.polling(), PollingState::Stopped);

    node.release(1);
    assert_eq!(next(&mut ctl).await, ControllerEvent::Applied { count: 1 });
    assert!(snapshots.has_changed().unwrap());

    // no more ticks once stopped
    let idle = timeout(Duration::from_millis(50), ctl.next_event()).await;
    assert!(idle.is_err(), "unexpected event after stop: {idle:?}");
    assert_eq!(node.calls(), 1);
}
