//! Manual and periodic refresh of the process table.
//!
//! Requests run as tokio tasks, but their results are only applied inside
//! [`ProcController::next_event`], on whichever task owns the controller. At
//! most one request is outstanding at any time; ticks that arrive while one
//! is in flight are dropped.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::{NodeError, PollError, SnapshotError};
use crate::node::NodeCollaborator;
use crate::property::Property;
use crate::sort::SortSpec;
use crate::store::ProcessSnapshotStore;
use crate::types::ProcessInfo;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollingState {
    #[default]
    Stopped,
    Polling,
}

/// What a call to [`ProcController::next_event`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// A snapshot arrived and replaced the table.
    Applied { count: usize },
    /// A snapshot arrived but was invalid; the previous table is kept.
    Rejected(SnapshotError),
    /// The request failed. If the error was fatal, polling has been stopped.
    Failed(NodeError),
    /// A polling tick started a new request.
    TickIssued,
    /// A polling tick arrived while a request was still outstanding.
    TickSkipped,
}

enum Msg {
    Done(Result<Vec<ProcessInfo>, NodeError>),
    Tick,
}

pub struct ProcController {
    node: Arc<dyn NodeCollaborator>,
    store: ProcessSnapshotStore,
    polling: Property<PollingState>,
    proc_sort: Property<Option<SortSpec>>,
    errors: broadcast::Sender<PollError>,
    interval: Duration,

    in_flight: bool,
    done_tx: mpsc::UnboundedSender<Result<Vec<ProcessInfo>, NodeError>>,
    done_rx: mpsc::UnboundedReceiver<Result<Vec<ProcessInfo>, NodeError>>,

    // Some while polling; dropping the receiver retires queued ticks
    ticks: Option<mpsc::Receiver<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl ProcController {
    pub fn new(node: Arc<dyn NodeCollaborator>) -> Self {
        Self::with_interval(node, DEFAULT_INTERVAL)
    }

    pub fn with_interval(node: Arc<dyn NodeCollaborator>, interval: Duration) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (errors, _) = broadcast::channel(16);
        Self {
            node,
            store: ProcessSnapshotStore::new(),
            polling: Property::new(PollingState::Stopped),
            proc_sort: Property::new(None),
            errors,
            interval: interval.max(MIN_INTERVAL),
            in_flight: false,
            done_tx,
            done_rx,
            ticks: None,
            ticker: None,
        }
    }

    pub fn store(&self) -> &ProcessSnapshotStore {
        &self.store
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn polling(&self) -> PollingState {
        self.polling.get()
    }

    pub fn polling_property(&self) -> watch::Receiver<PollingState> {
        self.polling.subscribe()
    }

    pub fn proc_sort(&self) -> Option<SortSpec> {
        self.proc_sort.get()
    }

    pub fn proc_sort_property(&self) -> watch::Receiver<Option<SortSpec>> {
        self.proc_sort.subscribe()
    }

    /// Replace the active sort column (or clear it) and reorder the table.
    pub fn set_proc_sort(&mut self, spec: Option<SortSpec>) {
        self.proc_sort.set(spec);
        self.store.set_sort(spec);
    }

    pub fn errors(&self) -> broadcast::Receiver<PollError> {
        self.errors.subscribe()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Manual refresh is offered only while connected and not polling.
    pub fn can_refresh(&self, connected: bool) -> bool {
        connected && self.polling() == PollingState::Stopped
    }

    pub fn can_toggle(&self, connected: bool) -> bool {
        connected
    }

    /// Start one request unless one is already outstanding. Returns whether
    /// a request was issued.
    pub fn refresh_once(&mut self) -> bool {
        if self.in_flight {
            debug!("refresh already in flight, ignoring");
            return false;
        }
        self.in_flight = true;
        let fut = self.node.fetch_process_snapshot();
        let tx = self.done_tx.clone();
        tokio::spawn(async move {
            // a panicking node must still clear in_flight
            let res = AssertUnwindSafe(fut).catch_unwind().await.unwrap_or_else(|_| {
                Err(NodeError::Request("node request panicked".into()))
            });
            // receiver lives as long as the controller
            let _ = tx.send(res);
        });
        true
    }

    /// Flip between stopped and polling. Never issues a request itself; the
    /// first tick does.
    pub fn toggle_polling(&mut self) -> PollingState {
        match self.polling() {
            PollingState::Stopped => self.start_polling(),
            PollingState::Polling => self.stop_polling(),
        }
        self.polling()
    }

    /// Wait for the next completion or tick and apply it.
    pub async fn next_event(&mut self) -> ControllerEvent {
        let msg = {
            let done_rx = &mut self.done_rx;
            let ticks = self.ticks.as_mut();
            tokio::select! {
                biased;
                Some(res) = done_rx.recv() => Msg::Done(res),
                Some(()) = next_tick(ticks) => Msg::Tick,
            }
        };

        match msg {
            Msg::Done(res) => self.complete(res),
            Msg::Tick => self.tick(),
        }
    }

    fn complete(&mut self, res: Result<Vec<ProcessInfo>, NodeError>) -> ControllerEvent {
        self.in_flight = false;
        match res {
            Ok(procs) => match self.store.replace_all(procs) {
                Ok(()) => ControllerEvent::Applied {
                    count: self.store.current_count(),
                },
                Err(e) => {
                    self.report(e.clone().into());
                    ControllerEvent::Rejected(e)
                }
            },
            Err(e) => {
                self.report(e.clone().into());
                if e.is_fatal() && self.polling() == PollingState::Polling {
                    self.stop_polling();
                }
                ControllerEvent::Failed(e)
            }
        }
    }

    fn tick(&mut self) -> ControllerEvent {
        if self.polling() == PollingState::Polling && self.refresh_once() {
            ControllerEvent::TickIssued
        } else {
            ControllerEvent::TickSkipped
        }
    }

    fn report(&self, err: PollError) {
        warn!("process refresh failed: {err}");
        // no subscribers is fine
        let _ = self.errors.send(err);
    }

    fn start_polling(&mut self) {
        let (tx, rx) = mpsc::channel(1);
        self.ticker = Some(spawn_ticker(self.interval, tx));
        self.ticks = Some(rx);
        self.polling.set(PollingState::Polling);
        info!(interval_ms = self.interval.as_millis() as u64, "polling started");
    }

    fn stop_polling(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        self.ticks = None;
        self.polling.set(PollingState::Stopped);
        info!("polling stopped");
    }
}

impl Drop for ProcController {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

async fn next_tick(ticks: Option<&mut mpsc::Receiver<()>>) -> Option<()> {
    match ticks {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

// First tick fires immediately. The channel holds at most one pending tick,
// so a slow owner sees one tick, not a backlog.
fn spawn_ticker(period: Duration, tx: mpsc::Sender<()>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            match tx.try_send(()) {
                Ok(()) | Err(TrySendError::Full(())) => {}
                Err(TrySendError::Closed(())) => break,
            }
        }
    })
}
