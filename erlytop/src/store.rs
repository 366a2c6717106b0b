//! The current process table and its change notifications.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::watch;

use crate::error::SnapshotError;
use crate::property::Property;
use crate::sort::{sorted, SortSpec};
use crate::types::ProcessInfo;

/// What observers read after a change notification.
#[derive(Debug, Clone)]
pub struct ProcSnapshot {
    /// Bumped once per accepted change.
    pub generation: u64,
    pub taken_at: DateTime<Local>,
    /// Processes in display order.
    pub procs: Vec<ProcessInfo>,
}

impl ProcSnapshot {
    fn empty() -> Self {
        Self {
            generation: 0,
            taken_at: Local::now(),
            procs: Vec::new(),
        }
    }

    /// `"N processes at h:mm:ssam"`, the count label shown above the table.
    pub fn count_line(&self) -> String {
        format!(
            "{} processes at {}",
            self.procs.len(),
            self.taken_at.format("%-I:%M:%S%P")
        )
    }
}

pub struct ProcessSnapshotStore {
    // as received, so a cleared sort restores node order
    received: Vec<ProcessInfo>,
    sort: Option<SortSpec>,
    current: Property<Arc<ProcSnapshot>>,
}

impl ProcessSnapshotStore {
    pub fn new() -> Self {
        Self {
            received: Vec::new(),
            sort: None,
            current: Property::new(Arc::new(ProcSnapshot::empty())),
        }
    }

    /// Replace the whole table. Rejects snapshots with duplicate pids and
    /// keeps the previous table in that case.
    pub fn replace_all(&mut self, items: Vec<ProcessInfo>) -> Result<(), SnapshotError> {
        let mut seen = HashSet::with_capacity(items.len());
        for p in &items {
            if !seen.insert(p.pid.as_str()) {
                return Err(SnapshotError::DuplicatePid(p.pid.clone()));
            }
        }
        self.received = items;
        self.publish(Local::now());
        Ok(())
    }

    /// Reorder the visible table. Fires one notification.
    pub fn set_sort(&mut self, spec: Option<SortSpec>) {
        self.sort = spec;
        let taken_at = self.current.get().taken_at;
        self.publish(taken_at);
    }

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    pub fn current_count(&self) -> usize {
        self.received.len()
    }

    /// The processes whose pid is in `ids`, in display order. An empty set
    /// selects the whole table, which is the default chart input.
    pub fn selected(&self, ids: &HashSet<String>) -> Vec<ProcessInfo> {
        let snap = self.current.get();
        if ids.is_empty() {
            return snap.procs.clone();
        }
        snap.procs
            .iter()
            .filter(|p| ids.contains(&p.pid))
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> Arc<ProcSnapshot> {
        self.current.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ProcSnapshot>> {
        self.current.subscribe()
    }

    fn publish(&mut self, taken_at: DateTime<Local>) {
        let generation = self.current.get().generation + 1;
        let procs = sorted(self.sort.as_ref(), self.received.clone());
        self.current.set(Arc::new(ProcSnapshot {
            generation,
            taken_at,
            procs,
        }));
    }
}

impl Default for ProcessSnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
