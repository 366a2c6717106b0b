//! Types that mirror the bridge agent's JSON schema.

use serde::{Deserialize, Serialize};

/// One process on the observed node, as of a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Erlang pid as printed by the node, e.g. `<0.42.0>`.
    pub pid: String,
    // registered name; empty for anonymous processes
    #[serde(default)]
    pub process_name: String,
    pub reductions: u64,
    pub msg_queue_len: u64,
    // memory figures are in words, as reported by process_info/2
    pub heap_size: u64,
    pub stack_size: u64,
    pub total_heap_size: u64,
}

impl ProcessInfo {
    /// Registered name, or the pid when the process has none.
    pub fn label(&self) -> &str {
        if self.process_name.is_empty() {
            &self.pid
        } else {
            &self.process_name
        }
    }
}

/// Reply to a `get_processes` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessesPayload {
    pub process_count: usize,
    pub processes: Vec<ProcessInfo>,
}
