//! Process table polling for a remote Erlang node: snapshots, single-column
//! sorting, periodic refresh and chart aggregation. Views consume the state
//! through watch/broadcast subscriptions; nothing here renders.

pub mod aggregate;
pub mod error;
pub mod node;
pub mod poller;
pub mod profiles;
pub mod property;
pub mod report;
pub mod sort;
pub mod store;
pub mod types;
pub mod ws;

pub use aggregate::{aggregate, aggregate_metric, ChartSlice, ProcMetric, ThresholdFraction};
pub use error::{NodeError, PollError, SnapshotError};
pub use node::NodeCollaborator;
pub use poller::{ControllerEvent, PollingState, ProcController};
pub use sort::{apply_sort, SortDirection, SortKey, SortSpec};
pub use store::{ProcSnapshot, ProcessSnapshotStore};
pub use types::ProcessInfo;
