//! The narrow interface the poller uses to reach the observed node.

use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::error::NodeError;
use crate::types::ProcessInfo;

pub type FetchFuture = BoxFuture<'static, Result<Vec<ProcessInfo>, NodeError>>;

pub trait NodeCollaborator: Send + Sync {
    /// Ask the node for its full process table.
    fn fetch_process_snapshot(&self) -> FetchFuture;

    /// Whether the node is currently reachable. Callers check this before
    /// offering refresh or polling; the poller itself does not.
    fn connected(&self) -> watch::Receiver<bool>;
}
