//! Error types shared by the store, the node collaborators and the poller.

use thiserror::Error;

/// A proposed snapshot was rejected; the previous one is kept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("duplicate pid in snapshot: {0}")]
    DuplicatePid(String),
}

/// Failure talking to the observed node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("node disconnected: {0}")]
    Disconnected(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("could not decode reply: {0}")]
    Decode(String),

    #[error("invalid node url: {0}")]
    InvalidUrl(String),
}

impl NodeError {
    /// A fatal error means the connection is gone and polling must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, NodeError::Disconnected(_))
    }
}

/// What the poller reports on its error channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
