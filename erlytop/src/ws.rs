//! WebSocket client for the bridge agent that serves a node's process table.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

use crate::error::NodeError;
use crate::node::{FetchFuture, NodeCollaborator};
use crate::property::Property;
use crate::types::{ProcessInfo, ProcessesPayload};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const GET_PROCESSES: &str = "get_processes";

pub fn parse_node_url(url: &str) -> Result<Url, NodeError> {
    let parsed = Url::parse(url).map_err(|e| NodeError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(NodeError::InvalidUrl(format!(
            "{url}: expected ws:// or wss://, got {other}://"
        ))),
    }
}

pub struct WsNode {
    // one request/reply exchange at a time
    stream: Arc<Mutex<WsStream>>,
    connected: Arc<Property<bool>>,
}

impl WsNode {
    pub async fn connect(url: &str) -> Result<Self, NodeError> {
        let url = parse_node_url(url)?;
        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| NodeError::Disconnected(format!("connect {url}: {e}")))?;
        debug!(%url, "connected to node bridge");
        Ok(Self {
            stream: Arc::new(Mutex::new(ws)),
            connected: Arc::new(Property::new(true)),
        })
    }
}

impl NodeCollaborator for WsNode {
    fn fetch_process_snapshot(&self) -> FetchFuture {
        let stream = self.stream.clone();
        let connected = self.connected.clone();
        Box::pin(async move {
            let mut ws = stream.lock().await;
            let res = request_processes(&mut ws).await;
            if let Err(e) = &res {
                if e.is_fatal() {
                    warn!("node bridge connection lost: {e}");
                    connected.set(false);
                }
            }
            res
        })
    }

    fn connected(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }
}

// Send a "get_processes" request and await a single JSON reply
pub async fn request_processes(ws: &mut WsStream) -> Result<Vec<ProcessInfo>, NodeError> {
    ws.send(Message::Text(GET_PROCESSES.into()))
        .await
        .map_err(|e| NodeError::Disconnected(e.to_string()))?;

    loop {
        match ws.next().await {
            Some(Ok(Message::Text(json))) => {
                let payload: ProcessesPayload =
                    serde_json::from_str(&json).map_err(|e| NodeError::Decode(e.to_string()))?;
                if payload.process_count != payload.processes.len() {
                    debug!(
                        reported = payload.process_count,
                        received = payload.processes.len(),
                        "process count mismatch in bridge reply"
                    );
                }
                return Ok(payload.processes);
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => {
                return Err(NodeError::Disconnected("connection closed by bridge".into()))
            }
            Some(Ok(other)) => {
                return Err(NodeError::Request(format!(
                    "unexpected frame from bridge: {other:?}"
                )))
            }
            Some(Err(e)) => return Err(NodeError::Disconnected(e.to_string())),
        }
    }
}
