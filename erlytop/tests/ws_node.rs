//! WebSocket bridge client against an in-process bridge server.
use std::time::Duration;

use erlytop::node::NodeCollaborator;
use erlytop::poller::{ControllerEvent, ProcController};
use erlytop::types::ProcessesPayload;
use erlytop::ws::{WsNode, GET_PROCESSES};
use erlytop::{NodeError, ProcessInfo};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

enum Reply {
    Payload(Vec<ProcessInfo>),
    Garbage,
    Close,
}

/// Accept one client and answer its requests with `replies`, in order.
async fn spawn_bridge(replies: Vec<Reply>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        for reply in replies {
            match ws.next().await {
                Some(Ok(Message::Text(t))) => assert_eq!(t.as_str(), GET_PROCESSES),
                other => panic!("unexpected request: {other:?}"),
            }
            match reply {
                Reply::Payload(processes) => {
                    let body = serde_json::to_string(&ProcessesPayload {
                        process_count: processes.len(),
                        processes,
                    })
                    .unwrap();
                    ws.send(Message::Text(body)).await.unwrap();
                }
                Reply::Garbage => ws.send(Message::Text("not json".into())).await.unwrap(),
                Reply::Close => {
                    let _ = ws.close(None).await;
                    return;
                }
            }
        }
        while let Some(Ok(_)) = ws.next().await {}
    });
    format!("ws://{addr}/ws")
}

fn proc(pid: &str, name: &str) -> ProcessInfo {
    ProcessInfo {
        pid: pid.into(),
        process_name: name.into(),
        reductions: 1200,
        msg_queue_len: 0,
        heap_size: 987,
        stack_size: 11,
        total_heap_size: 2585,
    }
}

#[tokio::test]
async fn fetches_process_table() {
    let url = spawn_bridge(vec![Reply::Payload(vec![
        proc("<0.0.0>", "init"),
        proc("<0.44.0>", ""),
    ])])
    .await;
    let node = WsNode::connect(&url).await.expect("connect bridge");
    let procs = node.fetch_process_snapshot().await.unwrap();
    assert_eq!(procs.len(), 2);
    assert_eq!(procs[0].process_name, "init");
    assert_eq!(procs[1].label(), "<0.44.0>");
    assert!(*node.connected().borrow());
}

#[tokio::test]
async fn bad_reply_is_a_transient_decode_error() {
    let url = spawn_bridge(vec![Reply::Garbage, Reply::Payload(vec![])]).await;
    let node = WsNode::connect(&url).await.unwrap();

    let err = node.fetch_process_snapshot().await.unwrap_err();
    assert!(matches!(err, NodeError::Decode(_)), "{err}");
    assert!(*node.connected().borrow());

    // the connection is still usable
    assert!(node.fetch_process_snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn closed_connection_is_fatal_and_clears_connected() {
    let url = spawn_bridge(vec![Reply::Close]).await;
    let node = WsNode::connect(&url).await.unwrap();
    let mut connected = node.connected();

    let err = node.fetch_process_snapshot().await.unwrap_err();
    assert!(err.is_fatal(), "{err}");
    assert!(connected.has_changed().unwrap());
    assert!(!*connected.borrow_and_update());
}

#[tokio::test]
async fn connect_rejects_non_websocket_urls() {
    let err = WsNode::connect("http://127.0.0.1:1/ws").await.err().unwrap();
    assert!(matches!(err, NodeError::InvalidUrl(_)));
}

#[tokio::test]
async fn controller_applies_bridge_snapshot() {
    let url = spawn_bridge(vec![Reply::Payload(vec![
        proc("<0.1.0>", "a"),
        proc("<0.2.0>", "b"),
        proc("<0.3.0>", "c"),
    ])])
    .await;
    let node = WsNode::connect(&url).await.unwrap();
    let mut ctl = ProcController::new(Arc::new(node));

    assert!(ctl.refresh_once());
    let ev = tokio::time::timeout(Duration::from_secs(5), ctl.next_event())
        .await
        .unwrap();
    assert_eq!(ev, ControllerEvent::Applied { count: 3 });
    assert_eq!(ctl.store().current_count(), 3);
}
