//! End-to-end navigation against a scripted backend over an in-memory pipe.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::DuplexStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracer_client::codec::{MessageReader, MessageWriter};
use tracer_client::{Command, Connection, Direction, Session, SessionEnd, run_session};
use tracer_types::{FigureProps, PrimitiveValue, TraceId};

fn trace(id: u64, parent: Option<u64>) -> Value {
    json!({"id": id, "parent": parent, "label": format!("trace {id}")})
}

fn children(id: u64) -> Vec<Value> {
    match id {
        1 => vec![trace(3, Some(1)), trace(4, Some(1))],
        _ => Vec::new(),
    }
}

/// Answers every request in order and returns the requests it saw.
fn spawn_backend(stream: DuplexStream) -> JoinHandle<Vec<Value>> {
    tokio::spawn(async move {
        let (read, write) = tokio::io::split(stream);
        let mut reader = MessageReader::new(read);
        let mut writer = MessageWriter::new(write);
        let mut seen = Vec::new();

        writer.write_message("this is not json").await.unwrap();
        while let Ok(Some(text)) = reader.read_message().await {
            let request: Value = serde_json::from_str(&text).unwrap();
            let id = request["id"].as_u64().unwrap_or_default();
            let reply = match request["type"].as_str().unwrap() {
                "RootTraces" => json!({
                    "type": "RootTraces",
                    "root_traces": [trace(1, None), trace(2, None)]
                }),
                "Subtraces" => json!({"type": "Subtraces", "id": id, "subtraces": children(id)}),
                "Figure" => json!({
                    "type": "Figure",
                    "id": id,
                    "figure": {"kind": "Primitive", "value": {"I64": id}}
                }),
                "Activate" => json!({"type": "DidActivate", "id": id}),
                "ToggleExpansion" => json!({"type": "DidToggleExpansion", "id": id}),
                other => panic!("unexpected request type {other}"),
            };
            seen.push(request);
            if writer.write_message(&reply.to_string()).await.is_err() {
                break;
            }
        }
        seen
    })
}

/// Fetch children for everything on screen, the way a tree view would.
fn render(session: &mut Session) {
    let visible = session.visible().borrow().clone();
    for id in visible {
        session.subtraces(id).unwrap();
    }
}

async fn until<T>(rx: &mut watch::Receiver<T>, predicate: impl FnMut(&T) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for projection")
        .expect("projection closed");
}

fn ids(raw: &[u64]) -> Vec<TraceId> {
    raw.iter().copied().map(TraceId::new).collect()
}

#[tokio::test]
async fn test_keyboard_navigation_round_trip() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let backend = spawn_backend(server);
    let (client_read, client_write) = tokio::io::split(client);
    let connection = Connection::spawn(client_read, client_write);
    let session = connection.session();

    let mut roots = session.root_traces();
    let mut active = session.active_trace();
    let mut visible = session.visible();
    let mut figure = session.figure();

    let (commands, command_rx) = mpsc::channel(16);
    let run = tokio::spawn(run_session(connection, session, command_rx, render));

    until(&mut roots, |roots| roots.len() == 2).await;

    commands.send(Command::Activate(TraceId::new(1))).await.unwrap();
    until(&mut active, |id| *id == Some(TraceId::new(1))).await;

    commands.send(Command::Move(Direction::Right)).await.unwrap();
    until(&mut active, |id| *id == Some(TraceId::new(3))).await;
    assert_eq!(*visible.borrow(), ids(&[1, 3, 4, 2]));
    until(&mut figure, |figure| {
        figure.as_deref()
            == Some(&FigureProps::Primitive {
                value: PrimitiveValue::I64(3),
            })
    })
    .await;

    commands.send(Command::Move(Direction::Down)).await.unwrap();
    until(&mut active, |id| *id == Some(TraceId::new(4))).await;

    commands.send(Command::Move(Direction::Left)).await.unwrap();
    until(&mut active, |id| *id == Some(TraceId::new(1))).await;
    until(&mut visible, |visible| *visible == ids(&[1, 2])).await;

    commands.send(Command::Quit).await.unwrap();
    assert_eq!(run.await.unwrap(), SessionEnd::Quit);

    let seen = backend.await.unwrap();
    let mut subtrace_requests: HashMap<u64, usize> = HashMap::new();
    for request in &seen {
        if request["type"] == "Subtraces" {
            *subtrace_requests
                .entry(request["id"].as_u64().unwrap())
                .or_default() += 1;
        }
    }
    assert!(subtrace_requests.values().all(|&count| count == 1));
    assert!(subtrace_requests.contains_key(&1));
    assert_eq!(seen[0], json!({"type": "RootTraces"}));
}

#[tokio::test]
async fn test_session_ends_when_backend_disconnects() {
    let (client, server) = tokio::io::duplex(1024);
    let (client_read, client_write) = tokio::io::split(client);
    let connection = Connection::spawn(client_read, client_write);
    let session = connection.session();
    let mut active = session.active_trace();
    let (_commands, command_rx) = mpsc::channel(1);
    drop(server);

    let end = run_session(connection, session, command_rx, |_| {}).await;
    assert!(matches!(end, SessionEnd::Disconnected(_)));
    assert!(active.changed().await.is_err());
}
