//! Subscription client backed by a helper process.
//!
//! The helper owns the store SDK and talks newline-delimited JSON on
//! stdin/stdout:
//!
//! ```text
//! -> {"id": 1, "cmd": "workshop.subscribed_items", "payload": {}}
//! <- {"id": 1, "status": "ok", "payload": {"items": ["818773962"]}}
//! <- {"event": "item_subscribed", "payload": {"item_id": "2009463077", "result": 1}}
//! ```
//!
//! Event lines may arrive between any request and its response. A call that
//! gets no matching response within the configured timeout fails with
//! [`Error::Client`].

use std::collections::BTreeSet;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as ProcessCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::{SubscribeNotice, SubscriptionClient};
use crate::error::{Error, Result};

mod command;
use command::{Command, Event};

struct BridgeIo {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

pub struct BridgeClient {
    io: Mutex<BridgeIo>,
    notices: StdMutex<Vec<SubscribeNotice>>,
    next_id: AtomicU64,
    timeout: Duration,
    _child: Child,
}

#[derive(Debug, PartialEq)]
enum Incoming {
    Response { id: u64, result: std::result::Result<Value, String> },
    Notice(SubscribeNotice),
    Ignored(String),
}

impl BridgeClient {
    pub fn spawn(command: &[String], timeout: Duration) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Config("subscribe.bridge is empty".into()))?;

        let mut child = ProcessCommand::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Client(format!("failed to start bridge '{program}': {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Client("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Client("bridge stdout unavailable".into()))?;

        info!(program = %program, "Subscription bridge started");

        Ok(BridgeClient {
            io: Mutex::new(BridgeIo {
                stdin,
                lines: BufReader::new(stdout).lines(),
            }),
            notices: StdMutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            timeout,
            _child: child,
        })
    }

    async fn call(&self, cmd: Command, payload: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = request_line(id, cmd, payload);

        // A late answer to an abandoned call is dropped as stale by the next one.
        tokio::time::timeout(self.timeout, self.exchange(id, cmd, &line))
            .await
            .map_err(|_| {
                Error::Client(format!(
                    "bridge did not answer {} within {:?}",
                    cmd.as_str(),
                    self.timeout
                ))
            })?
    }

    async fn exchange(&self, id: u64, cmd: Command, line: &str) -> Result<Value> {
        let mut io = self.io.lock().await;
        io.stdin.write_all(line.as_bytes()).await.map_err(closed)?;
        io.stdin.write_all(b"\n").await.map_err(closed)?;
        io.stdin.flush().await.map_err(closed)?;

        loop {
            let Some(line) = io.lines.next_line().await.map_err(closed)? else {
                return Err(Error::Client("bridge closed its output".into()));
            };
            if line.trim().is_empty() {
                continue;
            }

            match parse_line(&line) {
                Incoming::Response { id: got, result } if got == id => {
                    return result
                        .map_err(|msg| Error::Client(format!("{} failed: {msg}", cmd.as_str())));
                }
                Incoming::Response { id: got, .. } => {
                    debug!(expected = id, got, "Dropping stale bridge response");
                }
                Incoming::Notice(notice) => self.push_notice(notice),
                Incoming::Ignored(reason) => warn!(%reason, "Ignoring bridge line"),
            }
        }
    }

    fn push_notice(&self, notice: SubscribeNotice) {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notice);
    }
}

#[async_trait]
impl SubscriptionClient for BridgeClient {
    async fn is_entitled(&self, app_id: u32) -> Result<bool> {
        let payload = self
            .call(Command::IsSubscribedApp, json!({ "app_id": app_id }))
            .await?;
        payload
            .get("subscribed")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| Error::Client("payload.subscribed must be a boolean".into()))
    }

    async fn subscribed_ids(&self) -> Result<BTreeSet<String>> {
        let payload = self.call(Command::SubscribedItems, json!({})).await?;
        let items = payload
            .get("items")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::Client("payload.items must be an array".into()))?;

        Ok(items.iter().filter_map(id_of).collect())
    }

    async fn request_subscribe(&self, item_id: &str) -> Result<()> {
        self.call(Command::SubscribeItem, json!({ "item_id": item_id }))
            .await
            .map(|_| ())
    }

    fn drain_notices(&self) -> Vec<SubscribeNotice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

fn closed(e: std::io::Error) -> Error {
    Error::Client(format!("bridge pipe error: {e}"))
}

fn request_line(id: u64, cmd: Command, payload: Value) -> String {
    json!({
        "id": id,
        "cmd": cmd.as_str(),
        "payload": payload
    })
    .to_string()
}

fn id_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_line(line: &str) -> Incoming {
    let v: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(_) => return Incoming::Ignored(format!("invalid json: {line}")),
    };

    static EMPTY: Value = Value::Null;
    let payload = v.get("payload").unwrap_or(&EMPTY);

    if let Some(event) = v.get("event").and_then(|e| e.as_str()) {
        return match Event::from(event) {
            Event::ItemSubscribed => {
                let item_id = payload.get("item_id").and_then(id_of);
                let result = payload.get("result").and_then(|r| r.as_i64());
                match (item_id, result) {
                    (Some(item_id), Some(result)) => match i32::try_from(result) {
                        Ok(result) => Incoming::Notice(SubscribeNotice { item_id, result }),
                        Err(_) => Incoming::Ignored(format!("result code out of range: {line}")),
                    },
                    _ => Incoming::Ignored(format!("incomplete item_subscribed event: {line}")),
                }
            }
            Event::Unknown => Incoming::Ignored(format!("unknown event '{event}'")),
        };
    }

    let Some(id) = v.get("id").and_then(|i| i.as_u64()) else {
        return Incoming::Ignored(format!("line without id or event: {line}"));
    };

    let result = match v.get("status").and_then(|s| s.as_str()) {
        Some("ok") => Ok(payload.clone()),
        _ => Err(v
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown bridge error")
            .to_string()),
    };

    Incoming::Response { id, result }
}
