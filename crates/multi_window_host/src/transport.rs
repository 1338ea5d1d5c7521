//! JSON-Lines Transport
//!
//! One request per line in, one reply per line out. Every request carries a
//! caller-chosen `seq` that is echoed on its reply; invoke replies may come
//! back in any order.
//!
//! ```text
//! → {"kind":"command","seq":1,"method":"createWindow","arguments":"{}"}
//! ← {"seq":1,"value":1}
//! → {"kind":"invoke","seq":2,"fromWindowId":1,"targetWindowId":0,"method":"ping"}
//! ← {"seq":2,"value":"pong"}
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use multi_window::error::codes;
use multi_window::{CommandError, Reply, WindowId};

use crate::Host;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Envelope {
    /// Window command executed by the registry
    Command {
        seq: u64,
        method: String,
        #[serde(default)]
        arguments: Value,
    },
    /// Cross-window call made on behalf of window `from`
    Invoke {
        seq: u64,
        #[serde(rename = "fromWindowId")]
        from: WindowId,
        #[serde(rename = "targetWindowId")]
        target: WindowId,
        method: String,
        #[serde(default)]
        arguments: Value,
    },
}

/// Encode a reply line, tagging it with the request's `seq`
fn reply_line(seq: Value, reply: &Reply) -> String {
    let mut line = serde_json::to_value(reply).unwrap_or_else(|e| {
        json!({ "errorCode": codes::NATIVE_ERROR, "message": e.to_string() })
    });
    line["seq"] = seq;
    line.to_string()
}

/// Best-effort `seq` recovery from a line that failed to parse as an envelope
fn salvage_seq(line: &str) -> Value {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|v| v.get("seq").filter(|seq| seq.is_u64()).cloned())
        .unwrap_or(Value::Null)
}

/// Per-connection state: where replies go and the invokes still running
struct Session<'a> {
    host: &'a Host,
    out_tx: mpsc::UnboundedSender<String>,
    in_flight: JoinSet<()>,
}

impl<'a> Session<'a> {
    fn new(host: &'a Host, out_tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            host,
            out_tx,
            in_flight: JoinSet::new(),
        }
    }

    fn send(&self, seq: Value, reply: &Reply) {
        let _ = self.out_tx.send(reply_line(seq, reply));
    }

    /// Handle one non-empty request line. Commands reply inline; invokes
    /// are spawned and reply when the target answers.
    fn handle_line(&mut self, line: &str) {
        let envelope = match serde_json::from_str::<Envelope>(line) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Malformed request");
                let reply = Reply::failure(codes::MALFORMED_REQUEST, e.to_string(), None);
                self.send(salvage_seq(line), &reply);
                return;
            }
        };

        match envelope {
            Envelope::Command {
                seq,
                method,
                arguments,
            } => {
                let reply = self.host.commands().handle(&method, arguments);
                self.send(json!(seq), &reply);
            }
            Envelope::Invoke {
                seq,
                from,
                target,
                method,
                arguments,
            } => {
                let Some(channel) = self.host.registry().channel(from) else {
                    self.send(json!(seq), &Reply::from(CommandError::WindowNotFound(from)));
                    return;
                };

                debug!(seq, from, target, method = %method, "Forwarding invoke");
                let out_tx = self.out_tx.clone();
                self.in_flight.spawn(async move {
                    let reply = Reply::from(channel.invoke(target, method, arguments).await);
                    let _ = out_tx.send(reply_line(json!(seq), &reply));
                });
            }
        }
    }

    /// Drop invoke tasks that already finished
    fn reap(&mut self) {
        while let Some(result) = self.in_flight.try_join_next() {
            if let Err(e) = result {
                warn!(error = %e, "Invoke task failed");
            }
        }
    }

    fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Wait for every invoke still running
    async fn finish(mut self) {
        while let Some(result) = self.in_flight.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Invoke task failed");
            }
        }
    }
}

/// Serve requests from `reader` until end of input, writing replies to
/// `writer`. Waits for in-flight calls before returning the writer.
pub async fn serve<R, W>(host: &Host, reader: R, writer: W) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(line) = out_rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<W, std::io::Error>(writer)
    });

    let mut session = Session::new(host, out_tx);
    let mut lines = reader.lines();
    let mut served = 0u64;

    while let Some(line) = lines.next_line().await.context("Failed to read request")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        served += 1;

        session.handle_line(line);
        session.reap();
    }

    // Dropping the session closes the reply channel once every invoke is done
    session.finish().await;

    let writer = writer_task
        .await
        .context("Writer task panicked")?
        .context("Failed to write reply")?;

    info!(served, "End of input");
    Ok(writer)
}
