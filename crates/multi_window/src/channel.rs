//! Per-Window Call Channel
//!
//! Each window owns one [`Channel`]. Outbound, it correlates the calls this
//! window makes with the replies that come back; inbound, it hands calls
//! addressed to this window to the window's [`MethodHandler`].
//!
//! ```text
//!   Channel(1)::invoke ──► Dispatch (router) ──► Channel(2)::dispatch ──► handler
//!        ▲                                                                  │
//!        └──────── resolve / reject (correlation id) ◄──────────────────────┘
//! ```
//!
//! Replies are matched by correlation id only, so concurrent calls from one
//! window complete in whatever order their targets answer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CallError;
use crate::protocol::MethodCall;
use crate::WindowId;

type PendingReply = oneshot::Sender<Result<Value, CallError>>;

/// Delivers an outbound call to its target window (installed by the registry)
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, call: MethodCall) -> Result<Value, CallError>;
}

/// Application-level handler for calls addressed to one window
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn handle(&self, call: MethodCall) -> Result<Value, CallError>;
}

pub struct Channel {
    window_id: WindowId,
    next_correlation: AtomicU64,
    pending: DashMap<u64, PendingReply>,
    dispatcher: RwLock<Option<Arc<dyn Dispatch>>>,
    handler: RwLock<Option<Arc<dyn MethodHandler>>>,
    timeout: Option<Duration>,
    closed: CancellationToken,
}

impl Channel {
    pub fn new(window_id: WindowId, timeout: Option<Duration>) -> Self {
        Self {
            window_id,
            next_correlation: AtomicU64::new(0),
            pending: DashMap::new(),
            dispatcher: RwLock::new(None),
            handler: RwLock::new(None),
            timeout,
            closed: CancellationToken::new(),
        }
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    pub fn set_dispatcher(&self, dispatcher: Arc<dyn Dispatch>) {
        *self.dispatcher.write() = Some(dispatcher);
    }

    pub fn set_handler(&self, handler: Arc<dyn MethodHandler>) {
        *self.handler.write() = Some(handler);
    }

    pub fn has_handler(&self) -> bool {
        self.handler.read().is_some()
    }

    /// Number of outbound calls still waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Call `method` on window `target` and wait for its reply.
    ///
    /// Fails with `TargetNotFound` if the target is not registered, with
    /// `ChannelClosed` if this channel is torn down while waiting, and with
    /// `Timeout` if a timeout is configured and elapses first.
    ///
    /// Delivery is spawned onto the ambient tokio runtime.
    pub async fn invoke(
        self: &Arc<Self>,
        target: WindowId,
        method: impl Into<String>,
        arguments: Value,
    ) -> Result<Value, CallError> {
        if self.is_closed() {
            return Err(CallError::ChannelClosed {
                window: self.window_id,
            });
        }

        let dispatcher = self
            .dispatcher
            .read()
            .clone()
            .ok_or(CallError::TargetNotFound { target })?;

        let correlation = self.next_correlation.fetch_add(1, Ordering::SeqCst) + 1;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.insert(correlation, reply_tx);

        // Teardown may have drained the map between the check above and the insert
        if self.is_closed() {
            self.pending.remove(&correlation);
            return Err(CallError::ChannelClosed {
                window: self.window_id,
            });
        }

        let call = MethodCall::new(self.window_id, target, method, arguments);
        debug!(
            window_id = self.window_id,
            target,
            correlation,
            method = %call.method,
            "Invoking remote method"
        );

        let channel = Arc::downgrade(self);
        tokio::spawn(async move {
            let outcome = dispatcher.dispatch(call).await;
            if let Some(channel) = channel.upgrade() {
                match outcome {
                    Ok(value) => channel.resolve(correlation, value),
                    Err(err) => channel.reject(correlation, err),
                };
            }
        });

        let reply = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, reply_rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    self.pending.remove(&correlation);
                    debug!(window_id = self.window_id, correlation, "Remote call timed out");
                    return Err(CallError::Timeout {
                        correlation,
                        after_ms: limit.as_millis() as u64,
                    });
                }
            },
            None => reply_rx.await,
        };

        match reply {
            Ok(outcome) => outcome,
            Err(_) => Err(CallError::ChannelClosed {
                window: self.window_id,
            }),
        }
    }

    /// Complete a pending call successfully. Unknown ids are ignored.
    pub fn resolve(&self, correlation: u64, value: Value) -> bool {
        self.complete(correlation, Ok(value))
    }

    /// Fail a pending call. Unknown ids are ignored.
    pub fn reject(&self, correlation: u64, error: CallError) -> bool {
        self.complete(correlation, Err(error))
    }

    fn complete(&self, correlation: u64, outcome: Result<Value, CallError>) -> bool {
        match self.pending.remove(&correlation) {
            Some((_, reply_tx)) => {
                // Receiver may be gone if the caller stopped waiting
                let _ = reply_tx.send(outcome);
                true
            }
            None => {
                debug!(
                    window_id = self.window_id,
                    correlation, "Ignoring late or duplicate reply"
                );
                false
            }
        }
    }

    /// Serve a call addressed to this window.
    pub async fn dispatch(&self, call: MethodCall) -> Result<Value, CallError> {
        if self.is_closed() {
            return Err(CallError::ChannelClosed {
                window: self.window_id,
            });
        }

        let handler = self.handler.read().clone();
        let Some(handler) = handler else {
            return Err(CallError::NotImplemented {
                window: self.window_id,
                method: call.method,
            });
        };

        tokio::select! {
            outcome = handler.handle(call) => outcome,
            _ = self.closed.cancelled() => Err(CallError::ChannelClosed { window: self.window_id }),
        }
    }

    /// Fail every pending call with `ChannelClosed`, cancel inbound calls in
    /// progress and refuse new ones. Returns how many pending calls failed.
    pub fn teardown(&self) -> usize {
        if self.closed.is_cancelled() {
            return 0;
        }
        self.closed.cancel();

        let correlations: Vec<u64> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut failed = 0;
        for correlation in correlations {
            if let Some((_, reply_tx)) = self.pending.remove(&correlation) {
                let _ = reply_tx.send(Err(CallError::ChannelClosed {
                    window: self.window_id,
                }));
                failed += 1;
            }
        }

        self.dispatcher.write().take();
        self.handler.write().take();

        info!(
            window_id = self.window_id,
            failed_calls = failed,
            "Channel torn down"
        );
        failed
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("window_id", &self.window_id)
            .field("pending", &self.pending.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
