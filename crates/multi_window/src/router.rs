//! Method Router
//!
//! Resolves the target of a cross-window call and forwards it to the target's
//! channel. The router never looks at `method` or `arguments`; what a method
//! means is up to the target window's handler.

use std::sync::Weak;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::channel::Dispatch;
use crate::error::CallError;
use crate::protocol::MethodCall;
use crate::registry::WindowRegistry;
use crate::WindowId;

pub struct MethodRouter {
    registry: Weak<WindowRegistry>,
}

impl MethodRouter {
    pub fn new(registry: Weak<WindowRegistry>) -> Self {
        Self { registry }
    }

    /// Route `method` from window `from` to window `target`
    pub async fn route(
        &self,
        from: WindowId,
        target: WindowId,
        method: impl Into<String>,
        arguments: Value,
    ) -> Result<Value, CallError> {
        self.route_call(MethodCall::new(from, target, method, arguments))
            .await
    }

    pub async fn route_call(&self, call: MethodCall) -> Result<Value, CallError> {
        let target = call.target;

        // Only the channel is kept past the lookup; the entity stays owned by the registry
        let channel = self
            .registry
            .upgrade()
            .and_then(|registry| registry.lookup(target))
            .map(|entity| entity.channel().clone());

        let Some(channel) = channel else {
            warn!(
                from = call.from,
                target,
                method = %call.method,
                "Failed to find target window"
            );
            return Err(CallError::TargetNotFound { target });
        };

        debug!(from = call.from, target, method = %call.method, "Routing call");
        channel.dispatch(call).await
    }
}

#[async_trait]
impl Dispatch for MethodRouter {
    async fn dispatch(&self, call: MethodCall) -> Result<Value, CallError> {
        self.route_call(call).await
    }
}
