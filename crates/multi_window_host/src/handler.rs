//! Method handler installed on every window the host creates

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use multi_window::{CallError, MethodCall, MethodHandler, WindowId};

pub struct HostMethodHandler {
    window_id: WindowId,
}

impl HostMethodHandler {
    pub fn new(window_id: WindowId) -> Self {
        Self { window_id }
    }
}

#[async_trait]
impl MethodHandler for HostMethodHandler {
    async fn handle(&self, call: MethodCall) -> Result<Value, CallError> {
        debug!(
            window_id = self.window_id,
            from = call.from,
            method = %call.method,
            "Handling call"
        );

        match call.method.as_str() {
            "ping" => Ok(json!("pong")),
            "windowId" => Ok(json!(self.window_id)),
            "echo" => Ok(call.arguments),
            _ => Err(CallError::NotImplemented {
                window: self.window_id,
                method: call.method,
            }),
        }
    }
}
