//! Command dispatch from the transport to the registry

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use multi_window::{Reply, WindowCommand, WindowRegistry};

/// Parses and executes window commands, encoding the outcome as a [`Reply`]
#[derive(Clone)]
pub struct CommandHandler {
    registry: Arc<WindowRegistry>,
}

impl CommandHandler {
    pub fn new(registry: Arc<WindowRegistry>) -> Self {
        Self { registry }
    }

    pub fn handle(&self, method: &str, arguments: Value) -> Reply {
        let outcome =
            WindowCommand::parse(method, arguments).and_then(|command| command.execute(&self.registry));

        if let Err(e) = &outcome {
            warn!(method, code = e.code(), error = %e, "Command failed");
        }
        Reply::from(outcome)
    }
}
