//! Error Types
//!
//! Every failure here is local to the call or command that produced it; none
//! of them touch other windows or their in-flight calls.

use serde_json::{json, Value};
use thiserror::Error;

use crate::WindowId;

/// Error codes carried in failure replies
pub mod codes {
    pub const TARGET_NOT_FOUND: &str = "-1";
    pub const CHANNEL_CLOSED: &str = "channel-closed";
    pub const TIMEOUT: &str = "timeout";
    pub const NOT_IMPLEMENTED: &str = "not-implemented";
    pub const WINDOW_NOT_FOUND: &str = "window-not-found";
    pub const INVALID_ARGUMENTS: &str = "invalid-arguments";
    pub const NATIVE_ERROR: &str = "native-error";
    pub const MALFORMED_REQUEST: &str = "malformed-request";
}

/// Failure of a cross-window call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// No live window with the requested id
    #[error("failed to find target window. {target}")]
    TargetNotFound { target: WindowId },

    /// The channel the call was waiting on was torn down
    #[error("channel of window {window} closed before the call completed")]
    ChannelClosed { window: WindowId },

    /// No reply arrived within the configured invoke timeout
    #[error("call #{correlation} timed out after {after_ms}ms")]
    Timeout { correlation: u64, after_ms: u64 },

    /// The target window has no handler for this method
    #[error("window {window} does not implement '{method}'")]
    NotImplemented { window: WindowId, method: String },

    /// Application-level failure reported by the target's handler
    #[error("{message}")]
    Failed {
        code: String,
        message: String,
        details: Option<Value>,
    },
}

impl CallError {
    /// Build an application-level failure
    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        CallError::Failed {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            CallError::TargetNotFound { .. } => codes::TARGET_NOT_FOUND,
            CallError::ChannelClosed { .. } => codes::CHANNEL_CLOSED,
            CallError::Timeout { .. } => codes::TIMEOUT,
            CallError::NotImplemented { .. } => codes::NOT_IMPLEMENTED,
            CallError::Failed { code, .. } => code,
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            CallError::TargetNotFound { target } => Some(json!({ "targetWindowId": target })),
            CallError::ChannelClosed { window } => Some(json!({ "windowId": window })),
            CallError::Failed { details, .. } => details.clone(),
            _ => None,
        }
    }
}

/// Error returned by a native surface operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SurfaceError(pub String);

impl SurfaceError {
    pub fn new(message: impl Into<String>) -> Self {
        SurfaceError(message.into())
    }
}

/// Registry-level failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// `attach_main` was called a second time
    #[error("main window is already attached")]
    MainAlreadyAttached,

    /// The native layer could not build a surface
    #[error("failed to create native surface for window {window}: {message}")]
    Native { window: WindowId, message: String },

    /// Configured window limit reached
    #[error("window limit reached ({limit} secondary windows)")]
    WindowLimit { limit: usize },
}

/// Failure of a registry-facing command (validation or execution)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("{method}: missing required field '{field}'")]
    MissingField { method: String, field: &'static str },

    #[error("{method}: field '{field}' must be {expected}")]
    InvalidField {
        method: String,
        field: &'static str,
        expected: &'static str,
    },

    #[error("{method}: field '{field}' out of range ({value})")]
    OutOfRange {
        method: String,
        field: &'static str,
        value: String,
    },

    #[error("method '{0}' is not implemented")]
    NotImplemented(String),

    #[error("window {0} not exists")]
    WindowNotFound(WindowId),

    #[error("native surface of window {window} failed: {message}")]
    Surface { window: WindowId, message: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl CommandError {
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::MissingField { .. }
            | CommandError::InvalidField { .. }
            | CommandError::OutOfRange { .. } => codes::INVALID_ARGUMENTS,
            CommandError::NotImplemented(_) => codes::NOT_IMPLEMENTED,
            CommandError::WindowNotFound(_) => codes::WINDOW_NOT_FOUND,
            CommandError::Surface { .. } | CommandError::Registry(_) => codes::NATIVE_ERROR,
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            CommandError::MissingField { field, .. }
            | CommandError::InvalidField { field, .. }
            | CommandError::OutOfRange { field, .. } => Some(json!({ "field": field })),
            CommandError::WindowNotFound(window) | CommandError::Surface { window, .. } => {
                Some(json!({ "windowId": window }))
            }
            _ => None,
        }
    }
}
