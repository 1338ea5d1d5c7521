//! Cross-Window Call Wire Shapes
//!
//! Transport-agnostic request and reply formats. Field names follow the
//! camelCase convention used by the UI side.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CallError, CommandError};
use crate::WindowId;

/// A method call from one window to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    #[serde(rename = "fromWindowId")]
    pub from: WindowId,
    #[serde(rename = "targetWindowId")]
    pub target: WindowId,
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(from: WindowId, target: WindowId, method: impl Into<String>, arguments: Value) -> Self {
        Self {
            from,
            target,
            method: method.into(),
            arguments,
        }
    }
}

/// Reply to a call or command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Success {
        value: Value,
    },
    Failure {
        #[serde(rename = "errorCode")]
        error_code: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
}

impl Reply {
    pub fn success(value: Value) -> Self {
        Reply::Success { value }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>, details: Option<Value>) -> Self {
        Reply::Failure {
            error_code: code.into(),
            message: message.into(),
            details,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success { .. })
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            Reply::Failure { error_code, .. } => Some(error_code),
            Reply::Success { .. } => None,
        }
    }
}

impl From<CallError> for Reply {
    fn from(err: CallError) -> Self {
        Reply::failure(err.code(), err.to_string(), err.details())
    }
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        Reply::failure(err.code(), err.to_string(), err.details())
    }
}

impl<E: Into<Reply>> From<Result<Value, E>> for Reply {
    fn from(result: Result<Value, E>) -> Self {
        match result {
            Ok(value) => Reply::success(value),
            Err(err) => err.into(),
        }
    }
}
