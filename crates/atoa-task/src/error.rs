//! Error types for the task registry.

use crate::types::TaskState;
use thiserror::Error;

/// JSON-RPC error codes used by the task surface.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const TASK_NOT_FOUND: i32 = -32001;
    pub const TASK_NOT_CANCELABLE: i32 = -32002;
    pub const UNSUPPORTED_OPERATION: i32 = -32004;
}

/// Errors that can occur in the task registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The request body is not JSON.
    #[error("parse error: {0}")]
    Parse(String),

    /// Not a JSON-RPC 2.0 request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Parameters are missing or of the wrong shape.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// No task with this id.
    #[error("Task not found")]
    NotFound { task_id: String },

    /// The task already reached a terminal state.
    #[error("task {task_id} cannot be canceled in state {state}")]
    NotCancelable { task_id: String, state: TaskState },

    /// Method is not part of the task surface.
    #[error("This operation is not supported")]
    UnsupportedOperation { method: String },

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TaskError {
    /// JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => codes::PARSE_ERROR,
            Self::InvalidRequest(_) => codes::INVALID_REQUEST,
            Self::InvalidParams(_) => codes::INVALID_PARAMS,
            Self::NotFound { .. } => codes::TASK_NOT_FOUND,
            Self::NotCancelable { .. } => codes::TASK_NOT_CANCELABLE,
            Self::UnsupportedOperation { .. } => codes::UNSUPPORTED_OPERATION,
            Self::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Message placed in the JSON-RPC error object.
    ///
    /// Standard codes use the JSON-RPC wording; the detail goes into `data`.
    pub fn rpc_message(&self) -> String {
        match self {
            Self::Parse(_) => "Parse error".to_string(),
            Self::InvalidRequest(_) => "Invalid Request".to_string(),
            Self::InvalidParams(_) => "Invalid params".to_string(),
            Self::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }

    /// Extra detail for the JSON-RPC error object, if any.
    pub fn rpc_data(&self) -> Option<String> {
        match self {
            Self::Parse(detail)
            | Self::InvalidRequest(detail)
            | Self::InvalidParams(detail)
            | Self::Internal(detail) => Some(detail.clone()),
            _ => None,
        }
    }
}
