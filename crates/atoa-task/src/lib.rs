//! # atoa-task
//!
//! Task registry for agent-to-agent work requests.
//!
//! An agent holding a valid agent token submits tasks to another agent's
//! registry, follows their status through a subscription, and may register a
//! push notification endpoint. The registry is reachable directly through
//! [`TaskService`] or over JSON-RPC through
//! [`TaskService::process_json_rpc`].
//!
//! ## Task Lifecycle
//!
//! ```text
//! submitted ──▶ working ──▶ completed
//!     │            │ ▲
//!     │            ▼ │
//!     │       input-required
//!     │            │
//!     └────────────┴──▶ canceled | failed
//! ```
//!
//! `completed`, `canceled` and `failed` are terminal; a terminal task cannot
//! be canceled.

pub mod error;
pub mod rpc;
pub mod service;
pub mod types;

pub use error::TaskError;
pub use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcReply};
pub use service::{DEFAULT_SUBSCRIBER_BUFFER, TaskService, TaskSubscription};
pub use types::{Task, TaskEvent, TaskMessage, TaskState, TaskStatus};
