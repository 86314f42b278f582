//! JSON-RPC surface of the task registry.
//!
//! | Method | Params | Result |
//! |--------|--------|--------|
//! | `tasks/send` | a task (`id`, `sessionId`, `message.text`, `metadata`) | the stored task |
//! | `tasks/get` | `{"id"}` | the task |
//! | `tasks/cancel` | `{"id"}` | the canceled task |
//! | `tasks/sendSubscribe` | `{"taskId"}` | `"subscribed"`, plus a subscription |
//! | `tasks/pushNotification/set` | `{"taskId", "endpoint"}` | the params echoed back |

use crate::error::TaskError;
use crate::service::{TaskService, TaskSubscription};
use crate::types::Task;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response from a task error.
    pub fn failure(id: Option<Value>, err: &TaskError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code: err.code(),
                message: err.rpc_message(),
                data: err.rpc_data().map(Value::String),
            }),
        }
    }
}

/// Outcome of a JSON-RPC call.
#[derive(Debug)]
pub struct RpcReply {
    pub response: JsonRpcResponse,
    /// Status updates for a successful `tasks/sendSubscribe`.
    pub subscription: Option<TaskSubscription>,
}

impl RpcReply {
    fn plain(response: JsonRpcResponse) -> Self {
        Self {
            response,
            subscription: None,
        }
    }
}

#[derive(Deserialize)]
struct TaskIdParams {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeParams {
    task_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushNotificationParams {
    task_id: String,
    endpoint: String,
}

fn params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, TaskError> {
    let params = params.ok_or_else(|| TaskError::InvalidParams("missing params".to_string()))?;
    serde_json::from_value(params).map_err(|e| TaskError::InvalidParams(e.to_string()))
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, TaskError> {
    serde_json::to_value(value).map_err(|e| TaskError::Internal(e.to_string()))
}

impl TaskService {
    /// Process a raw JSON-RPC request and return the serialized response.
    ///
    /// Subscriptions opened through `tasks/sendSubscribe` are dropped; use
    /// [`TaskService::handle_json_rpc`] to keep them.
    pub fn process_json_rpc(&self, request: &[u8]) -> Result<Vec<u8>, TaskError> {
        let reply = self.handle_json_rpc(request);
        serde_json::to_vec(&reply.response).map_err(|e| TaskError::Internal(e.to_string()))
    }

    /// Process a raw JSON-RPC request.
    ///
    /// Every failure, including unparseable input, is reported as a JSON-RPC
    /// error response.
    pub fn handle_json_rpc(&self, request: &[u8]) -> RpcReply {
        let value: Value = match serde_json::from_slice(request) {
            Ok(value) => value,
            Err(e) => {
                return RpcReply::plain(JsonRpcResponse::failure(
                    None,
                    &TaskError::Parse(e.to_string()),
                ));
            }
        };

        let id = value.get("id").cloned().filter(|id| !id.is_null());

        if value.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return RpcReply::plain(JsonRpcResponse::failure(
                id,
                &TaskError::InvalidRequest("jsonrpc must be \"2.0\"".to_string()),
            ));
        }

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return RpcReply::plain(JsonRpcResponse::failure(
                    id,
                    &TaskError::InvalidRequest(e.to_string()),
                ));
            }
        };

        self.handle_request(request)
    }

    /// Dispatch a parsed JSON-RPC request.
    pub fn handle_request(&self, request: JsonRpcRequest) -> RpcReply {
        let id = request.id.clone();
        tracing::debug!(method = %request.method, "task rpc");

        let outcome = match request.method.as_str() {
            "tasks/send" => self.rpc_send(request.params),
            "tasks/get" => self.rpc_get(request.params),
            "tasks/cancel" => self.rpc_cancel(request.params),
            "tasks/sendSubscribe" => self.rpc_subscribe(request.params),
            "tasks/pushNotification/set" => self.rpc_set_push(request.params),
            _ => Err(TaskError::UnsupportedOperation {
                method: request.method.clone(),
            }),
        };

        match outcome {
            Ok((result, subscription)) => RpcReply {
                response: JsonRpcResponse::success(id, result),
                subscription,
            },
            Err(e) => {
                tracing::debug!(method = %request.method, code = e.code(), error = %e, "task rpc failed");
                RpcReply::plain(JsonRpcResponse::failure(id, &e))
            }
        }
    }

    fn rpc_send(&self, raw: Option<Value>) -> Result<(Value, Option<TaskSubscription>), TaskError> {
        let task: Task = params(raw)?;
        let task = self.send_task(task)?;
        Ok((to_result(&task)?, None))
    }

    fn rpc_get(&self, raw: Option<Value>) -> Result<(Value, Option<TaskSubscription>), TaskError> {
        let TaskIdParams { id } = params(raw)?;
        Ok((to_result(&self.get_task(&id)?)?, None))
    }

    fn rpc_cancel(&self, raw: Option<Value>) -> Result<(Value, Option<TaskSubscription>), TaskError> {
        let TaskIdParams { id } = params(raw)?;
        Ok((to_result(&self.cancel_task(&id)?)?, None))
    }

    fn rpc_subscribe(
        &self,
        raw: Option<Value>,
    ) -> Result<(Value, Option<TaskSubscription>), TaskError> {
        let SubscribeParams { task_id } = params(raw)?;
        if task_id.is_empty() {
            return Err(TaskError::InvalidParams("taskId is required".to_string()));
        }
        let subscription = self.subscribe(&task_id);
        Ok((json!("subscribed"), Some(subscription)))
    }

    fn rpc_set_push(
        &self,
        raw: Option<Value>,
    ) -> Result<(Value, Option<TaskSubscription>), TaskError> {
        let PushNotificationParams { task_id, endpoint } = params(raw)?;
        self.set_push_notification(&task_id, &endpoint)?;
        Ok((json!({"taskId": task_id, "endpoint": endpoint}), None))
    }
}
