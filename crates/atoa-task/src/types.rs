//! Task model exchanged between agents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Accepted, not yet picked up.
    Submitted,
    /// Being worked on.
    Working,
    /// Waiting for more input from the requesting agent.
    InputRequired,
    /// Finished successfully.
    Completed,
    /// Canceled before completion.
    Canceled,
    /// Finished unsuccessfully.
    Failed,
}

impl TaskState {
    /// Whether the task can no longer change state on its own.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::InputRequired => "input-required",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessage {
    #[serde(default)]
    pub text: String,
}

/// Current status of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    /// Human-readable detail for the current state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::new(TaskState::Submitted)
    }
}

/// A task as stored by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub message: TaskMessage,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Task {
    /// Create a submitted task.
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            message: TaskMessage { text: text.into() },
            status: TaskStatus::default(),
            metadata: None,
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }
}

/// Event delivered to subscribers of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// The task's status changed (or, on subscription, its current status).
    StatusUpdate {
        #[serde(rename = "taskId")]
        task_id: String,
        status: TaskStatus,
    },
}

impl TaskEvent {
    pub fn status_update(task_id: impl Into<String>, status: TaskStatus) -> Self {
        Self::StatusUpdate {
            task_id: task_id.into(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_wire_names() {
        for state in [
            TaskState::Submitted,
            TaskState::Working,
            TaskState::InputRequired,
            TaskState::Completed,
            TaskState::Canceled,
            TaskState::Failed,
        ] {
            assert_eq!(serde_json::to_value(state).unwrap(), json!(state.as_str()));
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskState::Submitted.is_terminal());
        assert!(!TaskState::Working.is_terminal());
        assert!(!TaskState::InputRequired.is_terminal());
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Canceled.is_terminal());
        assert!(TaskState::Failed.is_terminal());
    }

    #[test]
    fn test_task_json_shape() {
        let task = Task::new("task-123", "session-abc", "Please process this file")
            .with_metadata("priority", json!("high"));

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "task-123",
                "sessionId": "session-abc",
                "message": {"text": "Please process this file"},
                "status": {"state": "submitted"},
                "metadata": {"priority": "high"}
            })
        );
    }

    #[test]
    fn test_event_json_shape() {
        let event = TaskEvent::status_update(
            "task-123",
            TaskStatus::new(TaskState::Working).with_message("halfway"),
        );
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "status_update",
                "taskId": "task-123",
                "status": {"state": "working", "message": "halfway"}
            })
        );
    }
}
