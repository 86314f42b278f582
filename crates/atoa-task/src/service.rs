//! The task registry.
//!
//! A [`TaskService`] owns its tasks, subscribers and push endpoints behind a
//! single lock. Create one per server and share it with `Arc`; there is no
//! process-wide instance.
//!
//! Subscribers get a bounded channel. Delivery never blocks the registry: a
//! subscriber whose buffer is full misses the event, and a subscriber whose
//! receiver was dropped is removed on the next delivery or the next
//! subscription, whichever comes first.

use crate::error::TaskError;
use crate::types::{Task, TaskEvent, TaskState, TaskStatus};
use atoa_core::TaskConfig;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Default capacity of a subscriber channel.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 10;

/// Receiving half of a task subscription.
pub type TaskSubscription = mpsc::Receiver<TaskEvent>;

#[derive(Default)]
struct Registry {
    tasks: HashMap<String, Task>,
    subscribers: HashMap<String, Vec<mpsc::Sender<TaskEvent>>>,
    push_endpoints: HashMap<String, String>,
}

impl Registry {
    fn notify(&mut self, task_id: &str, status: &TaskStatus) {
        let Some(senders) = self.subscribers.get_mut(task_id) else {
            return;
        };

        senders.retain(|tx| {
            match tx.try_send(TaskEvent::status_update(task_id, status.clone())) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(task_id, "subscriber buffer full, dropping status update");
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            }
        });

        if senders.is_empty() {
            self.subscribers.remove(task_id);
        }
    }

    /// Drop closed subscribers for every task, and tasks left without any.
    fn prune_closed(&mut self) {
        self.subscribers.retain(|_, senders| {
            senders.retain(|tx| !tx.is_closed());
            !senders.is_empty()
        });
    }
}

/// In-memory task registry.
pub struct TaskService {
    registry: RwLock<Registry>,
    subscriber_buffer: usize,
}

impl Default for TaskService {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskService {
    /// Create an empty registry with the default subscriber buffer.
    pub fn new() -> Self {
        Self::with_subscriber_buffer(DEFAULT_SUBSCRIBER_BUFFER)
    }

    /// Create an empty registry whose subscribers buffer `capacity` events.
    pub fn with_subscriber_buffer(capacity: usize) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            subscriber_buffer: capacity.max(1),
        }
    }

    /// Create an empty registry from configuration.
    pub fn from_config(config: &TaskConfig) -> Self {
        Self::with_subscriber_buffer(config.subscriber_buffer)
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a new task as `submitted` and notify its subscribers.
    ///
    /// A task without an id is assigned a random one. A task with the same
    /// id is replaced.
    pub fn send_task(&self, task: Task) -> Result<Task, TaskError> {
        if task.message.text.is_empty() {
            return Err(TaskError::InvalidParams(
                "message text is required".to_string(),
            ));
        }

        let id = if task.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            task.id
        };
        let task = Task {
            id,
            status: TaskStatus::new(TaskState::Submitted),
            ..task
        };

        let mut registry = self.write();
        registry.tasks.insert(task.id.clone(), task.clone());
        registry.notify(&task.id, &task.status);

        tracing::debug!(task_id = %task.id, session_id = %task.session_id, "task submitted");
        Ok(task)
    }

    /// Subscribe to status updates for a task.
    ///
    /// If the task already exists its current status is delivered first.
    /// Subscribing to an unknown id is allowed; events start once a task
    /// with that id is sent.
    pub fn subscribe(&self, task_id: &str) -> TaskSubscription {
        let (tx, rx) = mpsc::channel(self.subscriber_buffer);

        let mut registry = self.write();
        if let Some(task) = registry.tasks.get(task_id) {
            // fresh channel with capacity >= 1, cannot be full
            let _ = tx.try_send(TaskEvent::status_update(task_id, task.status.clone()));
        }

        registry.prune_closed();
        let senders = registry.subscribers.entry(task_id.to_string()).or_default();
        senders.push(tx);

        tracing::debug!(task_id, subscribers = senders.len(), "task subscription added");
        rx
    }

    /// Number of live subscribers for a task.
    pub fn subscriber_count(&self, task_id: &str) -> usize {
        self.read()
            .subscribers
            .get(task_id)
            .map_or(0, |senders| senders.iter().filter(|tx| !tx.is_closed()).count())
    }

    /// Record the push notification endpoint for a task.
    pub fn set_push_notification(&self, task_id: &str, endpoint: &str) -> Result<(), TaskError> {
        if task_id.is_empty() {
            return Err(TaskError::InvalidParams("taskId is required".to_string()));
        }
        if endpoint.is_empty() {
            return Err(TaskError::InvalidParams("endpoint is required".to_string()));
        }

        self.write()
            .push_endpoints
            .insert(task_id.to_string(), endpoint.to_string());
        Ok(())
    }

    /// Push notification endpoint registered for a task.
    pub fn push_endpoint(&self, task_id: &str) -> Option<String> {
        self.read().push_endpoints.get(task_id).cloned()
    }

    /// Get a task by id.
    pub fn get_task(&self, task_id: &str) -> Result<Task, TaskError> {
        self.read()
            .tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| TaskError::NotFound {
                task_id: task_id.to_string(),
            })
    }

    /// Replace a task's status and notify its subscribers.
    pub fn update_task_status(&self, task_id: &str, status: TaskStatus) -> Result<(), TaskError> {
        let mut registry = self.write();
        let task = registry
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound {
                task_id: task_id.to_string(),
            })?;

        task.status = status.clone();
        registry.notify(task_id, &status);

        tracing::debug!(task_id, state = %status.state, "task status updated");
        Ok(())
    }

    /// Cancel a task that has not reached a terminal state.
    pub fn cancel_task(&self, task_id: &str) -> Result<Task, TaskError> {
        let mut registry = self.write();
        let task = registry
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound {
                task_id: task_id.to_string(),
            })?;

        if task.status.state.is_terminal() {
            return Err(TaskError::NotCancelable {
                task_id: task_id.to_string(),
                state: task.status.state,
            });
        }

        task.status = TaskStatus::new(TaskState::Canceled);
        let task = task.clone();
        registry.notify(task_id, &task.status);

        tracing::debug!(task_id, "task canceled");
        Ok(task)
    }
}
