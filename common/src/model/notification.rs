use crate::jobs::TaskState;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A status change pushed to live listeners, one per WebSocket text frame.
///
/// `result` is an opaque payload: `{"message": ...}` for `STARTED`, the task
/// result for `SUCCESS` and `{"error": ...}` for `FAILURE`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub status: TaskState,
    pub task_id: String,
    pub result: Option<Value>,
}

impl NotificationEvent {
    pub fn new(task_id: impl Into<String>, status: TaskState) -> Self {
        Self {
            status,
            task_id: task_id.into(),
            result: None,
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }
}
