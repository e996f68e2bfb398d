//! Task lifecycle types shared between the worker, the status endpoint and
//! WebSocket listeners.

use serde::{Deserialize, Serialize};

/// Lifecycle of one CSV aggregation task.
///
/// Transitions only move forward: `Pending -> Started -> Success | Failure`.
/// Serialized in upper case (`"STARTED"`) because that is what clients match on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Started,
    Success,
    Failure,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure)
    }

    /// Position in the lifecycle; a task may only move to a strictly higher rank.
    pub fn rank(self) -> u8 {
        match self {
            TaskState::Pending => 0,
            TaskState::Started => 1,
            TaskState::Success | TaskState::Failure => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Started => "STARTED",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
        }
    }
}

/// Stored return value of a successful task.
///
/// Either a summary of created rows with a preview of the codes, or a plain
/// message when the upload held no codes at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub created: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codes_preview: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobResult {
    pub const NO_CODES_MESSAGE: &'static str = "No stock_code values present.";

    pub fn no_codes() -> Self {
        Self {
            created: 0,
            codes_preview: None,
            message: Some(Self::NO_CODES_MESSAGE.to_string()),
        }
    }

    pub fn created(created: usize, codes_preview: Vec<String>) -> Self {
        Self {
            created,
            codes_preview: Some(codes_preview),
            message: None,
        }
    }
}

/// Response body of `GET /tasks/{task_id}/`. `error` is only set for
/// `FAILURE` and `result` only for `SUCCESS`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub status: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}
