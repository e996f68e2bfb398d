//! Execution of one CSV aggregation task.
//!
//! A run always emits exactly one `STARTED` event followed by exactly one
//! terminal event (`SUCCESS` or `FAILURE`) on `task:<id>`; the terminal event
//! is also sent to the `results` channel. Errors are reported and then
//! returned, never swallowed, so the dispatcher records them as well.

use super::state::JobUpdate;
use crate::error::{JobError, Result};
use crate::notifications::{task_channel, NotificationHub, RESULTS_CHANNEL};
use crate::services::aggregation::{Aggregator, LineItemStore, ResultStore};
use crate::services::data_sources::csv::parse::parse_stock_codes;
use common::jobs::{JobResult, TaskState};
use common::model::notification::NotificationEvent;
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct JobRunner {
    media_root: PathBuf,
    line_items: Arc<dyn LineItemStore + Send + Sync>,
    results: Arc<dyn ResultStore + Send + Sync>,
    hub: NotificationHub,
    updates: mpsc::Sender<JobUpdate>,
}

impl JobRunner {
    pub fn new(
        media_root: PathBuf,
        line_items: Arc<dyn LineItemStore + Send + Sync>,
        results: Arc<dyn ResultStore + Send + Sync>,
        hub: NotificationHub,
        updates: mpsc::Sender<JobUpdate>,
    ) -> Self {
        Self {
            media_root,
            line_items,
            results,
            hub,
            updates,
        }
    }

    /// Runs the task on the current thread. Must be called from a blocking
    /// context (`spawn_blocking`), never directly on the async runtime.
    pub fn run(&self, task_id: &str, source_path: &str) -> Result<JobResult> {
        info!("Task {} started for {}", task_id, source_path);
        self.hub.publish(
            &task_channel(task_id),
            &NotificationEvent::new(task_id, TaskState::Started)
                .with_result(json!({ "message": "Processing started" })),
        );
        if self.updates.blocking_send(JobUpdate::started(task_id)).is_err() {
            warn!("Job updater is gone; STARTED for task {} not recorded", task_id);
        }

        let outcome = self.process(source_path).and_then(|result| {
            let payload = success_payload(&result)?;
            Ok((result, payload))
        });
        match outcome {
            Ok((result, payload)) => {
                info!("Task {} succeeded, {} rows created", task_id, result.created);
                self.publish_terminal(task_id, TaskState::Success, payload);
                Ok(result)
            }
            Err(err) => {
                error!("Task {} failed: {}", task_id, err);
                self.publish_terminal(task_id, TaskState::Failure, err.failure_payload());
                Err(err)
            }
        }
    }

    /// Terminal notification for a run that died without reporting one.
    pub fn report_failure(&self, task_id: &str, message: &str) {
        self.publish_terminal(
            task_id,
            TaskState::Failure,
            json!({ "error": message, "kind": "TASK_PANICKED" }),
        );
    }

    fn process(&self, source_path: &str) -> Result<JobResult> {
        let path = self.resolve(source_path)?;
        let file = File::open(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => JobError::SourceNotFound { path: path.clone() },
            _ => err.into(),
        })?;

        let codes = parse_stock_codes(BufReader::new(file))?;
        debug!("{} distinct stock codes in {}", codes.len(), source_path);
        if codes.is_empty() {
            return Ok(JobResult::no_codes());
        }

        let summary = Aggregator::new(self.line_items.as_ref(), self.results.as_ref())
            .aggregate(&codes, source_path)?;
        Ok(JobResult::created(summary.created, summary.codes_preview))
    }

    /// Joins `source_path` onto the media root. Absolute paths and `..` are
    /// rejected so a task can only read uploads.
    fn resolve(&self, source_path: &str) -> Result<PathBuf> {
        let relative = Path::new(source_path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if source_path.is_empty() || escapes {
            return Err(JobError::Validation(format!(
                "source path must be relative to the media root: {source_path}"
            )));
        }

        let path = self.media_root.join(relative);
        if !path.is_file() {
            return Err(JobError::SourceNotFound { path });
        }
        Ok(path)
    }

    fn publish_terminal(&self, task_id: &str, status: TaskState, payload: Value) {
        let event = NotificationEvent::new(task_id, status).with_result(payload);
        self.hub.publish(&task_channel(task_id), &event);
        self.hub.publish(RESULTS_CHANNEL, &event);
    }
}

/// `SUCCESS` payload. An encoding failure is reported as a failed task
/// rather than a success without a result.
fn success_payload(result: &JobResult) -> Result<Value> {
    serde_json::to_value(result)
        .map_err(|e| JobError::Validation(format!("could not encode task result: {e}")))
}
