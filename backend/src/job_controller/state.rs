//! Result backend for background CSV aggregation tasks.
//!
//! `JobsState` is cloned into the Actix app data and into the dispatcher.
//! Status changes are not written directly: workers push `JobUpdate`
//! messages on `tx`, and `start_job_updater` applies them one at a time.
//! Updates that would move a task backwards, or out of a terminal state, are
//! ignored. Finished records are dropped by `start_retention_sweeper` once
//! they are older than the configured TTL, after which the id reads as
//! `PENDING` again.

use common::jobs::{JobResult, TaskState, TaskStatusResponse};
use log::{debug, info};
use std::time::{Duration, Instant};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

/// Last known state of one task.
#[derive(Clone, Debug)]
pub struct TaskRecord {
    pub status: TaskState,
    pub result: Option<JobResult>,
    pub error: Option<String>,
    /// Set when the task reaches SUCCESS or FAILURE.
    pub finished_at: Option<Instant>,
}

impl TaskRecord {
    pub fn pending() -> Self {
        Self {
            status: TaskState::Pending,
            result: None,
            error: None,
            finished_at: None,
        }
    }
}

#[derive(Clone)]
pub struct JobsState {
    /// Task id to its latest record. Read by the status endpoint, written by
    /// the dispatcher (on enqueue) and by `start_job_updater`.
    pub jobs: Arc<RwLock<HashMap<String, TaskRecord>>>,

    /// Sender side of the update channel consumed by `start_job_updater`.
    pub tx: mpsc::Sender<JobUpdate>,
}

/// A status change reported by a worker.
#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) task_id: String,
    pub(crate) status: TaskState,
    pub(crate) result: Option<JobResult>,
    pub(crate) error: Option<String>,
}

impl JobUpdate {
    pub fn started(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            status: TaskState::Started,
            result: None,
            error: None,
        }
    }

    pub fn success(task_id: &str, result: JobResult) -> Self {
        Self {
            task_id: task_id.to_string(),
            status: TaskState::Success,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(task_id: &str, error: String) -> Self {
        Self {
            task_id: task_id.to_string(),
            status: TaskState::Failure,
            result: None,
            error: Some(error),
        }
    }
}

impl JobsState {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(buffer);
        let state = Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        (state, rx)
    }

    pub async fn register(&self, task_id: &str) {
        self.jobs
            .write()
            .await
            .entry(task_id.to_string())
            .or_insert_with(TaskRecord::pending);
    }

    /// Applies `update` unless it would not move the task forward.
    pub async fn apply(&self, update: JobUpdate) {
        let mut jobs = self.jobs.write().await;
        let record = jobs
            .entry(update.task_id.clone())
            .or_insert_with(TaskRecord::pending);

        if update.status.rank() <= record.status.rank() {
            debug!(
                "Ignoring {} for task {} already in {}",
                update.status.as_str(),
                update.task_id,
                record.status.as_str()
            );
            return;
        }

        record.status = update.status;
        record.result = update.result;
        record.error = update.error;
        if update.status.is_terminal() {
            record.finished_at = Some(Instant::now());
        }
    }

    /// Drops finished records older than `ttl`. Returns how many were removed.
    pub async fn purge_finished(&self, ttl: Duration) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, record| {
            record
                .finished_at
                .is_none_or(|finished| finished.elapsed() < ttl)
        });
        before - jobs.len()
    }

    /// Status lookup behind `GET /tasks/{task_id}/`.
    ///
    /// Ids that were never enqueued are reported as `PENDING`, exactly like a
    /// task waiting for a worker; callers cannot tell the two apart.
    pub async fn status(&self, task_id: &str) -> TaskStatusResponse {
        let jobs = self.jobs.read().await;
        match jobs.get(task_id) {
            Some(record) => TaskStatusResponse {
                task_id: task_id.to_string(),
                status: record.status,
                error: match record.status {
                    TaskState::Failure => record.error.clone(),
                    _ => None,
                },
                result: match record.status {
                    TaskState::Success => record.result.clone(),
                    _ => None,
                },
            },
            None => TaskStatusResponse {
                task_id: task_id.to_string(),
                status: TaskState::Pending,
                error: None,
                result: None,
            },
        }
    }
}

/// Long-running task draining the update channel into `JobsState`.
///
/// Spawned once from `main.rs`; ends when every sender is dropped.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        state.apply(update).await;
    }
}

/// Periodically expires finished task records so the map does not grow with
/// every upload.
pub async fn start_retention_sweeper(state: JobsState, ttl: Duration, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let removed = state.purge_finished(ttl).await;
        if removed > 0 {
            info!("Expired {} finished task records", removed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn unknown_ids_look_pending() {
        let (state, _rx) = JobsState::new(4);
        let status = state.status("never-enqueued").await;
        assert_eq!(status.status, TaskState::Pending);
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn terminal_states_are_final() {
        let (state, _rx) = JobsState::new(4);
        state.register("t1").await;
        state.apply(JobUpdate::started("t1")).await;
        state
            .apply(JobUpdate::success("t1", JobResult::no_codes()))
            .await;
        state
            .apply(JobUpdate::failure("t1", "late failure".to_string()))
            .await;
        state.apply(JobUpdate::started("t1")).await;

        let status = state.status("t1").await;
        assert_eq!(status.status, TaskState::Success);
        assert!(status.error.is_none());
        assert_eq!(status.result, Some(JobResult::no_codes()));
    }

    #[tokio::test]
    async fn failure_exposes_error_message() {
        let (state, rx) = JobsState::new(4);
        let updater = tokio::spawn(start_job_updater(state.clone(), rx));

        state.tx.send(JobUpdate::started("t2")).await.unwrap();
        state
            .tx
            .send(JobUpdate::failure(
                "t2",
                "CSV must include 'stock_code' column.".to_string(),
            ))
            .await
            .unwrap();

        let mut status = state.status("t2").await;
        for _ in 0..100 {
            if status.status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            status = state.status("t2").await;
        }
        updater.abort();

        assert_eq!(status.status, TaskState::Failure);
        assert_eq!(
            status.error.as_deref(),
            Some("CSV must include 'stock_code' column.")
        );
    }

    #[tokio::test]
    async fn only_expired_finished_records_are_purged() {
        let (state, _rx) = JobsState::new(4);
        state.register("queued").await;
        state.apply(JobUpdate::started("running")).await;
        state
            .apply(JobUpdate::success("done", JobResult::no_codes()))
            .await;
        state
            .apply(JobUpdate::failure("failed", "boom".to_string()))
            .await;

        assert_eq!(state.purge_finished(Duration::from_secs(3600)).await, 0);
        assert_eq!(state.purge_finished(Duration::ZERO).await, 2);

        let jobs = state.jobs.read().await;
        assert!(jobs.contains_key("queued"));
        assert!(jobs.contains_key("running"));
        assert!(!jobs.contains_key("done"));
        drop(jobs);
        assert_eq!(state.status("done").await.status, TaskState::Pending);
    }

    #[tokio::test]
    async fn sweeper_expires_finished_records() {
        let (state, _rx) = JobsState::new(4);
        state
            .apply(JobUpdate::failure("old", "boom".to_string()))
            .await;
        let sweeper = tokio::spawn(start_retention_sweeper(
            state.clone(),
            Duration::ZERO,
            Duration::from_millis(5),
        ));

        for _ in 0..100 {
            if state.jobs.read().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        sweeper.abort();
        assert!(state.jobs.read().await.is_empty());
    }

    #[tokio::test]
    async fn register_does_not_reset_progress() {
        let (state, _rx) = JobsState::new(4);
        state.apply(JobUpdate::started("t3")).await;
        state.register("t3").await;
        assert_eq!(state.status("t3").await.status, TaskState::Started);
    }
}
