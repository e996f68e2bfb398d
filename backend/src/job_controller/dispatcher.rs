//! In-process task queue.
//!
//! `enqueue` registers the task as `PENDING` and returns its id straight
//! away. The work itself runs on a spawned Tokio task that waits for one of
//! `workers` permits and then hands the blocking pipeline to
//! `spawn_blocking`, keeping file and database I/O off the async runtime.

use super::runner::JobRunner;
use super::state::{JobUpdate, JobsState};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

#[derive(Clone)]
pub struct TaskDispatcher {
    state: JobsState,
    runner: Arc<JobRunner>,
    permits: Arc<Semaphore>,
}

impl TaskDispatcher {
    pub fn new(state: JobsState, runner: Arc<JobRunner>, workers: usize) -> Self {
        Self {
            state,
            runner,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Queues the CSV at `source_path` (relative to the media root) and
    /// returns the new task id.
    pub async fn enqueue(&self, source_path: String) -> String {
        let task_id = Uuid::new_v4().to_string();
        self.state.register(&task_id).await;
        info!("Queued task {} for {}", task_id, source_path);

        let dispatcher = self.clone();
        let id = task_id.clone();
        tokio::spawn(async move {
            dispatcher.execute(id, source_path).await;
        });

        task_id
    }

    async fn execute(self, task_id: String, source_path: String) {
        let _permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Worker pool closed, task {} not run: {}", task_id, e);
                self.record(JobUpdate::failure(&task_id, e.to_string())).await;
                return;
            }
        };

        let runner = self.runner.clone();
        let id = task_id.clone();
        let handle = tokio::task::spawn_blocking(move || runner.run(&id, &source_path));

        let update = match handle.await {
            Ok(Ok(result)) => JobUpdate::success(&task_id, result),
            Ok(Err(e)) => JobUpdate::failure(&task_id, e.to_string()),
            Err(join_err) => {
                // The runner panicked before it could send a terminal event.
                let message = format!("Task join error: {}", join_err);
                error!("Task {}: {}", task_id, message);
                self.runner.report_failure(&task_id, &message);
                JobUpdate::failure(&task_id, message)
            }
        };
        self.record(update).await;
    }

    async fn record(&self, update: JobUpdate) {
        if let Err(e) = self.state.tx.send(update).await {
            warn!("Job updater stopped, dropping result for task {}", e.0.task_id);
        }
    }
}
