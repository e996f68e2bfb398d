//! WebSocket push of task status events.
//!
//! - `/ws/tasks/{task_id}/`: `STARTED` and the terminal event of one task.
//! - `/ws/results/`: the terminal event of every task.
//!
//! Each event is sent as one JSON text frame
//! `{"status": ..., "task_id": ..., "result": ...}`. Nothing is replayed, so
//! a client connecting after a task finished should poll `/tasks/{id}/`.

use actix_web::web::{get, scope};
use actix_web::Scope;

mod session;

const API_PATH: &str = "/ws";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/tasks/{task_id}/", get().to(session::task_updates))
        .route("/results/", get().to(session::result_updates))
}
