//! CSV uploads: receiving the file and reading stock codes out of it.
//!
//! - `POST /upload-csv/`: multipart/form-data with a `file` field. The file
//!   is streamed to `<media_root>/csv_uploads/<uuid>.csv`, a background
//!   aggregation task is queued for it, and `202 {"task_id": ...}` is
//!   returned at once. Progress is available from `/tasks/{task_id}/` or
//!   pushed over `/ws/tasks/{task_id}/`.
//! - `parse`: the streaming `stock_code` extractor the worker runs.

use actix_web::web::{post, scope};
use actix_web::Scope;

pub mod parse;
mod upload;

const API_PATH: &str = "/upload-csv";

/// Configures and returns the Actix scope for CSV upload routes.
pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/", post().to(upload::process))
}
