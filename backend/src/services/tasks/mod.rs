use actix_web::web::{get, scope};
use actix_web::Scope;

mod get_status;

const API_PATH: &str = "/tasks";

/// Polling endpoint for task status, backed by the in-memory result backend.
pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/{task_id}/", get().to(get_status::process))
}
