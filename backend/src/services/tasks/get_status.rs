use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse, Responder};
use uuid::Uuid;

/// `GET /tasks/{task_id}/`. Ids that are not UUIDs never match the route
/// (`404`); well-formed ids that were never queued come back as `PENDING`.
pub(crate) async fn process(task_id: web::Path<Uuid>, state: web::Data<JobsState>) -> impl Responder {
    HttpResponse::Ok().json(state.status(&task_id.into_inner().to_string()).await)
}
