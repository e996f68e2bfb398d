use crate::db::SqliteStore;
use actix_web::{web, HttpResponse, Responder};

pub(crate) async fn process(store: web::Data<SqliteStore>) -> impl Responder {
    let store = store.get_ref().clone();
    match web::block(move || store.seed_demo()).await {
        Ok(Ok(summary)) => HttpResponse::Created().json(summary),
        Ok(Err(e)) => HttpResponse::ServiceUnavailable().body(format!("Error seeding database: {}", e)),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
