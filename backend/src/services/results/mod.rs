//! Read side of the aggregation output.
//!
//! - `GET /results/?search=&page=&limit=`: newest-first, paginated listing
//!   of stored rows. `search` is a case-insensitive substring of the code.
//! - `POST /results/seed/`: inserts a demo quote so a fresh database has
//!   line items to match against.

use actix_web::web::{get, post, scope};
use actix_web::Scope;

mod list;
mod seed;

const API_PATH: &str = "/results";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/", get().to(list::process))
        .route("/seed/", post().to(seed::process))
}
