use crate::config::AppConfig;
use crate::db::SqliteStore;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use common::model::csv_result::Page;
use common::requests::ResultsQuery;

const MAX_PAGE_SIZE: u32 = 500;

pub(crate) async fn process(
    req: HttpRequest,
    query: web::Query<ResultsQuery>,
    store: web::Data<SqliteStore>,
    config: web::Data<AppConfig>,
) -> impl Responder {
    let query = query.into_inner();
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(config.results_page_size)
        .clamp(1, MAX_PAGE_SIZE);
    let search = query
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let store = store.get_ref().clone();
    let filter = search.clone();
    let listed = web::block(move || store.list_results(filter.as_deref(), page, limit)).await;

    match listed {
        Ok(Ok((count, results))) => {
            let path = req.path();
            let has_next = u64::from(page) * u64::from(limit) < count;
            HttpResponse::Ok().json(Page {
                count,
                next: has_next.then(|| page_link(path, page + 1, limit, search.as_deref())),
                previous: (page > 1).then(|| page_link(path, page - 1, limit, search.as_deref())),
                results,
            })
        }
        Ok(Err(e)) => {
            HttpResponse::ServiceUnavailable().body(format!("Error retrieving results: {}", e))
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

fn page_link(path: &str, page: u32, limit: u32, search: Option<&str>) -> String {
    let mut link = format!("{}?page={}&limit={}", path, page, limit);
    if let Some(search) = search {
        link.push_str("&search=");
        link.push_str(&urlencoding::encode(search));
    }
    link
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_keep_the_search_term_encoded() {
        assert_eq!(
            page_link("/results/", 2, 10, Some("AX 1&2")),
            "/results/?page=2&limit=10&search=AX%201%262"
        );
        assert_eq!(page_link("/results/", 1, 50, None), "/results/?page=1&limit=50");
    }
}
