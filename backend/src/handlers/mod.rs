use actix_web::web;
use serde::Serialize;

pub mod admin;
pub mod analytics;
pub mod chapters;
pub mod health;
pub mod manga;
pub mod pages;

#[cfg(test)]
mod test_support;


#[cfg(test)]
mod chapters_http_tests;



pub use admin::configure_admin_routes;
pub use analytics::configure_analytics_routes;
pub use chapters::configure_chapter_routes;
pub use health::configure_health_routes;
pub use manga::configure_manga_routes;
pub use pages::configure_page_routes;

/// Full route table: `/health` plus the versioned API
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes).service(
        web::scope("/v1")
            // Static paths like /manga/popular must come before /manga/{id}
            .configure(configure_analytics_routes)
            .configure(configure_manga_routes)
            .configure(configure_chapter_routes)
            .configure(configure_page_routes)
            .configure(configure_admin_routes),
    );
}

/// Standard API response wrapper
#[derive(Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    data: T,
    meta: ResponseMeta,
}

#[derive(Serialize)]
struct ResponseMeta {
    request_id: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub(crate) fn new(data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta {
                request_id: uuid::Uuid::new_v4().to_string(),
            },
        }
    }
}
