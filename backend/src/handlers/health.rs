//! Health check handler

use actix_web::{HttpResponse, web};

use crate::services::{HealthService, HealthStatus};

/// GET /health
///
/// 200 while the database is reachable (a store outage only degrades),
/// 503 otherwise.
pub async fn health_check(health_service: web::Data<HealthService>) -> HttpResponse {
    let health = health_service.check_health().await;
    match health.status {
        HealthStatus::Unhealthy => HttpResponse::ServiceUnavailable().json(health),
        HealthStatus::Healthy | HealthStatus::Degraded => HttpResponse::Ok().json(health),
    }
}

/// Configure health routes
pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
