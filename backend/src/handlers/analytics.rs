//! Popular manga handler

use actix_web::{HttpResponse, web};

use super::ApiResponse;
use crate::AppState;
use crate::error::AppError;
use crate::models::{LeaderboardPeriod, PopularQuery};

/// Upper bound on the number of leaderboard rows per request
const MAX_POPULAR_LIMIT: i64 = 100;

/// GET /v1/manga/popular
///
/// Query Parameters:
/// - period: all, day, week or month. Unknown values read the all-time board.
/// - limit: Maximum number of results. Default: 10, Max: 100
pub async fn get_popular_manga(
    state: web::Data<AppState>,
    query: web::Query<PopularQuery>,
) -> Result<HttpResponse, AppError> {
    let period = query
        .period
        .as_deref()
        .map(LeaderboardPeriod::parse_lossy)
        .unwrap_or_default();
    let limit = query.limit.map(|limit| limit.min(MAX_POPULAR_LIMIT));

    let popular = state.manga.popular(period, limit).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(popular)))
}

/// Configure analytics routes
pub fn configure_analytics_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/manga/popular").route(web::get().to(get_popular_manga)));
}
