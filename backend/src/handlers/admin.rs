//! Admin handlers
//!
//! Operator endpoints for the windowed leaderboards, guarded by the
//! `ADMIN_TOKEN` bearer token. Without a configured token every admin
//! request is rejected.

use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, HttpResponse, dev::Payload, web};

use super::ApiResponse;
use crate::AppState;
use crate::error::AppError;
use crate::models::{LeaderboardWindow, WindowStatus};

/// Proof that the request carried the admin bearer token
pub struct AdminToken;

/// Extract the Bearer token from the Authorization header
fn extract_bearer_token(req: &HttpRequest) -> Option<&str> {
    let auth_str = req.headers().get("Authorization")?.to_str().ok()?;

    if auth_str.len() > 7 && auth_str[..7].eq_ignore_ascii_case("Bearer ") {
        Some(&auth_str[7..])
    } else {
        None
    }
}

/// Compare without short-circuiting on the first differing byte
fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn authorize(req: &HttpRequest) -> Result<AdminToken, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state not configured".to_string()))?;

    let expected = state
        .config
        .admin_token
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("admin access is not configured".to_string()))?;

    let presented = extract_bearer_token(req)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

    if tokens_match(presented, expected) {
        Ok(AdminToken)
    } else {
        tracing::debug!("Rejected admin request with invalid token");
        Err(AppError::Unauthorized("invalid admin token".to_string()))
    }
}

impl FromRequest for AdminToken {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authorize(req))
    }
}

fn parse_window(raw: &str) -> Result<LeaderboardWindow, AppError> {
    raw.parse::<LeaderboardWindow>().map_err(AppError::Validation)
}

/// POST /v1/admin/leaderboards/{window}/reset
///
/// Clears the window's leaderboard and starts a fresh window.
pub async fn reset_leaderboard(
    state: web::Data<AppState>,
    path: web::Path<String>,
    _admin: AdminToken,
) -> Result<HttpResponse, AppError> {
    let window = parse_window(&path)?;
    state.analytics.reset_window(window).await?;

    let remaining = state.analytics.window_remaining(window).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(WindowStatus::new(window, remaining))))
}

/// GET /v1/admin/leaderboards/{window}
pub async fn get_leaderboard_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    _admin: AdminToken,
) -> Result<HttpResponse, AppError> {
    let window = parse_window(&path)?;
    let remaining = state.analytics.window_remaining(window).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(WindowStatus::new(window, remaining))))
}

/// Configure admin routes
pub fn configure_admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/leaderboards")
            .route("/{window}", web::get().to(get_leaderboard_status))
            .route("/{window}/reset", web::post().to(reset_leaderboard)),
    );
}
