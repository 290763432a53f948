//! Manga handlers
//!
//! HTTP handlers for manga CRUD and the chapter listing of a manga.

use actix_web::{HttpResponse, web};

use super::ApiResponse;
use crate::AppState;
use crate::error::AppError;
use crate::models::NewManga;

/// GET /v1/manga
pub async fn list_manga(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let manga = state.manga.list().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(manga)))
}

/// POST /v1/manga
pub async fn create_manga(
    state: web::Data<AppState>,
    body: web::Json<NewManga>,
) -> Result<HttpResponse, AppError> {
    let manga = state.manga.create(&body).await?;
    Ok(HttpResponse::Created().json(ApiResponse::new(manga)))
}

/// GET /v1/manga/{id}
///
/// Counts as a view of the manga; the response carries the updated count.
pub async fn get_manga(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let manga = state.manga.view(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(manga)))
}

/// PUT /v1/manga/{id}
pub async fn update_manga(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<NewManga>,
) -> Result<HttpResponse, AppError> {
    let manga = state.manga.update(path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(manga)))
}

/// DELETE /v1/manga/{id}
pub async fn delete_manga(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    state.manga.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /v1/manga/{id}/chapters
pub async fn list_manga_chapters(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let chapters = state.chapters.list_by_manga(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(chapters)))
}

/// Configure manga routes
pub fn configure_manga_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/manga")
            .route(web::get().to(list_manga))
            .route(web::post().to(create_manga)),
    )
    .service(
        web::resource("/manga/{id}")
            .route(web::get().to(get_manga))
            .route(web::put().to(update_manga))
            .route(web::delete().to(delete_manga)),
    )
    .service(web::resource("/manga/{id}/chapters").route(web::get().to(list_manga_chapters)));
}
