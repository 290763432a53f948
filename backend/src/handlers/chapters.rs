//! Chapter handlers

use actix_web::{HttpResponse, web};

use super::ApiResponse;
use crate::AppState;
use crate::error::AppError;
use crate::models::NewChapter;

/// POST /v1/chapters
pub async fn create_chapter(
    state: web::Data<AppState>,
    body: web::Json<NewChapter>,
) -> Result<HttpResponse, AppError> {
    let chapter = state.chapters.create(&body).await?;
    Ok(HttpResponse::Created().json(ApiResponse::new(chapter)))
}

/// GET /v1/chapters/{id}
///
/// Counts as a view of the chapter and of its manga.
pub async fn get_chapter(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let chapter = state.chapters.view(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(chapter)))
}

/// PUT /v1/chapters/{id}
pub async fn update_chapter(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<NewChapter>,
) -> Result<HttpResponse, AppError> {
    let chapter = state.chapters.update(path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(chapter)))
}

/// DELETE /v1/chapters/{id}
pub async fn delete_chapter(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    state.chapters.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /v1/chapters/{id}/pages
pub async fn list_chapter_pages(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let pages = state.pages.list_by_chapter(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(pages)))
}

/// Configure chapter routes
pub fn configure_chapter_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/chapters").route(web::post().to(create_chapter)))
        .service(
            web::resource("/chapters/{id}")
                .route(web::get().to(get_chapter))
                .route(web::put().to(update_chapter))
                .route(web::delete().to(delete_chapter)),
        )
        .service(web::resource("/chapters/{id}/pages").route(web::get().to(list_chapter_pages)));
}
