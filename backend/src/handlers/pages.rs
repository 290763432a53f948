//! Page handlers
//!
//! Page metadata CRUD and image delivery. Reading the image is what counts
//! as a page view; fetching the metadata does not.

use std::io::ErrorKind;

use actix_web::{HttpResponse, web};

use super::ApiResponse;
use crate::AppState;
use crate::error::AppError;
use crate::models::NewPage;

/// POST /v1/pages
pub async fn create_page(
    state: web::Data<AppState>,
    body: web::Json<NewPage>,
) -> Result<HttpResponse, AppError> {
    let page = state.pages.create(&body).await?;
    Ok(HttpResponse::Created().json(ApiResponse::new(page)))
}

/// GET /v1/pages/{id}
pub async fn get_page(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let page = state.pages.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(page)))
}

/// PUT /v1/pages/{id}
pub async fn update_page(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<NewPage>,
) -> Result<HttpResponse, AppError> {
    let page = state.pages.update(path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(page)))
}

/// DELETE /v1/pages/{id}
pub async fn delete_page(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    state.pages.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /v1/pages/{id}/image
///
/// Streams the stored image and, once the bytes are read, records a view
/// cascading to the chapter and manga. The current page view count is
/// returned in `X-View-Count`.
pub async fn get_page_image(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let page = state.pages.get(path.into_inner()).await?;

    let bytes = tokio::fs::read(&page.image_path).await.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            AppError::NotFound(format!("image file for page {}", page.id))
        } else {
            tracing::error!(page_id = page.id, path = %page.image_path, error = %e, "Failed to read page image");
            AppError::Internal("failed to read page image".to_string())
        }
    })?;

    let content_type = page.content_type();
    let viewed = state.pages.record_view(page).await;

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header(("X-View-Count", viewed.views.to_string()))
        .body(bytes))
}

/// Configure page routes
pub fn configure_page_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/pages").route(web::post().to(create_page)))
        .service(
            web::resource("/pages/{id}")
                .route(web::get().to(get_page))
                .route(web::put().to(update_page))
                .route(web::delete().to(delete_page)),
        )
        .service(web::resource("/pages/{id}/image").route(web::get().to(get_page_image)));
}
