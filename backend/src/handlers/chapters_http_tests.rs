//! HTTP tests for the chapter endpoints

#[cfg(test)]
mod http_integration_tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::{Value, json};

    use crate::handlers::configure_routes;
    use crate::handlers::test_support::create_test_context;

    #[actix_rt::test]
    async fn test_chapter_listing_reflects_writes() {
        let ctx = create_test_context();
        let app = test::init_service(
            App::new()
                .app_data(ctx.state.clone())
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/v1/manga")
            .set_json(json!({ "title": "Blame!" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let manga_id = body["data"]["id"].as_i64().unwrap();

        // Prime the cached listing while it is still empty
        let req = test::TestRequest::get()
            .uri(&format!("/v1/manga/{manga_id}/chapters"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["data"].as_array().unwrap().is_empty());

        let req = test::TestRequest::post()
            .uri("/v1/chapters")
            .set_json(json!({ "manga_id": manga_id, "number": 1, "title": "Log 1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let chapter_id = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::get()
            .uri(&format!("/v1/manga/{manga_id}/chapters"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::delete()
            .uri(&format!("/v1/chapters/{chapter_id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri(&format!("/v1/manga/{manga_id}/chapters"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_chapter_view_cascades_to_manga() {
        let ctx = create_test_context();
        let app = test::init_service(
            App::new()
                .app_data(ctx.state.clone())
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/v1/manga")
            .set_json(json!({ "title": "Dorohedoro" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let manga_id = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::post()
            .uri("/v1/chapters")
            .set_json(json!({ "manga_id": manga_id, "number": 1, "title": "Hole" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let chapter_id = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::get()
            .uri(&format!("/v1/chapters/{chapter_id}"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["views"], 1);

        // The manga view sees the cascaded chapter view plus its own
        let req = test::TestRequest::get()
            .uri(&format!("/v1/manga/{manga_id}"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["views"], 2);
    }

    #[actix_rt::test]
    async fn test_chapter_errors() {
        let ctx = create_test_context();
        let app = test::init_service(
            App::new()
                .app_data(ctx.state.clone())
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/v1/chapters")
            .set_json(json!({ "manga_id": 404, "number": 1, "title": "Orphan" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/v1/manga")
            .set_json(json!({ "title": "Gantz" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let manga_id = body["data"]["id"].as_i64().unwrap();

        let chapter = json!({ "manga_id": manga_id, "number": 1, "title": "Start" });
        let req = test::TestRequest::post()
            .uri("/v1/chapters")
            .set_json(&chapter)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/v1/chapters")
            .set_json(&chapter)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
