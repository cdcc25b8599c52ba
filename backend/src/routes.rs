use actix_web::{web, HttpResponse};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::{json, Value};

use crate::search::{SearchError, SearchService};

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/images/search").route(web::post().to(search_images)))
        .service(web::resource("/api/health").route(web::get().to(health)));
}

/// An empty body is the empty query.
fn parse_body(body: &[u8]) -> Result<Value, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
}

async fn search_images(service: web::Data<SearchService>, body: web::Bytes) -> HttpResponse {
    let raw = match parse_body(&body) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Rejected search body: {}", e);
            let resp = ErrorResponse {
                error: format!("Invalid JSON body: {}", e),
            };
            return HttpResponse::BadRequest().json(resp);
        }
    };

    match service.search(raw).await {
        Ok(response) => {
            info!("Search returned {} images", response.images.len());
            HttpResponse::Ok().json(response)
        }
        Err(SearchError::InvalidQuery(e)) => {
            warn!("Invalid search query: {}", e);
            HttpResponse::BadRequest().json(ErrorResponse {
                error: e.to_string(),
            })
        }
        Err(SearchError::Retrieval(e)) => {
            error!("Search failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to retrieve images".into(),
            })
        }
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::db::image_store::{MockImageStore, RetrievalError};
    use crate::db::memory_store::MemoryImageStore;
    use actix_web::{http::StatusCode, test, App};
    use std::sync::Arc;

    const CATALOG: &str = r#"[
        {
            "id": "2f0c6b8e-5b0a-4d55-a0b4-7c1b9a3c2e01",
            "owner": "guest",
            "name": "lavender",
            "type": "image/jpeg",
            "url": "https://img/lavender.jpg",
            "thumbnailUrl": "https://img/thumb-lavender.jpg",
            "width": 1200,
            "height": 800,
            "aspectRatio": 1.5,
            "colors": [{"l": 45.0, "a": 30.0, "b": -40.0, "hue": 288.0}],
            "labels": ["flower", "field"]
        },
        {
            "id": "9d3e1f22-1c4b-4f7e-8a60-3b2d5e6f7a02",
            "owner": "guest",
            "name": "harbour",
            "type": "image/png",
            "url": "https://img/harbour.png",
            "thumbnailUrl": "https://img/thumb-harbour.png",
            "width": 640,
            "height": 640,
            "aspectRatio": 1.0,
            "colors": [{"l": 60.0, "a": -5.0, "b": -30.0, "hue": 215.0}],
            "labels": ["sky", "water"]
        }
    ]"#;

    fn memory_service() -> SearchService {
        let store = MemoryImageStore::from_json_str(CATALOG, 25.0).unwrap();
        SearchService::new(Arc::new(store), SearchConfig::default())
    }

    async fn post(service: SearchService, body: &'static str) -> (StatusCode, Value) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service))
                .configure(configure_routes),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/images/search")
            .insert_header(("content-type", "application/json"))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn search_returns_camel_case_images() {
        let (status, body) = post(memory_service(), r#"{"labels": ["SKY"]}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["images"].as_array().unwrap().len(), 1);
        assert_eq!(body["images"][0]["name"], "harbour");
        assert_eq!(body["images"][0]["thumbnailUrl"], "https://img/thumb-harbour.png");
        assert_eq!(body["images"][0]["type"], "image/png");
        assert!(body.get("bothFulfilled").is_none());
    }

    #[actix_web::test]
    async fn priority_adds_both_fulfilled() {
        let (status, body) = post(
            memory_service(),
            r#"{"colors": [290], "labels": ["sky"], "priority": "colors"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bothFulfilled"], false);
        assert_eq!(body["images"][0]["name"], "lavender");
    }

    #[actix_web::test]
    async fn empty_body_lists_everything() {
        let (status, body) = post(memory_service(), "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["images"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn invalid_queries_are_bad_requests() {
        let (status, body) = post(memory_service(), r#"{"priority": "size"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("size"));

        let (status, _) = post(memory_service(), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn retrieval_failures_are_server_errors() {
        let mut store = MockImageStore::new();
        store
            .expect_fetch()
            .returning(|_| Err(RetrievalError::Unreachable("connection reset".to_string())));
        let service = SearchService::new(Arc::new(store), SearchConfig::default());

        let (status, body) = post(service, r#"{"owner": "guest"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to retrieve images");
    }

    #[actix_web::test]
    async fn health_reports_ok() {
        let app = test::init_service(App::new().configure(configure_routes)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"status": "ok"}));
    }
}
