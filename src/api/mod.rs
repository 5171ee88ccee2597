//! misslog REST API
//!
//! HTTP API layer over the miss log, built with Axum.
//!
//! # Endpoints
//!
//! ## Miss log
//! - `GET /api/v1/404` - List misses, flat or grouped
//! - `POST /api/v1/404` - Delete by group values, by filter, or everything
//! - `POST /api/v1/bulk/404/delete` - Delete by ids and group values
//! - `DELETE /api/v1/404/:id` - Delete one miss
//! - `POST /api/v1/404/log` - Record a miss
//!
//! ## Export
//! - `GET /api/v1/404/export` - Export as CSV or JSON
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use misslog::api::{serve, ApiConfig, AppState};
//! use misslog::store::{LogStore, StoreConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(LogStore::open(&StoreConfig::new("./data"))?);
//!     let config = ApiConfig::default();
//!
//!     let state = AppState::new(store, config.clone());
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_size;

    let api_routes = Router::new()
        // Miss log routes
        .route(
            "/404",
            get(routes::misses::list_misses).post(routes::misses::delete_misses),
        )
        .route("/404/log", post(routes::misses::record_miss))
        .route("/404/:id", delete(routes::misses::delete_miss))
        .route("/bulk/404/delete", post(routes::misses::bulk_delete))
        // Export routes
        .route("/404/export", get(routes::export::export_misses))
        .layer(DefaultBodyLimit::max(body_limit));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("misslog API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("misslog API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LogStore, NewMissEvent, StoreConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tempfile::tempdir;
    use tower::util::ServiceExt;

    fn create_test_app() -> (Router, Arc<LogStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = Arc::new(LogStore::open(&StoreConfig::new(dir.path())).unwrap());
        let state = AppState::new(Arc::clone(&store), ApiConfig::default());
        let router = build_router(state);

        (router, store, dir)
    }

    /// ids 1..=6: /missing x3 (ip 10.0.0.1, 10.0.0.2, none),
    /// /missing/deeper x2 (10.0.0.1), foo.html x1 (10.0.0.2)
    fn seed(store: &LogStore) {
        let rows = [
            ("/missing", Some("10.0.0.1")),
            ("/missing", Some("10.0.0.2")),
            ("/missing", None),
            ("/missing/deeper", Some("10.0.0.1")),
            ("/missing/deeper", Some("10.0.0.1")),
            ("foo.html", Some("10.0.0.2")),
        ];
        for (url, ip) in rows {
            let mut event = NewMissEvent::new(url);
            if let Some(ip) = ip {
                event = event.ip(ip);
            }
            store.insert(event).unwrap();
        }
    }

    async fn get(app: &Router, uri: &str) -> Response {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_json(app: &Router, uri: &str, body: &str) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn urls(json: &Value) -> Vec<String> {
        json["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["url"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _store, _dir) = create_test_app();
        let response = get(&app, "/health/live").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready() {
        let (app, _store, _dir) = create_test_app();
        let response = get(&app, "/health/ready").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let (app, store, _dir) = create_test_app();
        seed(&store);

        let response = get(&app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["events"], 6);
    }

    #[tokio::test]
    async fn test_record_miss() {
        let (app, store, _dir) = create_test_app();

        let response = post_json(
            &app,
            "/api/v1/404/log",
            r#"{"url": "/gone", "ip": "192.0.2.1", "agent": "curl/8.0"}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let json = json_body(response).await;
        assert_eq!(json["url"], "/gone");
        assert_eq!(json["user_agent"], "curl/8.0");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_miss_empty_url() {
        let (app, _store, _dir) = create_test_app();

        let response = post_json(&app, "/api/v1/404/log", r#"{"url": ""}"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_list_flat_paged() {
        let (app, store, _dir) = create_test_app();
        seed(&store);

        let response = get(&app, "/api/v1/404?per_page=4&page=2&orderby=id&direction=asc").await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["total"], 6);
        assert_eq!(json["page"], 2);
        assert_eq!(json["items"][0]["id"], 5);
        assert_eq!(json["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_url_exact_filter() {
        let (app, store, _dir) = create_test_app();
        seed(&store);

        let response = get(&app, "/api/v1/404?filterBy%5Burl-exact%5D=%2Fmissing").await;
        let json = json_body(response).await;

        assert_eq!(json["total"], 3);
        assert!(urls(&json).iter().all(|url| url == "/missing"));
    }

    #[tokio::test]
    async fn test_list_grouped_by_ip() {
        let (app, store, _dir) = create_test_app();
        seed(&store);

        let response = get(&app, "/api/v1/404?groupBy=ip").await;
        let json = json_body(response).await;

        assert_eq!(json["group_by"], "ip");
        assert_eq!(json["total"], 3);

        let items = json["items"].as_array().unwrap();
        let sum: u64 = items.iter().map(|g| g["count"].as_u64().unwrap()).sum();
        assert_eq!(sum, 6);
        assert!(items
            .iter()
            .any(|g| g["group_key"] == "" && g["count"] == 1));
    }

    #[tokio::test]
    async fn test_list_rejects_array_filter() {
        let (app, _store, _dir) = create_test_app();

        let response = get(&app, "/api/v1/404?filterBy%5Bip%5D%5B%5D=10.0.0.1").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "INVALID_FILTER");
        assert!(json["error"]["message"].as_str().unwrap().contains("ip"));
        assert!(json["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_delete_one_is_idempotent() {
        let (app, store, _dir) = create_test_app();
        seed(&store);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("DELETE")
                        .uri("/api/v1/404/1")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }

        assert_eq!(store.count().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_bulk_delete_mixed_items() {
        let (app, store, _dir) = create_test_app();
        seed(&store);

        let response = post_json(
            &app,
            "/api/v1/bulk/404/delete",
            r#"{"items": "2, foo.html", "per_page": 50}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["total"], 4);
        assert!(!urls(&json).contains(&"foo.html".to_string()));
        assert!(store.get(2).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bulk_delete_requires_items() {
        let (app, _store, _dir) = create_test_app();

        let response = post_json(&app, "/api/v1/bulk/404/delete", r#"{}"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "INVALID_ITEM_LIST");
    }

    #[tokio::test]
    async fn test_collection_delete_by_groups() {
        let (app, store, _dir) = create_test_app();
        seed(&store);

        let response = post_json(
            &app,
            "/api/v1/404",
            r#"{"items": ["10.0.0.1"], "groupBy": "ip", "page": 3}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["page"], 1);
        assert_eq!(json["total"], 2);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_collection_delete_rejects_comma_string() {
        let (app, store, _dir) = create_test_app();
        seed(&store);

        let response = post_json(&app, "/api/v1/404", r#"{"items": "/missing, foo.html"}"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "INVALID_ITEM_LIST");
        assert_eq!(store.count().unwrap(), 6);
    }

    #[tokio::test]
    async fn test_collection_delete_by_filter_drops_filter() {
        let (app, store, _dir) = create_test_app();
        seed(&store);

        let response = post_json(
            &app,
            "/api/v1/404",
            r#"{"filterBy": {"url": "deeper"}}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        // Remaining events are listed without the filter
        let json = json_body(response).await;
        assert_eq!(json["total"], 4);
        assert!(urls(&json).iter().all(|url| !url.contains("deeper")));
    }

    #[tokio::test]
    async fn test_collection_delete_everything() {
        let (app, store, _dir) = create_test_app();
        seed(&store);

        let response = post_json(&app, "/api/v1/404", r#"{}"#).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["total"], 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_collection_delete_rejects_bad_filter() {
        let (app, store, _dir) = create_test_app();
        seed(&store);

        let response = post_json(&app, "/api/v1/404", r#"{"filterBy": {"ip": ["a"]}}"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.count().unwrap(), 6);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let (app, store, _dir) = create_test_app();
        seed(&store);

        let response = get(&app, "/api/v1/404/export?format=csv&filterBy%5Bip%5D=10.0.0.2").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/csv"
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        // header plus ids 2 and 6
        assert_eq!(csv.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_export_unknown_format() {
        let (app, _store, _dir) = create_test_app();

        let response = get(&app, "/api/v1/404/export?format=xml").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
