mod handlers;
mod state;

use axum::routing::get;
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::{AppError, Result};
use crate::location::{GeocodingSource, LocationResolver};

pub use handlers::LocationValidationResponse;

pub fn build_router<S: GeocodingSource + 'static>(resolver: LocationResolver<S>) -> Router {
    let state = Arc::new(AppState { resolver });

    Router::new()
        .route(
            "/api/location",
            get(handlers::validate_get::<S>).post(handlers::validate_post::<S>),
        )
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start<S: GeocodingSource + 'static>(
    host: &str,
    port: u16,
    resolver: LocationResolver<S>,
) -> Result<()> {
    let app = build_router(resolver);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| AppError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("placefinder server listening on http://{}", addr);
    info!("Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::format::tests::place;
    use crate::location::resolver::tests::StaticSource;
    use crate::location::types::MSG_UPSTREAM_FAILURE;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn router() -> Router {
        let source = StaticSource::default()
            .with(
                "Springfiel",
                vec![
                    place(1, "Springfield", Some("Illinois"), Some("United States")),
                    place(2, "Springfield", Some("Missouri"), Some("United States")),
                ],
            )
            .with("Tokyo", vec![place(3, "Tokyo", Some("Tokyo"), Some("Japan"))])
            .failing("Paris", 503);
        build_router(LocationResolver::new(source))
    }

    async fn send(req: Request<Body>) -> (StatusCode, Value) {
        let resp = router().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/location")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_post_single_result() {
        let (status, json) = send(post(r#"{"location": "  Tokyo "}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["query"], "Tokyo");
        assert_eq!(json["exact_match"], true);
        assert_eq!(json["message"], "Location found successfully");
        assert_eq!(json["results"][0]["name"], "Tokyo");
        assert_eq!(json["results"][0]["feature_code"], "PPL");
    }

    #[tokio::test]
    async fn test_get_ambiguous() {
        let (status, json) = send(get("/api/location?location=Springfiel")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["exact_match"], false);
        assert_eq!(json["results"].as_array().unwrap().len(), 2);
        assert_eq!(
            json["message"],
            "Found 2 possible locations for \"Springfiel\". Please select the correct one."
        );
    }

    #[tokio::test]
    async fn test_not_found_is_200() {
        let (status, json) = send(get("/api/location?location=xx")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("\"xx\""));
        assert!(json["results"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_errors_are_400() {
        let (status, json) = send(post(r#"{"location": " a "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Location name must be at least 2 characters long");
        assert_eq!(json["query"], "a");

        let (status, json) = send(post(r#"{"location": 42}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Location name is required");

        let (status, _) = send(post("not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = send(get("/api/location")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Location query parameter is required");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500_without_detail() {
        let (status, json) = send(post(r#"{"location": "Paris"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], MSG_UPSTREAM_FAILURE);
        assert!(!json.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_health() {
        let resp = router().oneshot(get("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
