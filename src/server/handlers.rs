use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::location::resolver::validate_query;
use crate::location::types::{ambiguous_message, MSG_FOUND};
use crate::location::{GeocodingSource, LocationError, RawPlace};

use super::state::AppState;

const MSG_BODY_REQUIRED: &str = "Location name is required";
const MSG_PARAM_REQUIRED: &str = "Location query parameter is required";

// ─── Response body ───────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct LocationValidationResponse {
    pub success: bool,
    pub query: String,
    pub results: Vec<RawPlace>,
    pub exact_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LocationValidationResponse {
    fn failure(query: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            query: query.to_string(),
            results: Vec::new(),
            exact_match: false,
            message: Some(message.into()),
        }
    }
}

fn respond(status: StatusCode, body: LocationValidationResponse) -> Response {
    (status, Json(body)).into_response()
}

// ─── POST /api/location ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct LocationBody {
    #[serde(default)]
    pub location: Option<serde_json::Value>,
}

pub async fn validate_post<S: GeocodingSource>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<LocationBody>, JsonRejection>,
) -> Response {
    let location = body
        .ok()
        .and_then(|Json(b)| b.location)
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|s| !s.is_empty());

    match location {
        Some(location) => validate(&state, "POST", &location).await,
        None => respond(
            StatusCode::BAD_REQUEST,
            LocationValidationResponse::failure("", MSG_BODY_REQUIRED),
        ),
    }
}

// ─── GET /api/location?location= ─────────────────────────────────

#[derive(Deserialize)]
pub struct LocationParams {
    pub location: Option<String>,
}

pub async fn validate_get<S: GeocodingSource>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<LocationParams>,
) -> Response {
    match params.location.filter(|s| !s.is_empty()) {
        Some(location) => validate(&state, "GET", &location).await,
        None => respond(
            StatusCode::BAD_REQUEST,
            LocationValidationResponse::failure("", MSG_PARAM_REQUIRED),
        ),
    }
}

// ─── GET /health ─────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

// ─── Helpers ─────────────────────────────────────────────────────

async fn validate<S: GeocodingSource>(state: &AppState<S>, method: &str, location: &str) -> Response {
    let start = Instant::now();

    let query = match validate_query(location) {
        Ok(q) => q,
        Err(e) => {
            return respond(
                StatusCode::BAD_REQUEST,
                LocationValidationResponse::failure(location.trim(), e.user_message()),
            );
        }
    };

    let (status, body) = match state.resolver.lookup(query).await {
        Ok(lookup) => {
            let message = if lookup.exact_match {
                MSG_FOUND.to_string()
            } else {
                ambiguous_message(&lookup.query, lookup.results.len())
            };
            let body = LocationValidationResponse {
                success: true,
                query: lookup.query,
                exact_match: lookup.exact_match,
                results: lookup.results,
                message: Some(message),
            };
            (StatusCode::OK, body)
        }
        Err(e @ LocationError::NotFound(_)) => {
            (StatusCode::OK, LocationValidationResponse::failure(query, e.user_message()))
        }
        Err(e @ LocationError::Validation(_)) => (
            StatusCode::BAD_REQUEST,
            LocationValidationResponse::failure(query, e.user_message()),
        ),
        Err(e) => {
            warn!(query, error = %e, "location validation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                LocationValidationResponse::failure(query, e.user_message()),
            )
        }
    };

    info!(
        "{} /api/location?location={} -> {} ({} results, {:.1}ms)",
        method,
        query,
        status.as_u16(),
        body.results.len(),
        start.elapsed().as_secs_f64() * 1000.0,
    );

    respond(status, body)
}
