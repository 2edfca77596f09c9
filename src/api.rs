//! HTTP API for reverse lookups.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use geo::Point;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::pip::{BoundaryMode, ReverseService};

/// Largest accepted `radius` for nearby scans, in degrees
pub const MAX_NEARBY_RADIUS: f64 = 1.0;

/// Application state shared across handlers
pub struct AppState {
    pub service: ReverseService,
    pub nearby_radius: f64,
}

impl AppState {
    pub fn new(service: ReverseService, nearby_radius: f64) -> Self {
        Self {
            service,
            nearby_radius,
        }
    }
}

/// API errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse {
            error: message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/reverse", get(reverse_handler))
        .route("/nearby", get(nearby_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Check a coordinate pair and turn it into a point
pub fn validate_point(lng: f64, lat: f64) -> Result<Point<f64>, ApiError> {
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(ApiError::BadRequest(format!(
            "lng must be between -180 and 180, got {}",
            lng
        )));
    }
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ApiError::BadRequest(format!(
            "lat must be between -90 and 90, got {}",
            lat
        )));
    }
    Ok(Point::new(lng, lat))
}

/// Accepts `true`/`false`/`1`/`0` (and an empty value as true, for `?debug`)
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean flag: {}",
            other
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct ReverseQueryParams {
    pub lng: f64,
    pub lat: f64,
    /// Return boundaries instead of plain records
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub debug: bool,
    /// With `debug`, return every matched boundary instead of the best one
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub debug_full: bool,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQueryParams {
    pub lng: f64,
    pub lat: f64,
    /// Half-width of the scanned box in degrees
    pub radius: Option<f64>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    localities: usize,
    areas: usize,
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        localities: state.service.catalog().len(),
        areas: state.service.store().len(),
    })
}

/// Reverse lookup: ranked localities, or their boundaries in debug mode
async fn reverse_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReverseQueryParams>,
) -> Result<Response, ApiError> {
    let point = validate_point(params.lng, params.lat)?;

    let response = match BoundaryMode::from_flags(params.debug, params.debug_full) {
        BoundaryMode::Metadata => Json(state.service.resolve(point)).into_response(),
        mode => Json(state.service.project(point, mode)).into_response(),
    };

    Ok(response)
}

/// Localities whose bbox is near the point
async fn nearby_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyQueryParams>,
) -> Result<Response, ApiError> {
    let point = validate_point(params.lng, params.lat)?;

    let radius = params.radius.unwrap_or(state.nearby_radius);
    if !radius.is_finite() || !(0.0..=MAX_NEARBY_RADIUS).contains(&radius) {
        return Err(ApiError::BadRequest(format!(
            "radius must be between 0 and {}, got {}",
            MAX_NEARBY_RADIUS, radius
        )));
    }

    Ok(Json(state.service.nearby(point, radius)).into_response())
}
