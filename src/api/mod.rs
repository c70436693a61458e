use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use self::rest::router as rest_router;

pub mod rest;

use crate::infrastructure::config::Config;

pub fn build_router(config: Arc<Config>) -> Router {
    Router::new()
        .nest("/api", rest_router())
        .merge(rest::install::router())
        .fallback(not_found)
        .layer(cors_layer(config.as_ref()))
        .layer(TraceLayer::new_for_http())
}

pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "not_found"})),
    )
}

/// Storefront pages post from the shop's own origin(s); an empty list allows any.
fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid cors origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
