use axum::{routing::get, Router};

use crate::api::rest::{customization::router as customization_router, install::status_router};

pub mod customization;
pub mod health;
pub mod install;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health::healthcheck))
        .nest("/auth", status_router())
        .merge(customization_router())
}
