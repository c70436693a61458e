use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Extension, Query},
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    infrastructure::state::AppState,
    services::{
        errors::ServiceError,
        installation::{InstallStatus, InstallationService},
    },
};

/// OAuth install endpoints, mounted at the root so the redirect URI stays short.
pub fn router() -> Router {
    Router::new()
        .route("/auth", get(begin_install))
        .route("/auth/callback", get(complete_install))
}

pub fn status_router() -> Router {
    Router::new().route("/status", get(install_status))
}

#[derive(Debug, Deserialize)]
struct BeginInstallQuery {
    shop: Option<String>,
}

async fn begin_install(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<BeginInstallQuery>,
) -> Result<Redirect, ServiceError> {
    let service = InstallationService::new(state);
    let url = service.begin(query.shop.as_deref())?;
    Ok(Redirect::to(url.as_str()))
}

async fn complete_install(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let service = InstallationService::new(state);
    let token = service.complete(params).await?;
    Ok(Json(serde_json::json!({
        "installed": true,
        "shop": token.shop,
        "scope": token.scope,
    })))
}

async fn install_status(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<InstallStatus>, ServiceError> {
    let service = InstallationService::new(state);
    Ok(Json(service.status().await?))
}
