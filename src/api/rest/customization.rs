use std::sync::Arc;

use axum::{
    async_trait,
    extract::{Extension, FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    routing::post,
    Form, Json, Router,
};

use crate::{
    domain::models::CustomizationRequest,
    infrastructure::{oauth::InstalledShop, state::AppState},
    services::{customization::CustomizationService, errors::ServiceError},
};

pub fn router() -> Router {
    Router::new().route("/customization-requests", post(submit_request))
}

/// Request body accepted as JSON (fetch from theme scripts) or as a
/// url-encoded HTML form post.
pub struct Submission(pub CustomizationRequest);

#[async_trait]
impl<S> FromRequest<S> for Submission
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(payload) = Json::<CustomizationRequest>::from_request(req, state)
                .await
                .map_err(|rejection| {
                    if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY {
                        ServiceError::Validation(rejection.body_text())
                    } else {
                        ServiceError::BadRequest(rejection.body_text())
                    }
                })?;
            return Ok(Submission(payload));
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|rejection| ServiceError::BadRequest(rejection.body_text()))?;
            return CustomizationRequest::from_form_pairs(pairs)
                .map(Submission)
                .map_err(|err| ServiceError::Validation(err.to_string()));
        }

        Err(ServiceError::BadRequest(format!(
            "unsupported content type '{content_type}'"
        )))
    }
}

async fn submit_request(
    Extension(state): Extension<Arc<AppState>>,
    InstalledShop(token): InstalledShop,
    Submission(request): Submission,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let service = CustomizationService::new(state);
    let order = service.submit(&token, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "draft_order": order })),
    ))
}
