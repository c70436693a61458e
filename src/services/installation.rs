use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::{
    domain::models::StoredToken,
    infrastructure::{
        oauth::{authorize_url, verify_query},
        state::AppState,
    },
};

use super::errors::ServiceError;

#[derive(Debug, Serialize, PartialEq)]
pub struct InstallStatus {
    pub installed: bool,
    pub shop: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obtained_at: Option<chrono::DateTime<Utc>>,
}

pub struct InstallationService {
    pub state: Arc<AppState>,
}

impl InstallationService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Issues a state nonce and returns the platform consent URL.
    pub fn begin(&self, requested_shop: Option<&str>) -> Result<Url, ServiceError> {
        let shop = &self.state.config.shopify.shop;
        if let Some(requested) = requested_shop {
            if requested != shop.as_str() {
                return Err(ServiceError::Forbidden(format!(
                    "shop {requested} is not served by this relay"
                )));
            }
        }

        let nonce = self.state.nonces.issue();
        let url = authorize_url(&self.state.config, &nonce)
            .map_err(|err| ServiceError::Internal(err.to_string()))?;
        info!(%shop, "redirecting to oauth consent");
        Ok(url)
    }

    /// Verifies the signed callback, exchanges the code and persists the token.
    pub async fn complete(
        &self,
        params: HashMap<String, String>,
    ) -> Result<StoredToken, ServiceError> {
        let required = |name: &str| {
            params
                .get(name)
                .filter(|value| !value.is_empty())
                .cloned()
                .ok_or_else(|| ServiceError::BadRequest(format!("missing {name} parameter")))
        };
        required("hmac")?;
        let code = required("code")?;
        let nonce = required("state")?;
        let shop = required("shop")?;

        if !verify_query(&self.state.config.shopify.api_secret, &params) {
            warn!("oauth callback failed hmac verification");
            return Err(ServiceError::Forbidden("hmac verification failed".into()));
        }
        if shop != self.state.config.shopify.shop {
            return Err(ServiceError::Forbidden(format!(
                "shop {shop} is not served by this relay"
            )));
        }
        if !self.state.nonces.consume(&nonce) {
            return Err(ServiceError::Forbidden("unknown or expired state".into()));
        }

        let exchanged = self.state.shopify.exchange_code(&code).await.map_err(|err| {
            warn!(error = %err, "authorization code exchange failed");
            ServiceError::Upstream("authorization code exchange failed".into())
        })?;

        let token = StoredToken {
            shop,
            access_token: exchanged.access_token,
            scope: exchanged.scope,
            obtained_at: Utc::now(),
        };
        self.state
            .tokens
            .save(&token)
            .await
            .map_err(|err| ServiceError::Internal(err.to_string()))?;
        info!(shop = %token.shop, scope = %token.scope, "app installed");
        Ok(token)
    }

    pub async fn status(&self) -> Result<InstallStatus, ServiceError> {
        let stored = self
            .state
            .tokens
            .load()
            .await
            .map_err(|err| ServiceError::Internal(err.to_string()))?
            .filter(|token| token.shop == self.state.config.shopify.shop);

        Ok(InstallStatus {
            installed: stored.is_some(),
            shop: self.state.config.shopify.shop.clone(),
            scope: stored.as_ref().map(|t| t.scope.clone()),
            obtained_at: stored.map(|t| t.obtained_at),
        })
    }
}
