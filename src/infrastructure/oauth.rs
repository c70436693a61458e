use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;
use url::Url;

use crate::{
    domain::models::StoredToken,
    infrastructure::{config::Config, state::AppState},
    services::errors::ServiceError,
};

type HmacSha256 = Hmac<Sha256>;

pub const NONCE_TTL: Duration = Duration::from_secs(10 * 60);

/// Signs callback query parameters the way the platform does: every pair except
/// `hmac` and `signature`, sorted by key, joined as `k=v` with `&`.
pub fn sign_query(
    secret: &str,
    params: &HashMap<String, String>,
) -> Result<String, hmac::digest::InvalidLength> {
    let sorted: BTreeMap<&str, &str> = params
        .iter()
        .filter(|(key, _)| key.as_str() != "hmac" && key.as_str() != "signature")
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    let message = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_query(secret: &str, params: &HashMap<String, String>) -> bool {
    let Some(provided) = params.get("hmac") else {
        return false;
    };
    let Ok(expected) = sign_query(secret, params) else {
        return false;
    };
    let provided = provided.to_ascii_lowercase();
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

pub fn authorize_url(config: &Config, state: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!(
        "https://{}/admin/oauth/authorize",
        config.shopify.shop
    ))?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.shopify.api_key)
        .append_pair("scope", &config.shopify.scopes)
        .append_pair("redirect_uri", &config.redirect_uri())
        .append_pair("state", state);
    Ok(url)
}

/// Single-use state values handed out by the install redirect.
#[derive(Default)]
pub struct InstallNonces {
    issued: Mutex<HashMap<String, Instant>>,
}

impl InstallNonces {
    pub fn issue(&self) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let now = Instant::now();
        let mut issued = self.issued.lock();
        issued.retain(|_, at| now.duration_since(*at) < NONCE_TTL);
        issued.insert(nonce.clone(), now);
        nonce
    }

    /// Removes the nonce; true only when it was issued and has not expired.
    pub fn consume(&self, nonce: &str) -> bool {
        match self.issued.lock().remove(nonce) {
            Some(at) => at.elapsed() < NONCE_TTL,
            None => false,
        }
    }

    #[cfg(test)]
    fn backdate(&self, nonce: &str, age: Duration) {
        if let Some(at) = self.issued.lock().get_mut(nonce) {
            if let Some(earlier) = at.checked_sub(age) {
                *at = earlier;
            }
        }
    }
}

/// Resolves the stored access token; rejects with 503 until the app is installed.
#[derive(Clone, Debug)]
pub struct InstalledShop(pub StoredToken);

#[async_trait]
impl FromRequestParts<()> for InstalledShop {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &()) -> Result<Self, Self::Rejection> {
        let Some(state) = parts.extensions.get::<Arc<AppState>>() else {
            return Err(ServiceError::Internal("missing application state".into()));
        };

        match state.tokens.load().await {
            Ok(Some(token)) if token.shop == state.config.shopify.shop => Ok(InstalledShop(token)),
            Ok(Some(token)) => {
                warn!(stored_shop = %token.shop, "stored token belongs to a different shop");
                Err(ServiceError::NotInstalled)
            }
            Ok(None) => Err(ServiceError::NotInstalled),
            Err(err) => {
                warn!(error = ?err, "failed to load access token");
                Err(ServiceError::Internal("failed to load access token".into()))
            }
        }
    }
}
