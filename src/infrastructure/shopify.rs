use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    domain::models::{DraftOrder, DraftOrderInput, DraftOrderOutcome, UserError},
    infrastructure::config::Config,
};

pub const DRAFT_ORDER_CREATE: &str = r#"
mutation draftOrderCreate($input: DraftOrderInput!) {
  draftOrderCreate(input: $input) {
    draftOrder {
      id
      name
      invoiceUrl
    }
    userErrors {
      field
      message
    }
  }
}
"#;

#[derive(Debug, Error)]
pub enum ShopifyError {
    #[error("request to shopify failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("shopify rejected the access token ({0})")]
    Unauthorized(StatusCode),
    #[error("shopify responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("graphql errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),
    #[error("graphql response carried no data")]
    MissingData,
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
}

#[derive(Debug, Serialize)]
struct AccessTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftOrderCreateData {
    draft_order_create: Option<DraftOrderCreatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftOrderCreatePayload {
    draft_order: Option<DraftOrder>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Clone)]
pub struct ShopifyClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    api_key: String,
    api_secret: String,
}

impl ShopifyClient {
    pub fn new(config: &Config) -> Result<Self, ShopifyError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("customization-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: config.admin_base_url(),
            api_version: config.shopify.api_version.clone(),
            api_key: config.shopify.api_key.clone(),
            api_secret: config.shopify.api_secret.clone(),
        })
    }

    fn graphql_endpoint(&self) -> String {
        format!("{}/admin/api/{}/graphql.json", self.base_url, self.api_version)
    }

    pub async fn exchange_code(&self, code: &str) -> Result<AccessTokenResponse, ShopifyError> {
        let url = format!("{}/admin/oauth/access_token", self.base_url);
        let response = self
            .http
            .post(url)
            .json(&AccessTokenRequest {
                client_id: &self.api_key,
                client_secret: &self.api_secret,
                code,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Status { status, body });
        }

        let token = response.json::<AccessTokenResponse>().await?;
        info!(scope = %token.scope, "exchanged authorization code for access token");
        Ok(token)
    }

    pub async fn graphql<T: DeserializeOwned>(
        &self,
        access_token: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, ShopifyError> {
        let response = self
            .http
            .post(self.graphql_endpoint())
            .header("X-Shopify-Access-Token", access_token)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ShopifyError::Unauthorized(status));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Status { status, body });
        }

        let envelope = response.json::<GraphQlResponse>().await?;
        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            return Err(ShopifyError::GraphQl(
                errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        let data = envelope.data.ok_or(ShopifyError::MissingData)?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn create_draft_order(
        &self,
        access_token: &str,
        input: &DraftOrderInput,
    ) -> Result<DraftOrderOutcome, ShopifyError> {
        let variables = serde_json::json!({ "input": input });
        let data: DraftOrderCreateData = self
            .graphql(access_token, DRAFT_ORDER_CREATE, variables)
            .await?;
        let payload = data.draft_order_create.ok_or(ShopifyError::MissingData)?;

        if !payload.user_errors.is_empty() {
            debug!(count = payload.user_errors.len(), "draftOrderCreate returned user errors");
            return Ok(DraftOrderOutcome::Rejected(payload.user_errors));
        }

        payload
            .draft_order
            .map(DraftOrderOutcome::Created)
            .ok_or(ShopifyError::MissingData)
    }
}
