#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::post,
    Extension, Json, Router,
};
use chrono::Utc;
use customization_relay::{
    api,
    domain::models::StoredToken,
    infrastructure::{
        config::{AppConfig, Config, ShopifyConfig, TokenConfig},
        state::AppState,
        token_store::TokenStore,
    },
};
use parking_lot::Mutex;
use serde_json::Value;

pub const SHOP: &str = "atelier.myshopify.com";
pub const API_KEY: &str = "key-test";
pub const API_SECRET: &str = "secret-test";
pub const ACCESS_TOKEN: &str = "shpat_test";
pub const EXCHANGED_TOKEN: &str = "shpat_exchanged";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub access_token: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct FakeShopState {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    graphql_reply: (StatusCode, Value),
}

/// A stand-in for the shop's Admin API bound to an ephemeral local port.
pub struct FakeShop {
    pub base_url: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl FakeShop {
    pub async fn spawn(graphql_status: StatusCode, graphql_body: Value) -> Result<Self> {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = FakeShopState {
            calls: Arc::clone(&calls),
            graphql_reply: (graphql_status, graphql_body),
        };
        let router = Router::new()
            .route("/admin/oauth/access_token", post(access_token))
            .route("/admin/api/:version/graphql.json", post(graphql))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            calls,
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

async fn access_token(State(fake): State<FakeShopState>, Json(body): Json<Value>) -> Json<Value> {
    fake.calls.lock().push(RecordedCall {
        path: "/admin/oauth/access_token".to_string(),
        access_token: None,
        body,
    });
    Json(serde_json::json!({
        "access_token": EXCHANGED_TOKEN,
        "scope": "write_draft_orders"
    }))
}

async fn graphql(
    State(fake): State<FakeShopState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.calls.lock().push(RecordedCall {
        path: "graphql".to_string(),
        access_token: headers
            .get("x-shopify-access-token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    let (status, reply) = fake.graphql_reply.clone();
    (status, Json(reply))
}

pub fn draft_order_created() -> Value {
    serde_json::json!({
        "data": {
            "draftOrderCreate": {
                "draftOrder": {
                    "id": "gid://shopify/DraftOrder/1001",
                    "name": "#D12",
                    "invoiceUrl": "https://atelier.myshopify.com/invoices/abc"
                },
                "userErrors": []
            }
        }
    })
}

pub fn test_config(base_url: &str) -> Config {
    Config {
        app: AppConfig {
            public_url: "https://relay.atelier.com".to_string(),
            cors_origins: "https://atelier.com".to_string(),
            request_timeout_seconds: 5,
            ..AppConfig::default()
        },
        shopify: ShopifyConfig {
            shop: SHOP.to_string(),
            api_key: API_KEY.to_string(),
            api_secret: API_SECRET.to_string(),
            admin_base_url: Some(base_url.to_string()),
            ..ShopifyConfig::default()
        },
        token: TokenConfig {
            provider: "memory".to_string(),
            ..TokenConfig::default()
        },
    }
}

pub fn installed_token() -> StoredToken {
    StoredToken {
        shop: SHOP.to_string(),
        access_token: ACCESS_TOKEN.to_string(),
        scope: "write_draft_orders".to_string(),
        obtained_at: Utc::now(),
    }
}

pub fn build_app(config: Config, tokens: Arc<dyn TokenStore>) -> Result<Router> {
    let config = Arc::new(config);
    let state = Arc::new(AppState::new(Arc::clone(&config), tokens)?);
    Ok(api::build_router(config).layer(Extension(state)))
}

pub async fn json_body(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn json_request(uri: &str, body: Value) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build json request")
}
