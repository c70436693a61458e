use serde::Deserialize;
use std::time::Duration;

use crate::validation::rules::is_valid_shop_domain;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub shopify: ShopifyConfig,
    #[serde(default)]
    pub token: TokenConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Comma separated storefront origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShopifyConfig {
    #[serde(default)]
    pub shop: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default = "default_scopes")]
    pub scopes: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub admin_base_url: Option<String>,
    #[serde(default = "default_draft_order_tag")]
    pub draft_order_tag: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    #[serde(default = "default_token_provider")]
    pub provider: String,
    #[serde(default = "default_token_path")]
    pub path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
            cors_origins: String::new(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self {
            shop: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            scopes: default_scopes(),
            api_version: default_api_version(),
            admin_base_url: None,
            draft_order_tag: default_draft_order_tag(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            provider: default_token_provider(),
            path: default_token_path(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("RELAY").separator("__"));
        let cfg = builder.build()?;
        let config: Config = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let required = [
            (&self.shopify.shop, "RELAY__SHOPIFY__SHOP"),
            (&self.shopify.api_key, "RELAY__SHOPIFY__API_KEY"),
            (&self.shopify.api_secret, "RELAY__SHOPIFY__API_SECRET"),
        ];
        for (value, variable) in required {
            if value.trim().is_empty() {
                return Err(config::ConfigError::Message(format!(
                    "Missing Shopify setting. Set {variable}."
                )));
            }
        }

        if !is_valid_shop_domain(&self.shopify.shop) {
            return Err(config::ConfigError::Message(format!(
                "Invalid shop domain '{}'. Expected <name>.myshopify.com.",
                self.shopify.shop
            )));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.app.request_timeout_seconds)
    }

    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.app.public_url.trim_end_matches('/'))
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.app
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Base URL for Admin API and OAuth calls against the configured shop.
    pub fn admin_base_url(&self) -> String {
        match self.shopify.admin_base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
            _ => format!("https://{}", self.shopify.shop),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_scopes() -> String {
    "write_draft_orders".to_string()
}

fn default_api_version() -> String {
    "2024-10".to_string()
}

fn default_draft_order_tag() -> String {
    "customization-request".to_string()
}

fn default_token_provider() -> String {
    "file".to_string()
}

fn default_token_path() -> String {
    "./data/access_token.json".to_string()
}
