use std::sync::Arc;

use crate::infrastructure::{
    config::Config,
    oauth::InstallNonces,
    shopify::{ShopifyClient, ShopifyError},
    token_store::TokenStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: Arc<dyn TokenStore>,
    pub shopify: ShopifyClient,
    pub nonces: Arc<InstallNonces>,
}

impl AppState {
    pub fn new(config: Arc<Config>, tokens: Arc<dyn TokenStore>) -> Result<Self, ShopifyError> {
        let shopify = ShopifyClient::new(&config)?;
        Ok(Self {
            config,
            tokens,
            shopify,
            nonces: Arc::new(InstallNonces::default()),
        })
    }
}
