pub mod config;
pub mod oauth;
pub mod shopify;
pub mod state;
pub mod token_store;
