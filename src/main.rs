use std::net::SocketAddr;
use std::sync::Arc;

use axum::{serve, Extension};
use customization_relay::{
    api,
    infrastructure::{config::Config, state::AppState, token_store},
    telemetry,
};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    telemetry::init();
    let config = Arc::new(Config::from_env()?);
    let tokens = token_store::build_token_store(&config.token)?;
    let state = Arc::new(AppState::new(Arc::clone(&config), Arc::clone(&tokens))?);

    match tokens.load().await {
        Ok(Some(token)) if token.shop == config.shopify.shop => {
            info!(shop = %token.shop, scope = %token.scope, "access token loaded");
        }
        Ok(_) => {
            info!(
                install_url = %format!("{}/auth", config.app.public_url.trim_end_matches('/')),
                "app not installed yet; visit the install url to authorize"
            );
        }
        Err(err) => warn!(error = ?err, "failed to read stored access token"),
    }

    let router = api::build_router(Arc::clone(&config)).layer(Extension(Arc::clone(&state)));

    let addr: SocketAddr = config.bind_address().parse()?;
    info!(%addr, shop = %config.shopify.shop, "starting customization relay");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server = serve(listener, router.into_make_service());

    tokio::select! {
        res = server => {
            if let Err(err) = res {
                warn!(error = ?err, "server exited with error");
            }
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = ?err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = ?err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
