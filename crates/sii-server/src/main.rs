mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use sii_api::coordinator::Coordinator;
use sii_api::state::AppStateInner;
use sii_db::Database;
use sii_push::{Dispatcher, HttpPushNotifier, LogNotifier, Notifier};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sii_server=debug,sii_api=debug,sii_db=info,sii_push=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Record store lives for the whole process and is closed on the way out
    let db = Arc::new(Database::open(&config.db_path)?);

    let notifier: Arc<dyn Notifier> = match &config.push_endpoint {
        Some(endpoint) => {
            info!("Push notifications go to {}", endpoint);
            Arc::new(HttpPushNotifier::new(
                endpoint.clone(),
                config.push_server_key.clone(),
                config.push_timeout,
            )?)
        }
        None => {
            info!("SII_PUSH_ENDPOINT not set, notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };
    let dispatcher = Dispatcher::new(notifier);

    let coordinator = Coordinator::new(db.clone(), dispatcher.clone(), config.proximity_delta);
    let app = sii_api::routes::router(Arc::new(AppStateInner { coordinator }));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("App now running on {} (proximity delta {} deg)", addr, config.proximity_delta);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Waiting for {} pending notification(s)", dispatcher.in_flight());
    dispatcher.drain().await;

    // The router, and with it every other handle, is gone once serve returns
    match Arc::try_unwrap(db) {
        Ok(db) => db.close()?,
        Err(_) => info!("Database still referenced at shutdown, leaving it to drop"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
