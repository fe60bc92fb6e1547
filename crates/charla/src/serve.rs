// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `charla serve` command implementation.
//!
//! Opens storage, registers the built-in catalog-menu flow, and runs
//! the webhook gateway until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use charla_config::model::CharlaConfig;
use charla_core::CharlaError;
use charla_flow::{Catalog, MenuFlow};
use charla_gateway::{AppState, AutoCloseSettings, CloudApiFactory};
use charla_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Flow key the built-in catalog-menu bot registers under. Tenants
/// select it through their integration row.
const CATALOG_MENU_FLOW: &str = "catalog_menu";

pub async fn run_serve(config: CharlaConfig) -> Result<(), CharlaError> {
    init_tracing(&config.agent.log_level);
    info!("starting charla serve");

    if let Some(parent) = std::path::Path::new(&config.storage.database_path).parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CharlaError::Config(format!("cannot create data directory: {e}")))?;
    }
    let db = Database::open(&config.storage.database_path).await?;

    let state = Arc::new(AppState::new(
        db.clone(),
        Arc::new(CloudApiFactory),
        AutoCloseSettings {
            idle: Duration::from_secs(config.autoclose.idle_hours * 3600),
            farewell_template: config.autoclose.farewell_template.clone(),
            template_languages: config.autoclose.template_languages.clone(),
        },
    ));
    state.flows.register(
        CATALOG_MENU_FLOW,
        Arc::new(MenuFlow::new(Catalog::motorcycle_dealership())),
    );

    let app = charla_gateway::router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CharlaError::Config(format!("failed to bind {addr}: {e}")))?;
    info!(addr, "webhook gateway listening");

    let shutdown = install_signal_handler();
    axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move { shutdown.cancelled().await }
        })
        .await
        .map_err(|e| CharlaError::Internal(format!("gateway server error: {e}")))?;

    db.close().await?;
    info!("charla serve shutdown complete");
    Ok(())
}

/// Cancel the returned token on SIGINT or SIGTERM.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT, initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(_) => {
                    let _ = ctrl_c.await;
                    info!("received SIGINT, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received SIGINT, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("charla={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
