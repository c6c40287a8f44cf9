// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vechain_nodes::api::router;
use vechain_nodes::config::{AppConfig, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV};
use vechain_nodes::indexer::{PollEngine, TriggerConfig};
use vechain_nodes::state::AppState;
use vechain_nodes::storage::{CursorStore, MemoryCursorStore, RedbCursorStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        network = config.network.name,
        node_url = %config.node_url,
        sender_configured = config.sender_key.is_some(),
        trigger = config.trigger.as_ref().map(|t| t.category.as_str()),
        "Configuration loaded"
    );

    let credentials = AppState::credentials_from_config(&config)?;
    let mut state = AppState::new(credentials);

    let shutdown = CancellationToken::new();
    let mut poller_task = None;

    if let Some(settings) = &config.trigger {
        let trigger = TriggerConfig::from_settings(settings)?;
        let store: Arc<dyn CursorStore> = match &config.cursor_db_path {
            Some(path) => Arc::new(RedbCursorStore::open(path, trigger.category.as_str())?),
            None => {
                tracing::warn!("CURSOR_DB_PATH not set, poll cursor will not survive restarts");
                Arc::new(MemoryCursorStore::new())
            }
        };
        let engine = Arc::new(PollEngine::new(state.chain().clone(), store, trigger));
        let runner = engine.clone().run(config.poll_interval, shutdown.clone());
        poller_task = Some(tokio::spawn(runner));
        state = state.with_poller(engine);
    }

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "VeChain nodes listening (docs at /docs)");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(task) = poller_task {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Poll engine task did not exit cleanly");
        }
    }

    Ok(())
}

/// `LOG_FORMAT=json` selects JSON lines, anything else the pretty formatter.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}
