//! # harvest-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the environment;
//! see [`harvest_api::AppConfig::from_env`].

use std::sync::Arc;

use anyhow::Context;
use harvest_api::db::PgRecordStore;
use harvest_api::{AppConfig, AppState};
use harvest_ledger::{EvmLedger, EvmLedgerConfig, LedgerClient};
use harvest_registry::{BatchRegistry, FileRecordStore, MemoryRecordStore, RecordStore};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    metrics::describe_counter!(
        "harvest_verifications_total",
        "Verifications performed, by outcome"
    );
    metrics::describe_counter!(
        "harvest_anchor_failures_total",
        "Ledger registrations that failed"
    );
    metrics::describe_counter!("harvest_http_requests_total", "HTTP requests served");
    metrics::describe_histogram!(
        "harvest_http_request_duration_seconds",
        "HTTP request latency"
    );
    Ok(handle)
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    if let Some(url) = &config.database_url {
        let pool = harvest_api::db::init_pool(url)
            .await
            .context("database initialization failed")?;
        return Ok(Arc::new(PgRecordStore::new(pool)));
    }
    if let Some(dir) = &config.data_dir {
        let store = FileRecordStore::open(dir.clone())
            .await
            .with_context(|| format!("cannot open data directory {}", dir.display()))?;
        tracing::info!(dir = %dir.display(), "using file record store");
        return Ok(Arc::new(store));
    }
    tracing::warn!(
        "neither DATABASE_URL nor HARVEST_DATA_DIR set; running in-memory only. \
         Batches will not survive restarts."
    );
    Ok(Arc::new(MemoryRecordStore::new()))
}

fn open_ledger(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn LedgerClient>>> {
    let Some(settings) = &config.ledger else {
        return Ok(None);
    };
    let mut evm = EvmLedgerConfig::new(
        settings.rpc_url.clone(),
        settings.contract.clone(),
        settings.from.clone(),
        settings.network.clone(),
    );
    if let Some(secs) = settings.timeout_secs {
        evm = evm.with_timeout_secs(secs);
    }
    let ledger: Arc<dyn LedgerClient> =
        Arc::new(EvmLedger::new(evm).context("failed to build ledger client")?);
    tracing::info!(
        network = %settings.network,
        contract = %settings.contract,
        "ledger client configured"
    );
    Ok(Some(ledger))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_json = std::env::var("HARVEST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    init_tracing(log_json);
    let config = AppConfig::from_env()?;

    match (&config.admin_token, config.allow_open_admin) {
        (Some(_), _) => {}
        (None, true) => tracing::warn!(
            "HARVEST_ADMIN_TOKEN not set and HARVEST_ALLOW_OPEN_ADMIN=true; admin routes are open"
        ),
        (None, false) => tracing::warn!("HARVEST_ADMIN_TOKEN not set; admin routes will answer 503"),
    }

    let store = open_store(&config).await?;
    let ledger = open_ledger(&config)?;
    let registry = BatchRegistry::new(store, ledger);

    let mut state = AppState::new(registry, config.clone());
    if config.metrics_enabled {
        state = state.with_metrics(init_metrics()?);
    }

    let app = harvest_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Harvest Seal API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
