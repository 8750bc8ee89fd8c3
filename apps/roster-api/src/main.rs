//! Rostra roster reconciliation service.
//!
//! Serves the ingestion API over Axum and, when the `kafka` feature is
//! enabled and brokers are configured, runs the bridge consumer in-process.

mod config;
mod logging;

use std::sync::Arc;

use config::Config;
use tokio::signal;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

use rostra_api_ingest::{ingest_router, IngestState};
use rostra_reconcile::{ReconcileConfig, RosterService};
use rostra_store::DocumentStore;

#[tokio::main]
async fn main() {
    // Fail fast on missing required configuration.
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        "Starting rostra"
    );

    let store = build_store(&config).await;
    let service = Arc::new(RosterService::new(store, ReconcileConfig::from_env()));

    let app = ingest_router(IngestState::new(
        service.clone(),
        config.ingestion_token.clone(),
    ))
    .layer(TraceLayer::new_for_http());

    // Consumers and sweep tasks watch this channel; flipping it is step one
    // of shutdown, before the listener drains.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    #[cfg(feature = "kafka")]
    let consumer_handle = spawn_bridge(shutdown_rx.clone());
    drop(shutdown_rx);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr()).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {e}", config.bind_addr());
            std::process::exit(1);
        }
    };
    info!(addr = %config.bind_addr(), "Listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    // Consumers saw the shutdown signal before the listener closed; wait for
    // them to drain their batches through the normal delivery path.
    #[cfg(feature = "kafka")]
    if let Some(handle) = consumer_handle {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(30), handle).await;
    }

    service.shutdown();
    info!("Server shutdown complete");
}

/// Pick the store backend: Postgres when configured and compiled in,
/// in-memory otherwise.
async fn build_store(config: &Config) -> Arc<dyn DocumentStore> {
    #[cfg(feature = "postgres")]
    if let Some(database_url) = &config.database_url {
        match rostra_store::PgDocStore::connect(database_url).await {
            Ok(store) => {
                if let Err(e) = store.ensure_schema().await {
                    eprintln!("FATAL: store schema setup failed: {e}");
                    std::process::exit(1);
                }
                info!("Postgres document store connected");
                return Arc::new(store);
            }
            Err(e) => {
                eprintln!("Failed to connect to database: {e}");
                std::process::exit(1);
            }
        }
    }

    if config.database_url.is_some() {
        tracing::warn!(
            "DATABASE_URL is set but this build lacks the `postgres` feature; using the in-memory store"
        );
    } else {
        info!("Using the in-memory document store");
    }
    Arc::new(rostra_store::MemoryStore::new())
}

/// Start the Kafka bridge when brokers and a delivery target are configured.
#[cfg(feature = "kafka")]
fn spawn_bridge(shutdown: watch::Receiver<bool>) -> Option<tokio::task::JoinHandle<()>> {
    use rostra_bridge::{
        BridgeConfig, BridgeConsumer, HttpForwarder, KafkaSourceConfig, UpsertBatcher,
    };

    if std::env::var("KAFKA_BROKERS").is_err() {
        info!("KAFKA_BROKERS not set; bridge consumer disabled");
        return None;
    }

    let bridge_config = match BridgeConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("FATAL: bridge configuration: {e}");
            std::process::exit(1);
        }
    };
    let kafka_config = match KafkaSourceConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("FATAL: kafka configuration: {e}");
            std::process::exit(1);
        }
    };

    let forwarder = match HttpForwarder::new(&bridge_config) {
        Ok(f) => Arc::new(f),
        Err(e) => {
            eprintln!("FATAL: bridge HTTP client: {e}");
            std::process::exit(1);
        }
    };
    let batcher = Arc::new(UpsertBatcher::new(bridge_config, forwarder.clone()));
    let _sweeper = batcher.spawn_sweeper(shutdown.clone());

    let consumer = match BridgeConsumer::new(&kafka_config, batcher, forwarder) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("FATAL: kafka consumer: {e}");
            std::process::exit(1);
        }
    };

    Some(tokio::spawn(consumer.run(shutdown)))
}

/// Graceful shutdown signal handler.
///
/// Flips the shutdown watch before returning so consumers stop pulling and
/// start flushing while Axum drains connections.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }

    let _ = shutdown_tx.send(true);
}
