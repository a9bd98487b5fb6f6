//! API server entry point.

use api::config::{Config, LogFormat};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{
    FulfillmentStore, InMemoryKeyValueStore, InMemoryRepository, KeyValueStore,
    PostgresRepository,
};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve<S, K>(config: Config, store: S, kv: K, metrics_handle: PrometheusHandle)
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let state = api::create_state(store, kv, config.fulfillment.clone());
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(
        %addr,
        reservation_mode = %config.fulfillment.reservation_mode,
        "starting API server"
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

/// Serves with the Redis reservation cache when `REDIS_URL` is set.
#[cfg(feature = "redis")]
async fn serve_with_cache<S>(config: Config, store: S, metrics_handle: PrometheusHandle)
where
    S: FulfillmentStore + Clone + 'static,
{
    match config.redis_url.clone() {
        Some(url) => {
            let kv = store::RedisKeyValueStore::new(&url, None)
                .await
                .expect("failed to connect to Redis");
            tracing::info!("using Redis reservation cache");
            serve(config, store, kv, metrics_handle).await;
        }
        None => {
            tracing::info!("using in-memory reservation cache");
            serve(config, store, InMemoryKeyValueStore::new(), metrics_handle).await;
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn serve_with_cache<S>(config: Config, store: S, metrics_handle: PrometheusHandle)
where
    S: FulfillmentStore + Clone + 'static,
{
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL is set but the redis feature is disabled");
    }
    tracing::info!("using in-memory reservation cache");
    serve(config, store, InMemoryKeyValueStore::new(), metrics_handle).await;
}

#[tokio::main]
async fn main() {
    // 1. Load configuration
    let config = Config::from_env().expect("invalid configuration");

    // 2. Initialize tracing
    init_tracing(&config);

    // 3. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 4. Pick the relational store and serve
    match config.database_url.clone() {
        Some(url) => {
            let store = PostgresRepository::connect(&url, 10)
                .await
                .expect("failed to connect to PostgreSQL");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL store");
            serve_with_cache(config, store, metrics_handle).await;
        }
        None => {
            tracing::info!("using in-memory store");
            serve_with_cache(config, InMemoryRepository::new(), metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
