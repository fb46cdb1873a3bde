mod routes;
mod services;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use webhookhub_common::clients::{db, BrokerClient, DbPool};
use webhookhub_common::middleware::{init_metrics, init_tracing, metrics_middleware};
use webhookhub_config::IngestConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub broker: BrokerClient,
    pub metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("webhookhub-ingest");

    let config = IngestConfig::load()?;
    let pool = db::create_pool(&config.database_url, config.db_pool_size);

    let broker = BrokerClient::connect(&config.rabbitmq_url).await?;
    broker.declare_topology().await?;

    let metrics_handle = init_metrics();

    let state = AppState {
        db: pool,
        broker,
        metrics_handle,
    };

    let app = Router::new()
        .route("/ingest/:source_name", post(routes::ingest::ingest))
        .route("/health", get(routes::health::health))
        .route("/metrics", get(routes::health::metrics))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "webhookhub-ingest listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}

async fn shutdown_signal(state: AppState) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl_c handler");

    tracing::info!("shutdown signal received, closing broker channel");
    if let Err(e) = state.broker.close().await {
        tracing::warn!(error = %e, "error closing broker channel during shutdown");
    }
}
