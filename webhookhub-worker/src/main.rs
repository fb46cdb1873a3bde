mod consumer;
mod delivery_client;
mod services;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use diesel::prelude::*;
use metrics_exporter_prometheus::PrometheusHandle;

use webhookhub_common::clients::{db, BrokerClient, DbPool};
use webhookhub_common::middleware::{init_metrics, init_tracing};
use webhookhub_common::types::{HealthCheck, HealthResponse, HealthStatus};
use webhookhub_config::WorkerConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
struct MetricsState {
    db: DbPool,
    broker: BrokerClient,
    metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("webhookhub-worker");

    let config = WorkerConfig::load()?;
    let pool = db::create_pool(&config.database_url, config.db_pool_size);

    let broker = BrokerClient::connect(&config.rabbitmq_url).await?;
    broker.declare_topology().await?;

    let metrics_handle = init_metrics();
    let metrics_state = MetricsState {
        db: pool.clone(),
        broker: broker.clone(),
        metrics_handle,
    };
    let metrics_server = spawn_metrics_server(config.metrics_port, metrics_state);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    tracing::info!(prefetch = config.prefetch, "starting delivery consumer");
    let consumer_task = tokio::spawn(consumer::run(pool, broker.clone(), config.prefetch, shutdown_rx));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, waiting for in-flight delivery to finish");
    let _ = shutdown_tx.send(true);

    consumer_task
        .await
        .map_err(|e| anyhow::anyhow!("consumer task panicked: {e}"))??;

    tracing::info!("consumer drained, closing broker channel");
    if let Err(e) = broker.close().await {
        tracing::warn!(error = %e, "error closing broker channel during shutdown");
    }

    metrics_server.abort();
    Ok(())
}

async fn worker_health(State(state): State<MetricsState>) -> Json<HealthResponse> {
    let db_check = match state.db.get() {
        Ok(mut conn) => match diesel::sql_query("SELECT 1").execute(&mut conn) {
            Ok(_) => HealthCheck {
                name: "database".to_string(),
                status: HealthStatus::Healthy,
                message: None,
            },
            Err(e) => HealthCheck {
                name: "database".to_string(),
                status: HealthStatus::Unhealthy,
                message: Some(e.to_string()),
            },
        },
        Err(e) => HealthCheck {
            name: "database".to_string(),
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
        },
    };

    let broker_check = if state.broker.is_connected() {
        HealthCheck {
            name: "broker".to_string(),
            status: HealthStatus::Healthy,
            message: None,
        }
    } else {
        HealthCheck {
            name: "broker".to_string(),
            status: HealthStatus::Unhealthy,
            message: Some("channel not connected".to_string()),
        }
    };

    Json(HealthResponse::healthy("webhookhub-worker", VERSION).with_checks(vec![db_check, broker_check]))
}

async fn worker_metrics(State(state): State<MetricsState>) -> String {
    state.metrics_handle.render()
}

fn spawn_metrics_server(port: u16, state: MetricsState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = Router::new()
            .route("/health", get(worker_health))
            .route("/metrics", get(worker_metrics))
            .with_state(state);

        let addr = format!("0.0.0.0:{port}");
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => {
                tracing::info!(addr = %addr, "worker metrics server listening");
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!(error = %e, "metrics server stopped");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to bind metrics server"),
        }
    })
}
