use axum::extract::State;
use axum::Json;
use diesel::prelude::*;

use webhookhub_common::types::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
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

    let response = HealthResponse::healthy("webhookhub-ingest", VERSION)
        .with_checks(vec![db_check, broker_check]);
    Json(response)
}

pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}
