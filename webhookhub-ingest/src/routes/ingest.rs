use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use webhookhub_common::errors::{AppError, AppResult};
use webhookhub_common::types::ApiResponse;
use webhookhub_domain::job::DeliveryJob;

use crate::services::ingest_service::{self, IngestOutcome};
use crate::AppState;

const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Debug, Deserialize)]
pub struct IngestQuery {
    #[serde(rename = "type")]
    pub event_type: String,
}

#[derive(Debug, serde::Serialize)]
pub struct IngestResponse {
    pub event_id: Uuid,
    pub deliveries_scheduled: usize,
}

/// `POST /ingest/:source_name` — the whole of C4 (spec §4.2). Extracts the
/// raw body so the signature is verified over exact bytes, runs the
/// transactional ingest-and-fan-out, then publishes one job per new
/// delivery only after that transaction has committed.
pub async fn ingest(
    State(state): State<AppState>,
    Path(source_name): Path<String>,
    Query(query): Query<IngestQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<(StatusCode, Json<ApiResponse<IngestResponse>>)> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("missing X-Signature header"))?
        .to_string();

    let correlation_id = Uuid::new_v4().to_string();

    let db = state.db.clone();
    let source_name_owned = source_name.clone();
    let event_type = query.event_type.clone();
    let body_vec = body.to_vec();
    let correlation_id_for_task = correlation_id.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        ingest_service::ingest_and_fan_out(
            &db,
            &source_name_owned,
            &event_type,
            &body_vec,
            &signature,
            &correlation_id_for_task,
        )
    })
    .await
    .map_err(|e| AppError::internal(format!("ingest task panicked: {e}")))??;

    match outcome {
        IngestOutcome::Duplicate => {
            tracing::info!(source = %source_name, correlation_id = %correlation_id, "duplicate event ignored");
            Ok((
                StatusCode::ACCEPTED,
                Json(ApiResponse::ok(IngestResponse {
                    event_id: Uuid::nil(),
                    deliveries_scheduled: 0,
                })),
            ))
        }
        IngestOutcome::New { event, deliveries } => {
            for ingested in &deliveries {
                let job = DeliveryJob::first_attempt(
                    ingested.delivery.id,
                    event.id,
                    ingested.target_url.clone(),
                    String::from_utf8_lossy(&event.payload_json).to_string(),
                );

                if let Err(e) = state.broker.publish_delivery_job(&job).await {
                    // The Delivery row is already durably PENDING; this leaves
                    // it stuck until an operator intervenes (spec §4.2/§9).
                    tracing::error!(
                        delivery_id = %ingested.delivery.id,
                        error = %e,
                        "failed to publish delivery job after commit"
                    );
                    return Err(AppError::internal(
                        "event ingested but one or more delivery jobs failed to publish",
                    ));
                }
            }

            tracing::info!(
                event_id = %event.id,
                source = %source_name,
                correlation_id = %correlation_id,
                deliveries = deliveries.len(),
                "event ingested"
            );

            Ok((
                StatusCode::ACCEPTED,
                Json(ApiResponse::ok(IngestResponse {
                    event_id: event.id,
                    deliveries_scheduled: deliveries.len(),
                })),
            ))
        }
    }
}
