use diesel::prelude::*;
use diesel::OptionalExtension;

use webhookhub_common::clients::DbPool;
use webhookhub_common::errors::{AppError, AppResult};
use webhookhub_domain::idempotency;
use webhookhub_domain::models::{Delivery, NewDelivery, NewEvent};
use webhookhub_domain::schema::{deliveries, destination_rules, destinations, events, sources};
use webhookhub_domain::signature;

pub struct IngestedDelivery {
    pub delivery: Delivery,
    pub target_url: String,
}

pub enum IngestOutcome {
    /// A brand-new event, with one `PENDING` delivery row per matching
    /// active destination rule (spec §4.2 step 4, new path).
    New {
        event: webhookhub_domain::models::Event,
        deliveries: Vec<IngestedDelivery>,
    },
    /// The unique-key guard fired: this event was already ingested. No
    /// deliveries are (re-)created (spec §4.2 step 4, duplicate path).
    Duplicate,
}

/// The ingest pipeline (C4), steps 1-4 of spec §4.2, run inside one
/// REPEATABLE READ transaction. Step 5 (broker publish) deliberately
/// happens *after* this function returns, once the transaction has
/// committed — see `ingest` in `routes::ingest`.
pub fn ingest_and_fan_out(
    db: &DbPool,
    source_name: &str,
    event_type: &str,
    raw_body: &[u8],
    provided_signature: &str,
    correlation_id: &str,
) -> AppResult<IngestOutcome> {
    if event_type.trim().is_empty() {
        return Err(AppError::bad_request("event type must not be blank"));
    }

    let mut conn = db
        .get()
        .map_err(|e| AppError::internal(format!("failed to acquire db connection: {e}")))?;

    let source: webhookhub_domain::models::Source = sources::table
        .filter(sources::name.eq(source_name))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found(format!("unknown source '{source_name}'")))?;

    if !source.active {
        return Err(AppError::unauthorized("source is not active"));
    }

    signature::verify(&source.hmac_secret, raw_body, provided_signature)
        .map_err(|_| AppError::unauthorized("invalid signature"))?;

    let idempotency_key = idempotency::derive(source_name, event_type, raw_body);

    let outcome = conn.build_transaction().repeatable_read().run(
        |conn| -> diesel::result::QueryResult<IngestOutcome> {
            let new_event = NewEvent {
                id: uuid::Uuid::new_v4(),
                source_name: source_name.to_string(),
                event_type: event_type.to_string(),
                idempotency_key: idempotency_key.clone(),
                payload_json: raw_body.to_vec(),
                correlation_id: Some(correlation_id.to_string()),
            };

            let insert_result = diesel::insert_into(events::table)
                .values(&new_event)
                .get_result::<webhookhub_domain::models::Event>(conn);

            let event = match insert_result {
                Ok(event) => event,
                Err(diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                )) => {
                    tracing::info!(
                        source = source_name,
                        idempotency_key = %idempotency_key,
                        "DUPLICATE event, skipping fan-out"
                    );
                    return Ok(IngestOutcome::Duplicate);
                }
                Err(e) => return Err(e),
            };

            let matched_destinations: Vec<webhookhub_domain::models::Destination> =
                destinations::table
                    .inner_join(destination_rules::table)
                    .filter(destinations::active.eq(true))
                    .filter(destination_rules::source_name.eq(source_name))
                    .filter(destination_rules::event_type.eq(event_type))
                    .select((
                        destinations::id,
                        destinations::name,
                        destinations::target_url,
                        destinations::active,
                        destinations::created_at,
                    ))
                    .distinct()
                    .load(conn)?;

            let mut ingested = Vec::with_capacity(matched_destinations.len());
            for destination in matched_destinations {
                let new_delivery = NewDelivery::pending(event.id, destination.id);
                let delivery: Delivery = diesel::insert_into(deliveries::table)
                    .values(&new_delivery)
                    .get_result(conn)?;

                ingested.push(IngestedDelivery {
                    delivery,
                    target_url: destination.target_url,
                });
            }

            Ok(IngestOutcome::New {
                event,
                deliveries: ingested,
            })
        },
    )?;

    Ok(outcome)
}
