use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use webhookhub_common::clients::DbPool;
use webhookhub_common::errors::{AppError, AppResult};
use webhookhub_domain::models::{Delivery, DeliveryStatus, DeliveryStatusUpdate};
use webhookhub_domain::schema::deliveries;
use webhookhub_domain::DeliveryOutcome;

/// What the consumer loop should do with the broker message after the
/// delivery row has been durably updated (spec §4.5 — "write status
/// before ack").
pub enum NextAction {
    /// Terminal: ack, nothing further to publish.
    Done,
    /// Schedule another attempt via the retry queue with this delay.
    ScheduleRetry { delay_ms: u64 },
}

/// Apply one attempt's outcome to its `Delivery` row and decide the next
/// action. This is the durable write the spec requires to land *before*
/// the broker message is acknowledged.
pub fn record_outcome(
    db: &DbPool,
    delivery_id: Uuid,
    attempt: u32,
    outcome: &DeliveryOutcome,
) -> AppResult<NextAction> {
    let mut conn = db
        .get()
        .map_err(|e| AppError::internal(format!("failed to acquire db connection: {e}")))?;

    let delivery: Delivery = deliveries::table.find(delivery_id).first(&mut conn)?;
    let now = Utc::now();

    let (update, next) = match outcome {
        DeliveryOutcome::Success => (
            DeliveryStatusUpdate {
                status: DeliveryStatus::Delivered.as_str().to_string(),
                attempts: attempt as i32,
                last_error: None,
                last_attempt_at: Some(now),
                delivered_at: Some(now),
            },
            NextAction::Done,
        ),
        DeliveryOutcome::Failure {
            message,
            retryable,
            ..
        } => {
            let exhausted = attempt as i32 >= delivery.max_attempts;
            if *retryable && !exhausted {
                (
                    DeliveryStatusUpdate {
                        status: DeliveryStatus::Retrying.as_str().to_string(),
                        attempts: attempt as i32,
                        last_error: Some(message.clone()),
                        last_attempt_at: Some(now),
                        delivered_at: None,
                    },
                    NextAction::ScheduleRetry {
                        delay_ms: webhookhub_domain::backoff::delay_ms(attempt),
                    },
                )
            } else {
                (
                    DeliveryStatusUpdate {
                        status: DeliveryStatus::Dead.as_str().to_string(),
                        attempts: attempt as i32,
                        last_error: Some(message.clone()),
                        last_attempt_at: Some(now),
                        delivered_at: None,
                    },
                    NextAction::Done,
                )
            }
        }
    };

    diesel::update(deliveries::table.find(delivery_id))
        .set(&update)
        .execute(&mut conn)?;

    Ok(next)
}
