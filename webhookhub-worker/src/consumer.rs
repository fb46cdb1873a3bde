use futures_util::StreamExt;
use lapin::options::{BasicAckOptions, BasicNackOptions};
use tokio::sync::watch;
use uuid::Uuid;

use webhookhub_common::clients::{BrokerClient, DbPool};
use webhookhub_domain::job::DeliveryJob;

use crate::delivery_client::DeliveryClient;
use crate::services::delivery_service::{self, NextAction};

/// Consume `QUEUE_DELIVERIES` with manual ack (spec §4.5). The durable
/// status write always lands before the ack: a crash between the two
/// simply redelivers the message and re-runs the attempt.
///
/// `shutdown` is only polled between messages, never while one is being
/// handled — a signal on it stops the loop from picking up new work but
/// lets whichever message is already in flight finish its dispatch,
/// durable write, and ack (spec §5's ordered shutdown).
pub async fn run(
    db: DbPool,
    broker: BrokerClient,
    prefetch: u16,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let client = DeliveryClient::new();
    let mut consumer = broker.consume_deliveries("webhookhub-worker", prefetch).await?;

    loop {
        let delivery_result = tokio::select! {
            biased;
            _ = shutdown.changed() => {
                tracing::info!("shutdown signal received, no longer accepting new deliveries");
                break;
            }
            next = consumer.next() => match next {
                Some(result) => result,
                None => break,
            },
        };

        let amqp_delivery = match delivery_result {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(error = %e, "error receiving from deliveries queue");
                continue;
            }
        };

        let job: DeliveryJob = match serde_json::from_slice(&amqp_delivery.data) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(error = %e, "poison message on deliveries queue, discarding");
                nack_without_requeue(&amqp_delivery).await;
                continue;
            }
        };

        match handle_job(&db, &broker, &client, &job).await {
            Ok(()) => {
                if let Err(e) = amqp_delivery.ack(BasicAckOptions::default()).await {
                    tracing::error!(
                        delivery_id = %job.delivery_id,
                        error = %e,
                        "failed to ack delivery job after durable status write"
                    );
                }
            }
            Err(e) => {
                tracing::error!(
                    delivery_id = %job.delivery_id,
                    error = %e,
                    "failed to process delivery job, discarding without requeue"
                );
                nack_without_requeue(&amqp_delivery).await;
            }
        }
    }

    Ok(())
}

async fn nack_without_requeue(delivery: &lapin::message::Delivery) {
    if let Err(e) = delivery
        .nack(BasicNackOptions {
            requeue: false,
            ..Default::default()
        })
        .await
    {
        tracing::error!(error = %e, "failed to nack message");
    }
}

/// One attempt: dispatch, write the durable outcome, and republish to the
/// retry queue if the outcome calls for another attempt. Any `Err` here
/// means the broker message was *not* durably resolved and should not be
/// acked (spec §4.5, §9 — "the worker must never ack before the write").
async fn handle_job(
    db: &DbPool,
    broker: &BrokerClient,
    client: &DeliveryClient,
    job: &DeliveryJob,
) -> anyhow::Result<()> {
    let delivery_id: Uuid = job.delivery_id.parse()?;

    let outcome = client.deliver(&job.target_url, &job.payload_json).await;

    let next = delivery_service::record_outcome(db, delivery_id, job.attempt, &outcome)?;

    if let NextAction::ScheduleRetry { delay_ms } = next {
        let retry_job = job.next_attempt();
        broker.publish_retry(&retry_job, delay_ms).await?;
    }

    Ok(())
}
