use lapin::{
    options::*, types::FieldTable, BasicProperties, Channel, Connection, ConnectionProperties,
    Consumer, ExchangeKind,
};
use serde::Serialize;

/// Main direct exchange deliveries are published to (spec §4.3).
pub const EXCHANGE_MAIN: &str = "webhookhub";
/// Fanout exchange backing the dead-letter queue.
pub const EXCHANGE_DLX: &str = "deliveries.dlx";
/// Queue the worker consumes from.
pub const QUEUE_DELIVERIES: &str = "webhookhub.deliveries";
/// Holding queue with no consumer; messages expire here and are dead-lettered
/// back onto `EXCHANGE_MAIN`, which is the entire backoff mechanism.
pub const QUEUE_RETRY: &str = "deliveries.retry.q";
/// Terminal queue for poison messages and nack-without-requeue.
pub const QUEUE_DLQ: &str = "deliveries.dlq";
/// Routing key binding `EXCHANGE_MAIN` to `QUEUE_DELIVERIES`.
pub const ROUTING_KEY_DELIVERY: &str = "delivery";
/// Safety-net TTL on the main queue (30 minutes).
pub const MAIN_QUEUE_TTL_MS: u64 = 1_800_000;

/// A connected AMQP channel plus the four-resource retry topology of spec
/// §4.3. Declared idempotently by both the ingest process and the worker
/// process on startup; re-declaration with identical arguments is a no-op,
/// divergent arguments surface as a channel-level error from the broker.
#[derive(Clone)]
pub struct BrokerClient {
    channel: Channel,
}

impl BrokerClient {
    pub async fn connect(url: &str) -> Result<Self, lapin::Error> {
        let conn = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;

        tracing::info!(url = %url, "connected to broker");
        Ok(Self { channel })
    }

    /// Declare the main exchange, the DLX, and the three queues, then bind
    /// them per spec §4.3. Safe to call on every process startup.
    pub async fn declare_topology(&self) -> Result<(), lapin::Error> {
        self.channel
            .exchange_declare(
                EXCHANGE_MAIN,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        self.channel
            .exchange_declare(
                EXCHANGE_DLX,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        let mut deliveries_args = FieldTable::default();
        deliveries_args.insert("x-message-ttl".into(), (MAIN_QUEUE_TTL_MS as i64).into());
        deliveries_args.insert("x-dead-letter-exchange".into(), EXCHANGE_DLX.into());
        self.channel
            .queue_declare(
                QUEUE_DELIVERIES,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                deliveries_args,
            )
            .await?;

        let mut retry_args = FieldTable::default();
        retry_args.insert("x-dead-letter-exchange".into(), EXCHANGE_MAIN.into());
        retry_args.insert(
            "x-dead-letter-routing-key".into(),
            ROUTING_KEY_DELIVERY.into(),
        );
        self.channel
            .queue_declare(
                QUEUE_RETRY,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                retry_args,
            )
            .await?;

        self.channel
            .queue_declare(
                QUEUE_DLQ,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        self.channel
            .queue_bind(
                QUEUE_DELIVERIES,
                EXCHANGE_MAIN,
                ROUTING_KEY_DELIVERY,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        self.channel
            .queue_bind(
                QUEUE_DLQ,
                EXCHANGE_DLX,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        tracing::info!("broker topology declared");
        Ok(())
    }

    /// Publish a first-attempt delivery job to the main exchange (spec §4.2
    /// step 5). Always persistent.
    pub async fn publish_delivery_job<T: Serialize>(&self, job: &T) -> Result<(), lapin::Error> {
        self.publish_to(EXCHANGE_MAIN, ROUTING_KEY_DELIVERY, job, BasicProperties::default())
            .await
    }

    /// Publish a retry attempt to the holding queue via the default
    /// exchange, with a per-message expiration equal to the backoff delay.
    /// The queue has no consumer, so the message expires in place and the
    /// broker dead-letters it back onto `EXCHANGE_MAIN` (spec §4.3).
    pub async fn publish_retry<T: Serialize>(
        &self,
        job: &T,
        expiration_ms: u64,
    ) -> Result<(), lapin::Error> {
        let props = BasicProperties::default().with_expiration(expiration_ms.to_string().into());
        self.publish_to("", QUEUE_RETRY, job, props).await
    }

    async fn publish_to<T: Serialize>(
        &self,
        exchange: &str,
        routing_key: &str,
        job: &T,
        props: BasicProperties,
    ) -> Result<(), lapin::Error> {
        let payload = serde_json::to_vec(job).map_err(|e| {
            lapin::Error::IOError(std::sync::Arc::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e,
            )))
        })?;

        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                props
                    .with_content_type("application/json".into())
                    .with_delivery_mode(2),
            )
            .await?
            .await?;

        Ok(())
    }

    /// Subscribe to `QUEUE_DELIVERIES` with manual ack and the given
    /// prefetch bound (spec §4.5).
    pub async fn consume_deliveries(
        &self,
        consumer_tag: &str,
        prefetch: u16,
    ) -> Result<Consumer, lapin::Error> {
        self.channel
            .basic_qos(prefetch, BasicQosOptions::default())
            .await?;

        let consumer = self
            .channel
            .basic_consume(
                QUEUE_DELIVERIES,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        tracing::info!(queue = QUEUE_DELIVERIES, prefetch, "subscribed to deliveries queue");
        Ok(consumer)
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Cheap liveness check for health endpoints (spec §6 — health checks
    /// cover DB pool and broker connectivity on both binaries).
    pub fn is_connected(&self) -> bool {
        self.channel.status().connected()
    }

    /// Close the underlying channel. Part of the ordered shutdown in spec §5.
    pub async fn close(&self) -> Result<(), lapin::Error> {
        self.channel
            .close(200, "shutting down")
            .await
    }
}
