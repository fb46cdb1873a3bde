use serde::Deserialize;

/// The options spec §6 calls out as process-wide and required, with no
/// defaults in production. `dotenvy` is still used to load a local `.env`
/// during development — it populates these same env vars, it doesn't
/// substitute for them.
#[derive(Debug, Clone, Deserialize)]
struct BrokerEnv {
    rabbitmq_host: String,
    rabbitmq_port: u16,
    rabbitmq_user: String,
    rabbitmq_password: String,
    rabbitmq_vhost: String,
}

impl BrokerEnv {
    fn load(prefix: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(prefix).separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    fn amqp_url(&self) -> String {
        let vhost = self.rabbitmq_vhost.trim_start_matches('/');
        format!(
            "amqp://{}:{}@{}:{}/{}",
            self.rabbitmq_user, self.rabbitmq_password, self.rabbitmq_host, self.rabbitmq_port, vhost
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DbEnv {
    db_url: String,
    db_user: String,
    db_password: String,
}

impl DbEnv {
    fn load(prefix: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(prefix).separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// `DB_URL` is a `host:port/database` pair; credentials are supplied
    /// separately per spec §6 rather than embedded in the URL.
    fn database_url(&self) -> String {
        format!("postgres://{}:{}@{}", self.db_user, self.db_password, self.db_url)
    }
}

/// Configuration for the ingest process (C4).
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub port: u16,
    pub database_url: String,
    pub rabbitmq_url: String,
    pub db_pool_size: u32,
}

impl IngestConfig {
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let db = DbEnv::load("WEBHOOKHUB")?;
        let broker = BrokerEnv::load("WEBHOOKHUB")?;

        Ok(Self {
            port: std::env::var("WEBHOOKHUB_INGEST_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            database_url: db.database_url(),
            rabbitmq_url: broker.amqp_url(),
            db_pool_size: 10,
        })
    }
}

/// Configuration for the delivery worker process (C5).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub rabbitmq_url: String,
    pub db_pool_size: u32,
    pub prefetch: u16,
    pub metrics_port: u16,
}

impl WorkerConfig {
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let db = DbEnv::load("WEBHOOKHUB")?;
        let broker = BrokerEnv::load("WEBHOOKHUB")?;

        Ok(Self {
            database_url: db.database_url(),
            rabbitmq_url: broker.amqp_url(),
            db_pool_size: 5,
            prefetch: 5,
            metrics_port: std::env::var("WEBHOOKHUB_WORKER_METRICS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(9090),
        })
    }
}
