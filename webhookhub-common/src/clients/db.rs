use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Connection-acquire timeout shared by every pool (spec §5).
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a pool sized for the caller's process. Ingest uses 10 connections,
/// the worker uses 5 to match its `prefetch` (spec §5, §9).
pub fn create_pool(database_url: &str, max_size: u32) -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_size)
        .min_idle(Some(1))
        .connection_timeout(CONNECTION_TIMEOUT)
        .test_on_check_out(true)
        .build(manager)
        .expect("failed to create database pool");

    tracing::info!(max_size, "database connection pool created");
    pool
}
