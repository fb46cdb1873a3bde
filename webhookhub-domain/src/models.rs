use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::{deliveries, destination_rules, destinations, events, sources};

/// Hard-coded per spec §3/§9: the worker's retry ceiling must stay in sync
/// with this constant until the `max_attempts` column becomes authoritative.
pub const MAX_ATTEMPTS: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeliveryStatus {
    Pending,
    Retrying,
    Delivered,
    Dead,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Retrying => "RETRYING",
            Self::Delivered => "DELIVERED",
            Self::Dead => "DEAD",
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "RETRYING" => Ok(Self::Retrying),
            "DELIVERED" => Ok(Self::Delivered),
            "DEAD" => Ok(Self::Dead),
            other => Err(format!("unknown delivery status: {other}")),
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = sources)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    /// 64-char lowercase hex secret. Never re-serialized in an API response
    /// after creation (spec §3).
    pub hmac_secret: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = destinations)]
pub struct Destination {
    pub id: Uuid,
    pub name: String,
    pub target_url: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Queryable, Identifiable, Associations, Serialize)]
#[diesel(belongs_to(Destination))]
#[diesel(table_name = destination_rules)]
pub struct DestinationRule {
    pub id: Uuid,
    pub destination_id: Uuid,
    pub source_name: String,
    pub event_type: String,
}

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = events)]
pub struct Event {
    pub id: Uuid,
    pub source_name: String,
    pub event_type: String,
    pub idempotency_key: String,
    pub payload_json: Vec<u8>,
    pub correlation_id: Option<String>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = events)]
pub struct NewEvent {
    pub id: Uuid,
    pub source_name: String,
    pub event_type: String,
    pub idempotency_key: String,
    pub payload_json: Vec<u8>,
    pub correlation_id: Option<String>,
}

#[derive(Debug, Queryable, Identifiable, Associations, Serialize)]
#[diesel(belongs_to(Event))]
#[diesel(belongs_to(Destination))]
#[diesel(table_name = deliveries)]
pub struct Delivery {
    pub id: Uuid,
    pub event_id: Uuid,
    pub destination_id: Uuid,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Delivery {
    /// Parsed status, panicking only on data corrupted outside this
    /// application's control (the column is only ever written with
    /// `DeliveryStatus::as_str()`).
    pub fn status(&self) -> DeliveryStatus {
        self.status.parse().expect("delivery status column holds an invalid value")
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = deliveries)]
pub struct NewDelivery {
    pub id: Uuid,
    pub event_id: Uuid,
    pub destination_id: Uuid,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
}

impl NewDelivery {
    pub fn pending(event_id: Uuid, destination_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            destination_id,
            status: DeliveryStatus::Pending.as_str().to_string(),
            attempts: 0,
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = deliveries)]
pub struct DeliveryStatusUpdate {
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}
