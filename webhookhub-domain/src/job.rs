use serde::{Deserialize, Serialize};

/// On-the-wire job carried by the broker (spec §3, C7). Not persisted
/// directly — the `Delivery` row is the durable record; this is the
/// transient message that schedules one attempt against it.
///
/// Field names on the wire are camelCase (`deliveryId`, `eventId`, ...) —
/// a binding wire-compatibility convention (spec §3/§4.6/§6), not a style
/// choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryJob {
    pub delivery_id: String,
    pub event_id: String,
    pub target_url: String,
    pub payload_json: String,
    pub attempt: u32,
}

impl DeliveryJob {
    pub fn first_attempt(
        delivery_id: uuid::Uuid,
        event_id: uuid::Uuid,
        target_url: impl Into<String>,
        payload_json: impl Into<String>,
    ) -> Self {
        Self {
            delivery_id: delivery_id.to_string(),
            event_id: event_id.to_string(),
            target_url: target_url.into(),
            payload_json: payload_json.into(),
            attempt: 1,
        }
    }

    /// A copy of this job for the next attempt, used when republishing to
    /// the retry queue (spec §4.5 step 4).
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}
