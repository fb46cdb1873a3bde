use std::time::Duration;

use webhookhub_domain::classify::{classify_status, classify_transport_error};
use webhookhub_domain::DeliveryOutcome;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(15);
const TOTAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches one delivery attempt over HTTP (spec §4.4). The three
/// independent timeout axes bound connect, socket read, and the attempt as
/// a whole, so a destination that accepts the connection but drips bytes
/// can't hold a worker slot past 30s.
#[derive(Clone)]
pub struct DeliveryClient {
    http: reqwest::Client,
}

impl DeliveryClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .timeout(TOTAL_TIMEOUT)
            .build()
            .expect("failed to build delivery HTTP client");

        Self { http }
    }

    pub async fn deliver(&self, target_url: &str, payload_json: &str) -> DeliveryOutcome {
        let result = self
            .http
            .post(target_url)
            .header("content-type", "application/json")
            .body(payload_json.to_string())
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                let body_snippet = response
                    .text()
                    .await
                    .unwrap_or_default()
                    .chars()
                    .take(500)
                    .collect::<String>();
                classify_status(status, body_snippet)
            }
            Err(e) => classify_transport_error(e.to_string()),
        }
    }
}

impl Default for DeliveryClient {
    fn default() -> Self {
        Self::new()
    }
}
