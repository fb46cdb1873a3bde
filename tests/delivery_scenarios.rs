//! Exercises the dispatch + classification half of the delivery worker
//! (C3/C5, spec §8 S1/S3/S4/S5) against a real HTTP server via `wiremock`,
//! without a broker or database. The dispatch logic mirrors
//! `webhookhub-worker`'s `DeliveryClient` — kept inline here since that
//! crate has no library target to depend on, matching how the ethhook
//! pack's integration tests re-implement thin client logic locally rather
//! than reach into a binary crate.

use std::time::Duration;

use serde_json::json;
use webhookhub_domain::classify::{classify_status, classify_transport_error};
use webhookhub_domain::DeliveryOutcome;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn dispatch(client: &reqwest::Client, url: &str, body: &str) -> DeliveryOutcome {
    match client.post(url).body(body.to_string()).send().await {
        Ok(resp) => {
            let status = resp.status().as_u16();
            classify_status(status, resp.text().await.unwrap_or_default())
        }
        Err(e) => classify_transport_error(e.to_string()),
    }
}

fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        .build()
        .expect("client builds")
}

#[tokio::test]
async fn s1_happy_path_is_delivered_on_first_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client();
    let url = format!("{}/hook", server.uri());
    let outcome = dispatch(&client, &url, &json!({"ref": "main"}).to_string()).await;

    assert_eq!(outcome, DeliveryOutcome::Success);
}

#[tokio::test]
async fn s4_permanent_client_error_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid payload"))
        .mount(&server)
        .await;

    let client = test_client();
    let url = format!("{}/hook", server.uri());
    let outcome = dispatch(&client, &url, "{}").await;

    match outcome {
        DeliveryOutcome::Failure {
            status_code,
            retryable,
            message,
        } => {
            assert_eq!(status_code, Some(400));
            assert!(!retryable);
            assert_eq!(message, "invalid payload");
        }
        DeliveryOutcome::Success => panic!("expected a terminal failure"),
    }
}

#[tokio::test]
async fn s3_and_s5_server_error_is_retryable_with_published_backoff_schedule() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client();
    let url = format!("{}/hook", server.uri());
    let outcome = dispatch(&client, &url, "{}").await;

    let retryable = matches!(
        outcome,
        DeliveryOutcome::Failure { retryable: true, status_code: Some(500), .. }
    );
    assert!(retryable);

    let schedule: Vec<u64> = (1..=4).map(webhookhub_domain::backoff::delay_ms).collect();
    assert_eq!(schedule, vec![30_000, 120_000, 600_000, 1_800_000]);
}

#[tokio::test]
async fn transport_failure_when_destination_is_unreachable() {
    let client = test_client();
    let outcome = dispatch(&client, "http://127.0.0.1:1", "{}").await;

    match outcome {
        DeliveryOutcome::Failure { status_code, retryable, .. } => {
            assert_eq!(status_code, None);
            assert!(retryable);
        }
        DeliveryOutcome::Success => panic!("expected a transport failure"),
    }
}
