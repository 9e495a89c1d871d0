//! HTTP calls against a mocked backend.

use drawkit_client::{Client, ClientConfig, ClientError, endpoints};
use drawkit_core::{AuditInput, DrawConfig, PageLocation, StreamConfig};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> Client {
    let page = PageLocation::parse("http://localhost:5173/").unwrap();
    Client::new(ClientConfig::new(server.uri(), StreamConfig::new(page))).unwrap()
}

fn sample_config() -> DrawConfig {
    DrawConfig::new(vec!["clock_jitter".into(), "dram_row_buffer".into()], 4096, 6, 49)
}

#[tokio::test]
async fn draw_round_trip_preserves_job_id_and_config() {
    let server = MockServer::start().await;
    let config = sample_config();

    Mock::given(method("POST"))
        .and(path("/draw"))
        .and(body_json(&config))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "job-42"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/draw/job-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-42",
            "status": "done",
            "started_at": 1700000000.0,
            "finished_at": 1700000001.5,
            "config": config,
            "stages": [{"stage": "entropy"}, {"stage": "whitening"}],
            "draw": [2, 11, 19, 27, 33, 48],
            "fingerprint": "sha256:4f1c",
            "tests": {"frequency": {"passed": true, "p_value": 0.61}}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let started = client.start_draw(&config).await.unwrap();
    assert_eq!(started.job_id, "job-42");

    let result = client.draw_result(&started.job_id).await.unwrap();
    assert_eq!(result.job_id, started.job_id);
    assert!(result.echoes(&config));
    assert_eq!(result.draw.len(), 6);
}

#[tokio::test]
async fn bits_are_fetched_per_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/draw/job-42/bits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-42",
            "bits": "0110100110010110",
            "length": 16
        })))
        .mount(&server)
        .await;

    let bits = client_for(&server).draw_bits("job-42").await.unwrap();
    assert!(bits.is_consistent());
    assert_eq!(bits.count_ones(), 8);
}

#[tokio::test]
async fn audit_sends_only_the_populated_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audit"))
        .and(body_json(json!({"numbers": [3, 1, 4, 1, 5]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "length": 5,
            "tests": {"chi_square": {"passed": true}}
        })))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .audit(&AuditInput::from_numbers(vec![3, 1, 4, 1, 5]))
        .await
        .unwrap();
    assert_eq!(result.status, "ok");
    assert_eq!(result.length, 5);
}

#[tokio::test]
async fn nist_job_start_and_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audit/nist"))
        .and(body_json(json!({"sequence_bits": "1100100100001111"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "nist-7"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audit/nist/nist-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "nist-7",
            "status": "done",
            "started_at": 5.0,
            "finished_at": 6.0,
            "length": 16,
            "tests": [
                {"name": "frequency", "passed": true, "p_value": 0.8},
                {"name": "runs", "passed": true, "p_value": 0.4},
                {"name": "dft", "passed": false, "p_value": 0.0, "note": "insufficient length"}
            ],
            "summary": {"eligible": 2, "total": 3, "passed": 2, "ratio": 1.0}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let job = client
        .start_nist(&AuditInput::from_bits("1100100100001111"))
        .await
        .unwrap();
    let report = client.nist_report(&job.job_id).await.unwrap();
    assert_eq!(report.job_id, job.job_id);
    assert!(report.summary.is_consistent(1e-12));
    assert_eq!(report.failed_tests().count(), 1);
}

#[tokio::test]
async fn validation_failure_is_structured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audit/nist"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "detail": [{
                "loc": ["body"],
                "msg": "provide either sequence_bits or numbers",
                "type": "value_error"
            }]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .start_nist(&AuditInput::default())
        .await
        .unwrap_err();
    match err {
        ClientError::Validation(v) => {
            assert_eq!(v.to_string(), "body: provide either sequence_bits or numbers")
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_job_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/draw/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let err = client_for(&server).draw_result("missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn malformed_body_is_a_contract_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::START_DRAW))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .start_draw(&sample_config())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Contract(_)));
}
