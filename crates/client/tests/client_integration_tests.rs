//! Integration tests for the catalog client using wiremock.
//!
//! These tests verify:
//! - Run events are posted to the lineage endpoint
//! - Upsert facts are posted as ingestion proposals, one per aspect
//! - API key header presence
//! - Error mapping for various HTTP status codes
//! - No retries on failure
//!
//! The client is blocking, so every call runs on a blocking thread.

use std::time::Duration;
use tabula_client::{CatalogClient, ClientConfig, ClientError};
use tabula_emitter::{CatalogSink, Emitter, LineageSource, SinkError};
use tabula_lineage::fact::{FieldTermsFact, GlossaryTermFact};
use tabula_lineage::{DatasetFact, EventType, RunEvent, UpsertFact};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test Helpers
// ============================================================================

fn test_config(server: &MockServer) -> ClientConfig {
    ClientConfig::builder(server.uri())
        .lineage_path("openapi/openlineage/api/v1/lineage")
        .facts_path("api/gms/facts")
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Build a client and run `f` against it on a blocking thread.
async fn with_client<F, T>(config: ClientConfig, f: F) -> T
where
    F: FnOnce(&CatalogClient) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let client = CatalogClient::new(config).unwrap();
        f(&client)
    })
    .await
    .unwrap()
}

fn sample_event() -> RunEvent {
    RunEvent::new(EventType::Complete, "local-test", "etl1", vec![], vec![])
}

// ============================================================================
// Event Endpoint Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_send_event_success() {
    let server = MockServer::start().await;
    let event = sample_event();

    Mock::given(method("POST"))
        .and(path("/openapi/openlineage/api/v1/lineage"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(serde_json::json!({
            "eventType": "COMPLETE",
            "job": { "namespace": "local-test", "name": "etl1" },
            "run": { "runId": event.run_id().to_string() }
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let result = with_client(test_config(&server), move |c| c.send_event(&event)).await;
    assert!(result.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_api_key_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openapi/openlineage/api/v1/lineage"))
        .and(header("authorization", "Bearer secret_token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::builder(server.uri())
        .lineage_path("openapi/openlineage/api/v1/lineage")
        .api_key("secret_token")
        .build()
        .unwrap();

    let result = with_client(config, |c| c.send_event(&sample_event())).await;
    assert!(result.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_fact_as_proposal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/gms/facts"))
        .and(header("x-restli-protocol-version", "2.0.0"))
        .and(body_partial_json(serde_json::json!({
            "proposal": {
                "entityType": "datasetField",
                "entityUrn": "urn:li:datasetField:(urn:li:dataset:(urn:li:dataPlatform:hive,sales.customers,PROD),email)",
                "changeType": "UPSERT",
                "aspectName": "glossaryTerms",
                "aspect": { "contentType": "application/json" }
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let fact = UpsertFact::FieldTerms(FieldTermsFact {
        dataset_urn: "urn:li:dataset:(urn:li:dataPlatform:hive,sales.customers,PROD)".to_string(),
        field: "email".to_string(),
        term_urns: vec!["urn:li:glossaryTerm:Email".to_string()],
    });
    let result = with_client(test_config(&server), move |c| c.send_fact(&fact)).await;
    assert!(result.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_owned_term_sends_two_proposals() {
    let server = MockServer::start().await;

    for aspect in ["glossaryTermInfo", "ownership"] {
        Mock::given(method("POST"))
            .and(path("/api/gms/facts"))
            .and(body_partial_json(serde_json::json!({
                "proposal": {
                    "entityType": "glossaryTerm",
                    "entityUrn": "urn:li:glossaryTerm:Email",
                    "aspectName": aspect
                }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    let fact = UpsertFact::GlossaryTerm(GlossaryTermFact {
        urn: "urn:li:glossaryTerm:Email".to_string(),
        name: "Email".to_string(),
        definition: "Customer email address".to_string(),
        owner: Some("urn:li:corpuser:data-team".to_string()),
    });
    let result = with_client(test_config(&server), move |c| c.send_fact(&fact)).await;
    assert!(result.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dataset_fact_targets_lineage_dataset_urn() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/gms/facts"))
        .and(body_partial_json(serde_json::json!({
            "proposal": {
                "entityType": "dataset",
                "entityUrn": "urn:li:dataset:(urn:li:dataPlatform:s3,raw.orders,PROD)",
                "aspectName": "status"
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let fact = UpsertFact::Dataset(DatasetFact {
        namespace: "s3://raw".to_string(),
        name: "orders".to_string(),
        fields: None,
    });
    let result = with_client(test_config(&server), move |c| c.send_fact(&fact)).await;
    assert!(result.is_ok());
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_error_401_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openapi/openlineage/api/v1/lineage"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "Invalid or missing API key"
        })))
        .mount(&server)
        .await;

    let result = with_client(test_config(&server), |c| c.send_event(&sample_event())).await;

    match result.unwrap_err() {
        ClientError::Unauthorized(msg) => assert!(msg.contains("API key")),
        other => panic!("Expected Unauthorized error, got: {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_error_400_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openapi/openlineage/api/v1/lineage"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({ "message": "eventTime is required" }))
                .insert_header("x-request-id", "req-400"),
        )
        .mount(&server)
        .await;

    let result = with_client(test_config(&server), |c| c.send_event(&sample_event())).await;

    let err = result.unwrap_err();
    assert_eq!(err.request_id(), Some("req-400"));
    match err {
        ClientError::Rejected {
            status, message, ..
        } => {
            assert_eq!(status, 400);
            assert!(message.contains("eventTime"));
        }
        other => panic!("Expected Rejected error, got: {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_error_500_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openapi/openlineage/api/v1/lineage"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let result =
        with_client(test_config(&server), |c| c.emit_event(&sample_event())).await;

    match result.unwrap_err() {
        SinkError::Unavailable(msg) => assert!(msg.contains("maintenance")),
        other => panic!("Expected Unavailable error, got: {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_refused_is_unavailable() {
    let config = ClientConfig::builder("http://127.0.0.1:9")
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let result = with_client(config, |c| c.emit_event(&sample_event())).await;
    assert!(matches!(result, Err(SinkError::Unavailable(_))));
}

// ============================================================================
// Emitter Integration
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_emitter_over_http_reports_failed_source() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openapi/openlineage/api/v1/lineage"))
        .and(body_partial_json(serde_json::json!({
            "eventType": "FAIL",
            "job": { "name": "missing_job" }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let report = with_client(test_config(&server), |c| {
        Emitter::new(c)
            .process_source(&LineageSource::new("missing_job", "/nonexistent/lineage.csv"))
            .unwrap()
    })
    .await;

    assert!(!report.is_success());
}
