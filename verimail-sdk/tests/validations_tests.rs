// Submission, waiting, retrieval and deletion of email validations

mod common;

use common::{client_for, entry, overview, segment, snapshot};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use verimail_sdk::{
    CancellationToken, FileImportOptions, FileValidationRequest, QualityLevel, SdkError,
    ValidationRequest, ValidationStatus, WaitingStrategy,
};
use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

async fn requests_to(server: &MockServer, http_method: &str, url_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.method.as_str() == http_method && request.url.path() == url_path)
        .count()
}

// ===== Submit =====

#[tokio::test]
async fn test_submit_already_completed_issues_no_polling_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/email-validations"))
        .and(body_json(json!({
            "entries": [{ "inputData": "alice@example.com" }],
            "quality": "High"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(
            overview("job-1", "Completed", 1),
            Some(segment(vec![entry(0, "alice@example.com")], None)),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let client = client_for(&[&server]);

    let request = ValidationRequest::from_values(["alice@example.com"]).with_quality(QualityLevel::high());
    let validation = client
        .email_validations()
        .submit(request, WaitingStrategy::wait(), None)
        .await
        .unwrap()
        .expect("completed validation");

    assert_eq!(validation.id(), "job-1");
    assert_eq!(validation.status(), ValidationStatus::Completed);
    assert_eq!(validation.entries.len(), 1);
    assert!(validation.entries[0].is_deliverable());
}

#[tokio::test]
async fn test_submit_accepted_then_completed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/email-validations"))
        .respond_with(ResponseTemplate::new(202).set_body_json(snapshot(overview("job-2", "InProgress", 2), None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/email-validations/job-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(
            overview("job-2", "Completed", 2),
            Some(segment(
                vec![entry(0, "a@example.com"), entry(1, "b@example.com")],
                None,
            )),
        )))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&[&server]);

    let progress = Arc::new(AtomicUsize::new(0));
    let observed = Arc::clone(&progress);
    let waiting = WaitingStrategy::wait().with_progress(move |_| {
        observed.fetch_add(1, Ordering::SeqCst);
    });

    let validation = client
        .email_validations()
        .submit(vec!["a@example.com".to_string(), "b@example.com".to_string()], waiting, None)
        .await
        .unwrap()
        .expect("completed validation");

    assert_eq!(validation.status(), ValidationStatus::Completed);
    let inputs: Vec<&str> = validation.entries.iter().map(|e| e.input_data.as_str()).collect();
    assert_eq!(inputs, vec!["a@example.com", "b@example.com"]);
    assert_eq!(progress.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_submit_without_waiting_returns_in_progress_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/email-validations"))
        .respond_with(ResponseTemplate::new(202).set_body_json(snapshot(overview("job-3", "InProgress", 5), None)))
        .mount(&server)
        .await;
    let client = client_for(&[&server]);

    let validation = client
        .email_validations()
        .submit("a@example.com", WaitingStrategy::no_wait(), None)
        .await
        .unwrap()
        .expect("snapshot");

    assert_eq!(validation.status(), ValidationStatus::InProgress);
    assert!(validation.entries.is_empty());
    assert_eq!(requests_to(&server, "GET", "/email-validations/job-3").await, 0);
}

#[tokio::test]
async fn test_submit_with_no_entries_is_rejected_locally() {
    let server = MockServer::start().await;
    let client = client_for(&[&server]);

    let error = client
        .email_validations()
        .submit(Vec::<String>::new(), WaitingStrategy::wait(), None)
        .await
        .unwrap_err();

    assert!(matches!(error, SdkError::InvalidRequest(_)));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_submit_file_sends_multipart_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/email-validations"))
        .respond_with(|request: &Request| {
            let content_type = request
                .headers
                .get("content-type")
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            let body = String::from_utf8_lossy(&request.body);
            let valid = content_type.starts_with("multipart/form-data; boundary=")
                && body.contains("name=\"inputFile\"; filename=\"list.csv\"")
                && body.contains("alice@example.com")
                && body.contains("name=\"settings\"")
                && body.contains("\"startingRow\":2");
            if valid {
                ResponseTemplate::new(200).set_body_json(snapshot(
                    overview("job-file", "Completed", 1),
                    Some(segment(vec![entry(0, "alice@example.com")], None)),
                ))
            } else {
                ResponseTemplate::new(400)
            }
        })
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&[&server]);

    let request = FileValidationRequest::new(b"email\nalice@example.com\n".to_vec(), "text/csv")
        .with_file_name("list.csv")
        .with_import(FileImportOptions {
            starting_row: Some(2),
            ..FileImportOptions::default()
        });

    let validation = client
        .email_validations()
        .submit(request, WaitingStrategy::wait(), None)
        .await
        .unwrap()
        .expect("completed validation");

    assert_eq!(validation.id(), "job-file");
}

#[tokio::test]
async fn test_submit_gone_returns_none_and_other_status_is_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/email-validations"))
        .respond_with(ResponseTemplate::new(410))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/email-validations"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;
    let client = client_for(&[&server]);

    let gone = client
        .email_validations()
        .submit("a@example.com", WaitingStrategy::wait(), None)
        .await
        .unwrap();
    let rejected = client
        .email_validations()
        .submit("a@example.com", WaitingStrategy::wait(), None)
        .await
        .unwrap_err();

    assert!(gone.is_none());
    assert!(matches!(rejected, SdkError::UnexpectedResponse { status: 400, .. }));
}

// ===== Get =====

#[tokio::test]
async fn test_get_concatenates_three_entry_segments() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/email-validations/job-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(
            overview("job-4", "Completed", 5),
            Some(segment(vec![entry(0, "a@x.io"), entry(1, "b@x.io")], Some("c1"))),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/email-validations/job-4/entries"))
        .and(query_param("cursor", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(segment(vec![entry(2, "c@x.io")], Some("c2"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/email-validations/job-4/entries"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(segment(
            vec![entry(3, "d@x.io"), entry(4, "e@x.io")],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&[&server]);

    let validation = client
        .email_validations()
        .get("job-4", WaitingStrategy::no_wait(), None)
        .await
        .unwrap()
        .expect("validation");

    let indexes: Vec<u32> = validation.entries.iter().map(|e| e.index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_get_completed_without_entries_fetches_them_from_the_start() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/email-validations/job-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(overview("job-5", "Completed", 1), None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/email-validations/job-5/entries"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(segment(vec![entry(0, "a@x.io")], None)))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&[&server]);

    let validation = client
        .email_validations()
        .get("job-5", WaitingStrategy::wait(), None)
        .await
        .unwrap()
        .expect("validation");

    assert_eq!(validation.entries.len(), 1);
}

#[tokio::test]
async fn test_get_missing_validation_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/email-validations/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let client = client_for(&[&server]);

    let result = client
        .email_validations()
        .get("missing", WaitingStrategy::wait(), None)
        .await
        .unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn test_validation_vanishing_while_waiting_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/email-validations/job-6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(overview("job-6", "InProgress", 10), None)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/email-validations/job-6"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    let client = client_for(&[&server]);

    let result = client
        .email_validations()
        .get("job-6", WaitingStrategy::wait(), None)
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(requests_to(&server, "GET", "/email-validations/job-6").await, 2);
}

#[tokio::test]
async fn test_cancellation_during_wait_stops_polling() {
    let server = MockServer::start().await;
    let mut in_progress = overview("job-7", "InProgress", 100);
    in_progress["progress"] = json!({ "percentage": 10.0, "estimatedTimeRemaining": "00:10:00" });
    Mock::given(method("GET"))
        .and(path("/email-validations/job-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(in_progress, None)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = common::config_for(&[&server]);
    config.polling.max_delay = Duration::from_secs(30);
    let client = verimail_sdk::VerimailClient::new(config).unwrap();

    let token = CancellationToken::new();
    let callbacks = Arc::new(AtomicUsize::new(0));
    let fired = Arc::clone(&callbacks);
    token.register(move || {
        fired.fetch_add(1, Ordering::SeqCst);
    });

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
        canceller.cancel();
    });

    let error = client
        .email_validations()
        .get("job-7", WaitingStrategy::wait(), Some(&token))
        .await
        .unwrap_err();

    assert!(error.is_cancellation());
    assert_eq!(callbacks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_overview() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/email-validations/job-8/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overview("job-8", "InProgress", 3)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/email-validations/expired/overview"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    let client = client_for(&[&server]);

    let found = client.email_validations().get_overview("job-8", None).await.unwrap();
    let expired = client.email_validations().get_overview("expired", None).await.unwrap();

    assert_eq!(found.map(|o| o.no_of_entries), Some(3));
    assert!(expired.is_none());
}

// ===== Delete =====

#[tokio::test]
async fn test_delete_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/email-validations/job-9"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/email-validations/job-9"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    let client = client_for(&[&server]);

    client.email_validations().delete("job-9", None).await.unwrap();
    client.email_validations().delete("job-9", None).await.unwrap();

    assert_eq!(requests_to(&server, "DELETE", "/email-validations/job-9").await, 2);
}

#[tokio::test]
async fn test_delete_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let client = client_for(&[&server]);

    let error = client.email_validations().delete("job-10", None).await.unwrap_err();

    assert!(matches!(
        error,
        SdkError::UnexpectedResponse { status: 404, ref status_text } if status_text == "Not Found"
    ));
}
