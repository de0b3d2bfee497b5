#![allow(dead_code)]

use serde_json::{json, Value};
use std::time::Duration;
use verimail_sdk::{PollingConfig, SdkConfig, VerimailClient};
use wiremock::MockServer;

// ===== Setup Helpers =====

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("verimail_sdk=debug")
        .try_init();
}

/// Configuration rotating over `servers` in the given order, with short polls
pub fn config_for(servers: &[&MockServer]) -> SdkConfig {
    SdkConfig::default()
        .with_base_urls(servers.iter().map(|server| server.uri()))
        .with_shuffle(false)
        .with_polling(PollingConfig::new(
            Duration::from_millis(10),
            Duration::from_millis(50),
        ))
}

pub fn client_for(servers: &[&MockServer]) -> VerimailClient {
    init_tracing();
    VerimailClient::new(config_for(servers)).expect("valid test configuration")
}

// ===== Payloads =====

pub fn overview(id: &str, status: &str, entries: u32) -> Value {
    json!({
        "id": id,
        "status": status,
        "submittedOn": "2024-05-01T10:00:00Z",
        "noOfEntries": entries
    })
}

pub fn entry(index: u32, input: &str) -> Value {
    json!({
        "index": index,
        "inputData": input,
        "classification": "Deliverable",
        "status": "Success"
    })
}

pub fn segment(data: Vec<Value>, cursor: Option<&str>) -> Value {
    json!({
        "meta": { "cursor": cursor, "isTruncated": cursor.is_some() },
        "data": data
    })
}

pub fn snapshot(overview: Value, entries: Option<Value>) -> Value {
    match entries {
        Some(entries) => json!({ "overview": overview, "entries": entries }),
        None => json!({ "overview": overview }),
    }
}
