use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::time::Duration;
use verimail_core::domain::*;

// ===== Overview Tests =====

#[test]
fn test_overview_deserializes_service_payload() {
    let json = r#"{
        "id": "b9c0a1e2-7f4d-4c2b-9a55-0f3c2d1e6a77",
        "status": "InProgress",
        "submittedOn": "2026-03-01T10:00:00Z",
        "createdOn": "2026-03-01T09:59:58Z",
        "clientIP": "203.0.113.7",
        "quality": "High",
        "deduplication": "Safe",
        "priority": 127,
        "retention": "30.00:00:00",
        "noOfEntries": 2500,
        "progress": { "percentage": 0.4, "estimatedTimeRemaining": "00:01:15" }
    }"#;

    let overview: ValidationOverview = serde_json::from_str(json).unwrap();

    assert_eq!(overview.status, ValidationStatus::InProgress);
    assert_eq!(overview.client_ip.as_deref(), Some("203.0.113.7"));
    assert_eq!(overview.deduplication, Some(DeduplicationMode::Safe));
    assert_eq!(overview.no_of_entries, 2500);
    assert_eq!(overview.eta(), Some(Duration::from_secs(75)));
    assert_eq!(overview.retention(), Some(Duration::from_secs(30 * 86_400)));
    assert!(!overview.is_completed());
}

#[test]
fn test_overview_with_malformed_eta_has_no_eta() {
    let json = r#"{
        "id": "job",
        "status": "InProgress",
        "submittedOn": "2026-03-01T10:00:00Z",
        "noOfEntries": 1,
        "progress": { "estimatedTimeRemaining": "soon" }
    }"#;

    let overview: ValidationOverview = serde_json::from_str(json).unwrap();
    assert_eq!(overview.eta(), None);
}

#[test]
fn test_validation_status_terminality() {
    assert!(!ValidationStatus::InProgress.is_terminal());
    assert!(ValidationStatus::Completed.is_terminal());
    assert!(ValidationStatus::Deleted.is_terminal());
    assert!(ValidationStatus::Expired.is_terminal());
    assert!(ValidationStatus::Completed.is_completed());
    assert!(!ValidationStatus::Expired.is_completed());
}

#[test]
fn test_unknown_validation_status_is_tolerated() {
    let json = r#"{
        "id": "job-9",
        "status": "Queued",
        "submittedOn": "2026-03-01T10:00:00Z",
        "noOfEntries": 2
    }"#;

    let overview: ValidationOverview = serde_json::from_str(json).unwrap();

    assert_eq!(overview.status, ValidationStatus::Unrecognized);
    assert!(!overview.status.is_terminal());
    assert!(!overview.is_completed());
}

// ===== Entry Tests =====

#[test]
fn test_entry_duplicate_back_reference() {
    let json = r#"{
        "index": 3,
        "inputData": "Alice@Example.com",
        "classification": "Undeliverable",
        "status": "Duplicate",
        "duplicateOf": 0
    }"#;

    let entry: ValidationEntry = serde_json::from_str(json).unwrap();

    assert!(entry.is_duplicate());
    assert_eq!(entry.duplicate_of, Some(0));
    assert_eq!(entry.custom, None);
}

#[test]
fn test_entry_unknown_status_code_is_tolerated() {
    let json = r#"{
        "inputData": "bob@example.com",
        "classification": "Unknown",
        "status": "SomethingIntroducedLater"
    }"#;

    let entry: ValidationEntry = serde_json::from_str(json).unwrap();
    assert_eq!(entry.status, EntryStatus::Unrecognized);
    assert_eq!(entry.classification, EntryClassification::Unknown);
}

#[test]
fn test_syntax_failure_statuses() {
    assert!(EntryStatus::DoubleDotSequence.is_syntax_failure());
    assert!(EntryStatus::InvalidLocalPartLength.is_syntax_failure());
    assert!(!EntryStatus::MailboxDoesNotExist.is_syntax_failure());
    assert!(!EntryStatus::Success.is_syntax_failure());
}

// ===== Segment Tests =====

#[test]
fn test_segment_next_cursor_only_when_truncated() {
    let segment: ListSegment<u32> =
        serde_json::from_str(r#"{"meta":{"cursor":"abc","isTruncated":true},"data":[1,2]}"#).unwrap();
    assert_eq!(segment.next_cursor(), Some("abc"));

    let last: ListSegment<u32> =
        serde_json::from_str(r#"{"meta":{"cursor":"abc","isTruncated":false},"data":[3]}"#).unwrap();
    assert_eq!(last.next_cursor(), None);
}

#[test]
fn test_direction_cursor_parameter_names() {
    assert_eq!(Direction::Forward.cursor_param(), "cursor");
    assert_eq!(Direction::Backward.cursor_param(), "cursor:prev");
}

// ===== Filter Tests =====

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_equality_date_filter_serializes_one_parameter() {
    let params = DateFilter::On(date(2026, 2, 14)).to_query("createdOn");
    assert_eq!(params, vec![("createdOn".to_string(), "2026-02-14".to_string())]);
}

#[test]
fn test_between_date_filter_omits_unset_bounds() {
    let both = DateFilter::between(date(2026, 1, 1), date(2026, 1, 31)).to_query("date");
    assert_eq!(
        both,
        vec![
            ("date:since".to_string(), "2026-01-01".to_string()),
            ("date:until".to_string(), "2026-01-31".to_string()),
        ]
    );

    let since_only = DateFilter::since(date(2026, 1, 1)).to_query("date");
    assert_eq!(since_only, vec![("date:since".to_string(), "2026-01-01".to_string())]);

    let open = DateFilter::Between { since: None, until: None }.to_query("date");
    assert!(open.is_empty());
}

#[test]
fn test_validation_filter_query() {
    let filter = ValidationFilter::new()
        .created_on(DateFilter::until(date(2026, 5, 1)))
        .with_status(ValidationStatus::InProgress)
        .with_status(ValidationStatus::Completed)
        .sorted(ValidationSort::CreatedOnDescending);

    assert_eq!(
        filter.to_query(),
        vec![
            ("createdOn:until".to_string(), "2026-05-01".to_string()),
            ("statuses".to_string(), "InProgress,Completed".to_string()),
            ("sort".to_string(), "-createdOn".to_string()),
        ]
    );
}

#[test]
fn test_listing_options_ignore_non_positive_limit() {
    let options = ValidationListingOptions::new().with_limit(0);
    assert_eq!(options.effective_limit(), None);

    let options = DailyUsageListingOptions::new().with_limit(25);
    assert_eq!(options.effective_limit(), Some(25));
}

// ===== Credits Tests =====

#[test]
fn test_balance_deserialization() {
    let balance: Balance = serde_json::from_str(
        r#"{"creditPacks": 950.5, "freeCredits": 12.0, "freeCreditsResetIn": "05:30:00"}"#,
    )
    .unwrap();

    assert_eq!(balance.total(), 962.5);
    assert_eq!(balance.free_credits_reset_in(), Some(Duration::from_secs(19_800)));
}

#[test]
fn test_daily_usage_deserialization() {
    let usage: DailyUsage =
        serde_json::from_str(r#"{"date": "2026-04-02", "creditPacks": 3.5, "freeCredits": 25}"#)
            .unwrap();

    assert_eq!(usage.date, date(2026, 4, 2));
    assert_eq!(usage.free_credits, 25.0);
}
