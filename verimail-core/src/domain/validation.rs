use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::entry::ValidationEntry;
use super::request::DeduplicationMode;
use crate::timespan::parse_time_span;

// ===== Validation Status =====

/// Server-side lifecycle of an email validation job.
///
/// Statuses this client does not know deserialize as `Unrecognized` and are
/// treated like `InProgress`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ValidationStatus {
    InProgress,
    Completed,
    Deleted,
    Expired,
    #[serde(other)]
    Unrecognized,
}

impl ValidationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ValidationStatus::Completed | ValidationStatus::Deleted | ValidationStatus::Expired
        )
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ValidationStatus::Completed)
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "InProgress"),
            Self::Completed => write!(f, "Completed"),
            Self::Deleted => write!(f, "Deleted"),
            Self::Expired => write!(f, "Expired"),
            Self::Unrecognized => write!(f, "Unrecognized"),
        }
    }
}

// ===== Progress =====

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationProgress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_of_completed_entries: Option<u32>,
    /// Server estimate in time span notation, e.g. `00:02:30`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining: Option<String>,
}

impl ValidationProgress {
    /// The estimated time remaining, if present and well formed.
    pub fn eta(&self) -> Option<Duration> {
        self.estimated_time_remaining
            .as_deref()
            .and_then(|eta| parse_time_span(eta).ok())
    }
}

// ===== Overview =====

/// Status and metadata of a validation job, without its entries.
///
/// Overviews are snapshots: a fresher one replaces an older one wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOverview {
    pub id: String,
    pub status: ValidationStatus,
    pub submitted_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, rename = "clientIP", skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduplication: Option<DeduplicationMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention: Option<String>,
    #[serde(default)]
    pub no_of_entries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ValidationProgress>,
}

impl ValidationOverview {
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    pub fn eta(&self) -> Option<Duration> {
        self.progress.as_ref().and_then(ValidationProgress::eta)
    }

    pub fn retention(&self) -> Option<Duration> {
        self.retention
            .as_deref()
            .and_then(|retention| parse_time_span(retention).ok())
    }
}

// ===== Validation =====

/// A completed (or snapshot) validation: its overview plus every entry, in order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Validation {
    pub overview: ValidationOverview,
    pub entries: Vec<ValidationEntry>,
}

impl Validation {
    pub fn new(overview: ValidationOverview, entries: Vec<ValidationEntry>) -> Self {
        Self { overview, entries }
    }

    pub fn id(&self) -> &str {
        &self.overview.id
    }

    pub fn status(&self) -> ValidationStatus {
        self.overview.status
    }
}
