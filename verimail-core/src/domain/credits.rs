use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::timespan::parse_time_span;

/// Current credit balance of the account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    #[serde(default)]
    pub credit_packs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_credits: Option<f64>,
    /// Time until free credits reset, in time span notation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_credits_reset_in: Option<String>,
}

impl Balance {
    pub fn free_credits_reset_in(&self) -> Option<Duration> {
        self.free_credits_reset_in
            .as_deref()
            .and_then(|reset_in| parse_time_span(reset_in).ok())
    }

    pub fn total(&self) -> f64 {
        self.credit_packs + self.free_credits.unwrap_or_default()
    }
}

/// Credits consumed on a single day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub date: NaiveDate,
    #[serde(default)]
    pub credit_packs: f64,
    #[serde(default)]
    pub free_credits: f64,
}
