use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::validation::ValidationStatus;

const DATE_FORMAT: &str = "%Y-%m-%d";

// ===== Segments =====

/// Pagination metadata attached to every list segment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListSegmentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default)]
    pub is_truncated: bool,
}

/// One page of a segmented list endpoint.
///
/// `meta.is_truncated` is false on, and only on, the terminal page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListSegment<T> {
    #[serde(default)]
    pub meta: ListSegmentMeta,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> ListSegment<T> {
    /// Segment with explicit pagination metadata
    pub fn new(data: Vec<T>, cursor: Option<String>, is_truncated: bool) -> Self {
        Self {
            meta: ListSegmentMeta {
                cursor,
                is_truncated,
            },
            data,
        }
    }

    /// Last segment of a listing
    pub fn terminal(data: Vec<T>) -> Self {
        Self::new(data, None, false)
    }

    /// Cursor to follow, if another page exists.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.meta.is_truncated {
            self.meta.cursor.as_deref()
        } else {
            None
        }
    }
}

/// Traversal direction, fixed for the lifetime of one listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub fn cursor_param(&self) -> &'static str {
        match self {
            Direction::Forward => "cursor",
            Direction::Backward => "cursor:prev",
        }
    }
}

// ===== Filters =====

/// Serializes a filter into query parameters for the first page of a listing.
pub trait QueryFilter {
    fn to_query(&self) -> Vec<(String, String)>;
}

impl QueryFilter for () {
    fn to_query(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Date constraint on a listing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    /// Exactly this date, sent as `field=date`
    On(NaiveDate),
    /// Inclusive range, sent as `field:since` and `field:until`
    Between {
        since: Option<NaiveDate>,
        until: Option<NaiveDate>,
    },
}

impl DateFilter {
    /// From `date` onwards
    pub fn since(date: NaiveDate) -> Self {
        DateFilter::Between {
            since: Some(date),
            until: None,
        }
    }

    /// Up to `date`
    pub fn until(date: NaiveDate) -> Self {
        DateFilter::Between {
            since: None,
            until: Some(date),
        }
    }

    /// From `since` to `until`
    pub fn between(since: NaiveDate, until: NaiveDate) -> Self {
        DateFilter::Between {
            since: Some(since),
            until: Some(until),
        }
    }

    /// Parameters for `field`; unset bounds are omitted.
    pub fn to_query(&self, field: &str) -> Vec<(String, String)> {
        match self {
            DateFilter::On(date) => vec![(field.to_string(), date.format(DATE_FORMAT).to_string())],
            DateFilter::Between { since, until } => {
                let mut params = Vec::with_capacity(2);
                if let Some(since) = since {
                    params.push((format!("{field}:since"), since.format(DATE_FORMAT).to_string()));
                }
                if let Some(until) = until {
                    params.push((format!("{field}:until"), until.format(DATE_FORMAT).to_string()));
                }
                params
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSort {
    CreatedOnAscending,
    CreatedOnDescending,
}

impl ValidationSort {
    pub fn as_param(&self) -> &'static str {
        match self {
            ValidationSort::CreatedOnAscending => "createdOn",
            ValidationSort::CreatedOnDescending => "-createdOn",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFilter {
    pub created_on: Option<DateFilter>,
    pub statuses: Vec<ValidationStatus>,
    pub sort: Option<ValidationSort>,
}

impl ValidationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_on(mut self, filter: DateFilter) -> Self {
        self.created_on = Some(filter);
        self
    }

    pub fn with_status(mut self, status: ValidationStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn sorted(mut self, sort: ValidationSort) -> Self {
        self.sort = Some(sort);
        self
    }
}

impl QueryFilter for ValidationFilter {
    fn to_query(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(created_on) = &self.created_on {
            params.extend(created_on.to_query("createdOn"));
        }
        if !self.statuses.is_empty() {
            let statuses: Vec<String> = self.statuses.iter().map(ToString::to_string).collect();
            params.push(("statuses".to_string(), statuses.join(",")));
        }
        if let Some(sort) = self.sort {
            params.push(("sort".to_string(), sort.as_param().to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyUsageFilter {
    pub date: Option<DateFilter>,
}

impl DailyUsageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date(mut self, filter: DateFilter) -> Self {
        self.date = Some(filter);
        self
    }
}

impl QueryFilter for DailyUsageFilter {
    fn to_query(&self) -> Vec<(String, String)> {
        self.date
            .as_ref()
            .map(|date| date.to_query("date"))
            .unwrap_or_default()
    }
}

// ===== Listing Options =====

/// Options for one listing traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingOptions<F> {
    pub filter: F,
    /// Page size cap; only sent when positive.
    pub limit: Option<u32>,
    pub direction: Direction,
}

impl<F: Default> ListingOptions<F> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F> ListingOptions<F> {
    pub fn with_filter(mut self, filter: F) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// The positive page-size cap, if any.
    pub fn effective_limit(&self) -> Option<u32> {
        self.limit.filter(|limit| *limit > 0)
    }
}

pub type ValidationListingOptions = ListingOptions<ValidationFilter>;
pub type DailyUsageListingOptions = ListingOptions<DailyUsageFilter>;
