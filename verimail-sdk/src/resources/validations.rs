//! Email validations resource client
//!
//! Submitting, retrieving, deleting and listing email validation jobs.

use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use verimail_core::{
    FileValidationRequest, ListSegment, ValidationEntry, Validation, ValidationListingOptions,
    ValidationOverview, ValidationRequest, ValidationRequestEntry,
};

use crate::cancellation::CancellationToken;
use crate::config::PollingConfig;
use crate::dispatcher::{ApiResponse, Dispatcher, InvocationRequest, MultipartPayload};
use crate::error::{SdkError, SdkResult};
use crate::pagination::{concat_segments, fetch_segment, Paginator};
use crate::waiting::{Poller, WaitingStrategy};

const VALIDATIONS_PATH: &str = "email-validations";

/// What to submit: explicit values or an uploaded file
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitRequest {
    /// Input values with their settings, sent as JSON
    Entries(ValidationRequest),
    /// A file holding the values, sent as a multipart form
    File(FileValidationRequest),
}

impl From<ValidationRequest> for SubmitRequest {
    fn from(request: ValidationRequest) -> Self {
        SubmitRequest::Entries(request)
    }
}

impl From<FileValidationRequest> for SubmitRequest {
    fn from(request: FileValidationRequest) -> Self {
        SubmitRequest::File(request)
    }
}

impl From<Vec<ValidationRequestEntry>> for SubmitRequest {
    fn from(entries: Vec<ValidationRequestEntry>) -> Self {
        SubmitRequest::Entries(ValidationRequest::new(entries))
    }
}

impl From<ValidationRequestEntry> for SubmitRequest {
    fn from(entry: ValidationRequestEntry) -> Self {
        vec![entry].into()
    }
}

impl From<Vec<String>> for SubmitRequest {
    fn from(values: Vec<String>) -> Self {
        SubmitRequest::Entries(ValidationRequest::from_values(values))
    }
}

impl From<String> for SubmitRequest {
    fn from(value: String) -> Self {
        vec![value].into()
    }
}

impl From<&str> for SubmitRequest {
    fn from(value: &str) -> Self {
        value.to_string().into()
    }
}

/// A job as returned by submission and retrieval: its overview plus the first
/// segment of its entries, when the service includes them.
#[derive(Debug, Deserialize)]
struct ValidationSnapshot {
    overview: ValidationOverview,
    #[serde(default)]
    entries: Option<ListSegment<ValidationEntry>>,
}

/// Client for email validation operations
#[derive(Debug, Clone)]
pub struct EmailValidationsClient {
    dispatcher: Arc<Dispatcher>,
    polling: PollingConfig,
}

impl EmailValidationsClient {
    /// Create a new email validations client.
    ///
    /// Fails if the polling bounds are invalid.
    pub fn new(dispatcher: Arc<Dispatcher>, polling: PollingConfig) -> SdkResult<Self> {
        polling.validate()?;
        Ok(Self {
            dispatcher,
            polling,
        })
    }

    /// Submit a new validation job.
    ///
    /// Returns `Ok(None)` if the job is gone before its result could be
    /// assembled.
    pub async fn submit(
        &self,
        request: impl Into<SubmitRequest>,
        waiting: WaitingStrategy,
        token: Option<&CancellationToken>,
    ) -> SdkResult<Option<Validation>> {
        let invocation = match request.into() {
            SubmitRequest::Entries(request) => {
                request
                    .validate()
                    .map_err(|e| SdkError::InvalidRequest(e.to_string()))?;
                info!(entries = request.entries.len(), "Submitting email validation");
                InvocationRequest::post(VALIDATIONS_PATH).with_json(&request)?
            }
            SubmitRequest::File(request) => {
                request
                    .validate()
                    .map_err(|e| SdkError::InvalidRequest(e.to_string()))?;
                info!(
                    bytes = request.content.len(),
                    content_type = %request.content_type,
                    "Submitting email validation file"
                );
                let payload = MultipartPayload::new()
                    .part(
                        "inputFile",
                        request.content.clone(),
                        request.content_type.clone(),
                        request.file_name.clone(),
                    )
                    .json_part("settings", &request.submission_settings())?;
                InvocationRequest::post(VALIDATIONS_PATH).with_multipart(payload)
            }
        };

        let response = self.dispatcher.invoke(invocation, token).await?;
        let snapshot = read_snapshot(response)?;
        self.complete(snapshot, waiting, token).await
    }

    /// Get a validation job by ID, optionally waiting for it to complete
    pub async fn get(
        &self,
        id: &str,
        waiting: WaitingStrategy,
        token: Option<&CancellationToken>,
    ) -> SdkResult<Option<Validation>> {
        let snapshot = self.fetch_snapshot(id.to_string(), token).await?;
        self.complete(snapshot, waiting, token).await
    }

    /// Get the overview of a validation job, without its entries
    pub async fn get_overview(
        &self,
        id: &str,
        token: Option<&CancellationToken>,
    ) -> SdkResult<Option<ValidationOverview>> {
        let path = format!("{}/overview", validation_path(id)?);
        let response = self
            .dispatcher
            .invoke(InvocationRequest::get(path), token)
            .await?;

        if response.is_gone() {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(response.unexpected());
        }
        response.deserialize().map(Some)
    }

    /// Delete a validation job. Deleting a job that is already gone succeeds.
    pub async fn delete(&self, id: &str, token: Option<&CancellationToken>) -> SdkResult<()> {
        let response = self
            .dispatcher
            .invoke(InvocationRequest::delete(validation_path(id)?), token)
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::GONE => {
                info!(id, "Email validation deleted");
                Ok(())
            }
            _ => Err(response.unexpected()),
        }
    }

    /// List validation jobs lazily, one overview at a time
    pub fn list(
        &self,
        options: ValidationListingOptions,
        token: Option<&CancellationToken>,
    ) -> Paginator<ValidationOverview> {
        Paginator::new(
            Arc::clone(&self.dispatcher),
            VALIDATIONS_PATH,
            &options,
            token,
        )
    }

    async fn fetch_snapshot(
        &self,
        id: String,
        token: Option<&CancellationToken>,
    ) -> SdkResult<Option<ValidationSnapshot>> {
        let response = self
            .dispatcher
            .invoke(InvocationRequest::get(validation_path(&id)?), token)
            .await?;
        read_snapshot(response)
    }

    async fn complete(
        &self,
        snapshot: Option<ValidationSnapshot>,
        waiting: WaitingStrategy,
        token: Option<&CancellationToken>,
    ) -> SdkResult<Option<Validation>> {
        let Some(snapshot) = snapshot else {
            return Ok(None);
        };

        let (_, snapshot) = Poller::new(&waiting, self.polling, token)
            .run(
                snapshot,
                |snapshot| &snapshot.overview,
                move |id| self.fetch_snapshot(id, token),
            )
            .await?;

        match snapshot {
            Some(snapshot) => self.assemble(snapshot, token).await.map(Some),
            None => Ok(None),
        }
    }

    /// Overview plus entries. Completed jobs get every entry segment; other
    /// jobs keep whatever entries the snapshot carried.
    async fn assemble(
        &self,
        snapshot: ValidationSnapshot,
        token: Option<&CancellationToken>,
    ) -> SdkResult<Validation> {
        let ValidationSnapshot { overview, entries } = snapshot;

        if !overview.is_completed() {
            let entries = entries.map(|segment| segment.data).unwrap_or_default();
            return Ok(Validation::new(overview, entries));
        }

        let path = format!("{}/entries", validation_path(&overview.id)?);
        let path = path.as_str();
        let dispatcher: &Dispatcher = &self.dispatcher;
        let mut received = entries;

        let entries = concat_segments(
            move |cursor: Option<String>| {
                let first = if cursor.is_none() { received.take() } else { None };
                async move {
                    match first {
                        Some(segment) => Ok(segment),
                        None => fetch_segment(dispatcher, path, cursor, token).await,
                    }
                }
            },
            token,
        )
        .await?;

        Ok(Validation::new(overview, entries))
    }
}

fn read_snapshot(response: ApiResponse) -> SdkResult<Option<ValidationSnapshot>> {
    match response.status() {
        StatusCode::OK | StatusCode::ACCEPTED => response.deserialize().map(Some),
        StatusCode::NOT_FOUND | StatusCode::GONE => Ok(None),
        _ => Err(response.unexpected()),
    }
}

fn validation_path(id: &str) -> SdkResult<String> {
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(SdkError::InvalidRequest(format!(
            "invalid validation id {id:?}"
        )));
    }
    Ok(format!("{VALIDATIONS_PATH}/{id}"))
}
