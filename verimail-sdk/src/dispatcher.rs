//! Multiplexed request dispatcher
//!
//! Every call goes through [`Dispatcher::invoke`], which rotates over the
//! configured base URLs and fails over to the next one on transport failures
//! and 5xx responses. Account-level statuses are terminal and surface
//! immediately.

use rand::seq::SliceRandom;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken as AbortSignal;
use tracing::{debug, warn};
use url::Url;

use crate::auth::Authenticator;
use crate::cancellation::{self, CancellationToken};
use crate::config::SdkConfig;
use crate::error::{EndpointError, SdkError, SdkResult};

// ===== Requests =====

/// Body of an outgoing request
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Serialized JSON document
    Json(serde_json::Value),
    /// Multipart form
    Multipart(MultipartPayload),
}

/// Multipart form kept as raw parts so that it can be rebuilt for every attempt
#[derive(Debug, Clone, Default)]
pub struct MultipartPayload {
    parts: Vec<MultipartPart>,
}

#[derive(Clone)]
struct MultipartPart {
    name: String,
    content: Vec<u8>,
    content_type: String,
    file_name: Option<String>,
}

impl fmt::Debug for MultipartPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartPart")
            .field("name", &self.name)
            .field("bytes", &self.content.len())
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

impl MultipartPayload {
    /// Empty form
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binary part
    pub fn part(
        mut self,
        name: impl Into<String>,
        content: Vec<u8>,
        content_type: impl Into<String>,
        file_name: Option<String>,
    ) -> Self {
        self.parts.push(MultipartPart {
            name: name.into(),
            content,
            content_type: content_type.into(),
            file_name,
        });
        self
    }

    /// Add a JSON part
    pub fn json_part<T: Serialize>(self, name: impl Into<String>, value: &T) -> SdkResult<Self> {
        let content = serde_json::to_vec(value)?;
        Ok(self.part(name, content, "application/json", None))
    }

    /// Part names, in insertion order
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|part| part.name.as_str())
    }

    fn to_form(&self) -> SdkResult<Form> {
        let mut form = Form::new();
        for part in &self.parts {
            let mut body = Part::bytes(part.content.clone())
                .mime_str(&part.content_type)
                .map_err(|e| {
                    SdkError::InvalidRequest(format!(
                        "invalid content type {:?}: {e}",
                        part.content_type
                    ))
                })?;
            if let Some(file_name) = &part.file_name {
                body = body.file_name(file_name.clone());
            }
            form = form.part(part.name.clone(), body);
        }
        Ok(form)
    }
}

/// A single logical API call
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// HTTP method
    pub method: Method,
    /// Resource path relative to the base URL
    pub path: String,
    /// Query parameters, percent-encoded when the URL is built
    pub query: Vec<(String, String)>,
    /// Optional body
    pub body: Option<RequestBody>,
    /// Header overrides applied after the defaults
    pub headers: Vec<(String, String)>,
    /// Skip the authenticator
    pub anonymous: bool,
}

impl InvocationRequest {
    /// Request without query, body or header overrides
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            anonymous: false,
        }
    }

    /// GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append query parameters
    pub fn with_query<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a JSON body
    pub fn with_json<T: Serialize>(mut self, body: &T) -> SdkResult<Self> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    /// Set a multipart body
    pub fn with_multipart(mut self, payload: MultipartPayload) -> Self {
        self.body = Some(RequestBody::Multipart(payload));
        self
    }

    /// Add a header override
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send without credentials
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

// ===== Responses =====

/// A response whose status the dispatcher did not treat as an error.
///
/// The body is read eagerly and deserialized on demand.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    url: Url,
    status: StatusCode,
    body: String,
}

impl ApiResponse {
    /// HTTP status
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Canonical reason phrase of the status
    pub fn status_text(&self) -> &str {
        self.status.canonical_reason().unwrap_or_default()
    }

    /// URL of the endpoint that answered
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Raw response body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// 404 or 410: the resource does not exist (anymore)
    pub fn is_gone(&self) -> bool {
        matches!(self.status, StatusCode::NOT_FOUND | StatusCode::GONE)
    }

    /// Parse the body as JSON
    pub fn deserialize<T: DeserializeOwned>(&self) -> SdkResult<T> {
        serde_json::from_str(&self.body).map_err(SdkError::SerializationError)
    }

    /// The error to report when the caller does not expect this status
    pub fn unexpected(&self) -> SdkError {
        SdkError::unexpected(self.status)
    }
}

// ===== Dispatcher =====

enum Attempt {
    Completed(ApiResponse),
    Failed(EndpointError),
}

/// Round-robin dispatcher with endpoint failover
pub struct Dispatcher {
    client: Client,
    base_urls: Vec<Url>,
    counter: AtomicUsize,
    authenticator: Arc<dyn Authenticator>,
    enable_logging: bool,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_urls", &self.base_urls)
            .field("counter", &self.counter.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Build a dispatcher using the authenticator described by `config.auth`
    pub fn new(config: &SdkConfig) -> SdkResult<Self> {
        let authenticator = config.authenticator()?;
        Self::with_authenticator(config, authenticator)
    }

    /// Build a dispatcher with an explicit authenticator
    pub fn with_authenticator(
        config: &SdkConfig,
        authenticator: Arc<dyn Authenticator>,
    ) -> SdkResult<Self> {
        config.validate()?;

        let mut base_urls = config
            .base_urls
            .iter()
            .map(|base_url| normalize_base_url(base_url))
            .collect::<SdkResult<Vec<_>>>()?;
        if config.shuffle_base_urls {
            base_urls.shuffle(&mut rand::thread_rng());
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        for (name, value) in &config.custom_headers {
            let name = header::HeaderName::try_from(name.as_str()).map_err(|e| {
                SdkError::ConfigurationError(format!("invalid header name {name:?}: {e}"))
            })?;
            let value = header::HeaderValue::try_from(value.as_str()).map_err(|e| {
                SdkError::ConfigurationError(format!("invalid header value for {name}: {e}"))
            })?;
            headers.insert(name, value);
        }

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .gzip(true)
            .brotli(true);

        if let Some(identity) = authenticator.identity()? {
            builder = builder.identity(identity);
        }

        let client = builder.build().map_err(SdkError::NetworkError)?;

        Ok(Self {
            client,
            base_urls,
            counter: AtomicUsize::new(0),
            authenticator,
            enable_logging: config.enable_logging,
        })
    }

    /// Base URLs in rotation order
    pub fn base_urls(&self) -> &[Url] {
        &self.base_urls
    }

    /// Execute `request`, failing over across every base URL at most once.
    pub async fn invoke(
        &self,
        request: InvocationRequest,
        token: Option<&CancellationToken>,
    ) -> SdkResult<ApiResponse> {
        cancellation::check(token)?;

        let abort = AbortSignal::new();
        let _registration = token.map(|token| {
            let abort = abort.clone();
            token.register_scoped(move || abort.cancel())
        });

        let endpoints = self.base_urls.len();
        let mut errors = Vec::with_capacity(endpoints);

        for _ in 0..endpoints {
            let index = self.counter.fetch_add(1, Ordering::Relaxed) % endpoints;
            let url = self.resolve(&self.base_urls[index], &request)?;

            match self.attempt(&url, &request, &abort, token).await? {
                Attempt::Completed(response) => return Ok(response),
                Attempt::Failed(error) => {
                    warn!(error = %error, "Endpoint failed, trying the next one");
                    errors.push(error);
                }
            }
        }

        Err(SdkError::ServiceUnreachable { errors })
    }

    fn resolve(&self, base: &Url, request: &InvocationRequest) -> SdkResult<Url> {
        let mut url = base.join(request.path.trim_start_matches('/'))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &request.query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    async fn prepare(
        &self,
        url: &Url,
        request: &InvocationRequest,
        token: Option<&CancellationToken>,
    ) -> SdkResult<RequestBuilder> {
        let mut builder = self.client.request(request.method.clone(), url.clone());

        match &request.body {
            Some(RequestBody::Json(body)) => {
                let body = serde_json::to_string(body)?;
                if self.enable_logging {
                    debug!("Request body: {}", body);
                }
                builder = builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(body);
            }
            Some(RequestBody::Multipart(payload)) => {
                builder = builder.multipart(payload.to_form()?);
            }
            None => {}
        }

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if request.anonymous {
            Ok(builder)
        } else {
            self.authenticator.authenticate(self, builder, token).await
        }
    }

    async fn attempt(
        &self,
        url: &Url,
        request: &InvocationRequest,
        abort: &AbortSignal,
        token: Option<&CancellationToken>,
    ) -> SdkResult<Attempt> {
        let mut reauthenticated = false;

        loop {
            let builder = self.prepare(url, request, token).await?;
            debug!(method = %request.method, url = %url, "Dispatching request");

            let exchange = async {
                let response = builder.send().await?;
                let status = response.status();
                let body = response.text().await?;
                Ok::<_, reqwest::Error>((status, body))
            };

            let outcome = tokio::select! {
                _ = abort.cancelled() => return Err(SdkError::OperationCanceled),
                outcome = exchange => outcome,
            };

            let (status, body) = match outcome {
                Ok(exchanged) => exchanged,
                Err(source) => {
                    return Ok(Attempt::Failed(EndpointError::Transport {
                        url: url.clone(),
                        source,
                    }))
                }
            };

            if self.enable_logging {
                debug!(status = status.as_u16(), "Response body: {}", body);
            }

            if status.is_server_error() {
                return Ok(Attempt::Failed(EndpointError::ServerError {
                    url: url.clone(),
                    status: status.as_u16(),
                    body,
                }));
            }

            match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    if !request.anonymous
                        && !reauthenticated
                        && self.authenticator.handle_unauthorized().await
                    {
                        debug!(url = %url, "Credentials refreshed, retrying");
                        reauthenticated = true;
                        continue;
                    }
                    return Err(SdkError::AuthorizationError {
                        url: url.to_string(),
                        message: body,
                    });
                }
                StatusCode::PAYMENT_REQUIRED => {
                    return Err(SdkError::InsufficientCredit {
                        url: url.to_string(),
                    })
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    return Err(SdkError::RequestThrottled {
                        url: url.to_string(),
                    })
                }
                _ => {
                    return Ok(Attempt::Completed(ApiResponse {
                        url: url.clone(),
                        status,
                        body,
                    }))
                }
            }
        }
    }
}

/// Parse a base URL so that joining a relative path appends to it
fn normalize_base_url(base_url: &str) -> SdkResult<Url> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
