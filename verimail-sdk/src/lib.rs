//! verimail SDK
//!
//! This crate provides an async Rust client for the verimail email
//! verification API. It submits email addresses (as values or as a file) for
//! validation, waits for the jobs to complete, and retrieves their results,
//! along with the account's credit balance and usage.
//!
//! # Features
//!
//! - **Endpoint failover**: requests rotate over equivalent regional endpoints
//!   and move on to the next one on network failures and server errors
//! - **Waiting strategies**: poll a job until it completes, with an adaptive
//!   delay and an optional progress callback
//! - **Cursor pagination**: lazy iteration or a [`futures::Stream`] over list
//!   endpoints
//! - **Cooperative cancellation**: every operation accepts a
//!   [`CancellationToken`] that aborts in-flight requests and pending waits
//! - **Multiple auth methods**: basic auth, bearer tokens with an optional
//!   second factor, or a TLS client certificate
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use verimail_sdk::{SdkConfig, VerimailClient, WaitingStrategy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SdkConfig::default().with_basic_auth("username", "password");
//!     let client = VerimailClient::new(config)?;
//!
//!     let validation = client
//!         .email_validations()
//!         .submit("alice@example.com", WaitingStrategy::wait(), None)
//!         .await?;
//!
//!     if let Some(validation) = validation {
//!         for entry in &validation.entries {
//!             println!("{} => {:?}", entry.input_data, entry.classification);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use verimail_sdk::{PollingConfig, SdkConfig};
//!
//! let config = SdkConfig::default()
//!     .with_bearer_auth("username", "password")
//!     .with_timeout(Duration::from_secs(60))
//!     .with_polling(PollingConfig::new(Duration::from_secs(1), Duration::from_secs(10)))
//!     .with_logging(true);
//! ```
//!
//! Alternatively, [`SdkConfig::load`] reads an optional `config/verimail` file
//! and `VERIMAIL_*` environment variables.
//!
//! # Error Handling
//!
//! ```rust,no_run
//! use verimail_sdk::{SdkError, VerimailClient};
//!
//! async fn show_balance(client: &VerimailClient) {
//!     match client.credits().get_balance(None).await {
//!         Ok(balance) => println!("{} credits left", balance.total()),
//!         Err(SdkError::AuthorizationError { message, .. }) => eprintln!("Auth failed: {message}"),
//!         Err(SdkError::ServiceUnreachable { errors }) => {
//!             eprintln!("{} endpoints failed", errors.len())
//!         }
//!         Err(e) => eprintln!("Other error: {e}"),
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod cancellation;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod pagination;
pub mod resources;
pub mod waiting;

// Re-export main types for convenience
pub use auth::{
    Authenticator, BasicAuthenticator, BearerAuthenticator, ClientCertificateAuthenticator,
    NoAuthenticator, TotpProvider,
};
pub use cancellation::{CallbackId, CancellationToken, Registration};
pub use config::{AuthConfig, PollingConfig, SdkConfig, SdkConfigBuilder, SdkSettings};
pub use dispatcher::{ApiResponse, Dispatcher, InvocationRequest, MultipartPayload, RequestBody};
pub use error::{EndpointError, SdkError, SdkResult};
pub use pagination::{concat_segments, Paginator};
pub use resources::{CreditsClient, EmailValidationsClient, SubmitRequest};
pub use waiting::{compute_delay, WaitState, WaitingStrategy};

// Re-export the domain model
pub use verimail_core as domain;
pub use verimail_core::{
    Balance, DailyUsage, DailyUsageFilter, DailyUsageListingOptions, DateFilter,
    DeduplicationMode, Direction, EntryClassification, EntryStatus, FileImportOptions,
    FileValidationRequest, QualityLevel, Validation, ValidationEntry, ValidationFilter,
    ValidationListingOptions, ValidationOverview, ValidationRequest, ValidationRequestEntry,
    ValidationSettings, ValidationStatus,
};

use std::sync::Arc;

/// The main client for the verimail API.
///
/// All resource clients share one [`Dispatcher`], so endpoint rotation and
/// cached credentials are common to every call.
///
/// # Example
///
/// ```rust,no_run
/// use verimail_sdk::{SdkConfig, VerimailClient};
///
/// # fn example() -> Result<(), verimail_sdk::SdkError> {
/// let client = VerimailClient::new(SdkConfig::default().with_basic_auth("user", "pass"))?;
///
/// let validations = client.email_validations();
/// let credits = client.credits();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct VerimailClient {
    dispatcher: Arc<Dispatcher>,
    email_validations: EmailValidationsClient,
    credits: CreditsClient,
}

impl VerimailClient {
    /// Create a new client with the given configuration.
    ///
    /// Fails if the configuration is invalid or the transport cannot be built.
    pub fn new(config: SdkConfig) -> SdkResult<Self> {
        let dispatcher = Arc::new(Dispatcher::new(&config)?);
        Self::from_dispatcher(dispatcher, config.polling)
    }

    /// Create a client from `config/verimail` and `VERIMAIL_*` variables
    pub fn from_env() -> SdkResult<Self> {
        Self::new(SdkConfig::load()?)
    }

    /// Create a client around an existing dispatcher.
    ///
    /// Fails if the polling bounds are invalid.
    pub fn from_dispatcher(dispatcher: Arc<Dispatcher>, polling: PollingConfig) -> SdkResult<Self> {
        Ok(Self {
            email_validations: EmailValidationsClient::new(Arc::clone(&dispatcher), polling)?,
            credits: CreditsClient::new(Arc::clone(&dispatcher)),
            dispatcher,
        })
    }

    /// Start building a client with fluent configuration
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the email validations client.
    pub fn email_validations(&self) -> &EmailValidationsClient {
        &self.email_validations
    }

    /// Get the credits client.
    pub fn credits(&self) -> &CreditsClient {
        &self.credits
    }

    /// Get the underlying dispatcher, for requests not covered by the
    /// resource clients.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

/// Builder for creating a [`VerimailClient`] with fluent configuration.
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: SdkConfig,
}

impl ClientBuilder {
    /// Create a new client builder targeting the default endpoints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the base URLs.
    pub fn with_base_urls<I, S>(mut self, base_urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.with_base_urls(base_urls);
        self
    }

    /// Set the authentication configuration.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.config = self.config.with_auth(auth);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.with_timeout(timeout);
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.with_connect_timeout(timeout);
        self
    }

    /// Set the polling delay bounds.
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.config = self.config.with_polling(polling);
        self
    }

    /// Enable or disable request/response logging.
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.config = self.config.with_logging(enable);
        self
    }

    /// Add a custom header to all requests.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config = self.config.with_header(name, value);
        self
    }

    /// Build the client.
    pub fn build(self) -> SdkResult<VerimailClient> {
        VerimailClient::new(self.config)
    }
}
