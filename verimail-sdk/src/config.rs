//! SDK configuration
//!
//! This module provides configuration options for the SDK client, either built
//! in code or loaded from a `config/verimail` file and `VERIMAIL_*` environment
//! variables.

use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{
    Authenticator, BasicAuthenticator, BearerAuthenticator, ClientCertificateAuthenticator,
    NoAuthenticator, TotpProvider,
};
use crate::error::{SdkError, SdkResult};

/// Version segment appended to every default base URL
pub const API_VERSION: &str = "v2.6";

/// Equivalent regional endpoints used with header-based authentication
pub const DEFAULT_BASE_URLS: [&str; 3] = [
    "https://api-1.verimail.io/v2.6",
    "https://api-2.verimail.io/v2.6",
    "https://api-3.verimail.io/v2.6",
];

/// Endpoints accepting TLS client certificate authentication
pub const DEFAULT_CLIENT_CERTIFICATE_BASE_URLS: [&str; 3] = [
    "https://api-cc-1.verimail.io/v2.6",
    "https://api-cc-2.verimail.io/v2.6",
    "https://api-cc-3.verimail.io/v2.6",
];

/// Configuration for the SDK client
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Equivalent base URLs, tried in round-robin order with failover
    pub base_urls: Vec<String>,

    /// Authentication method
    pub auth: AuthConfig,

    /// Request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Enable request/response body logging
    pub enable_logging: bool,

    /// Custom headers to add to all requests
    pub custom_headers: Vec<(String, String)>,

    /// Bounds of the delay between two polls of an in-progress job
    pub polling: PollingConfig,

    /// Shuffle base URLs once when the client is built
    pub shuffle_base_urls: bool,

    /// Maximum number of one-time codes tried for a second authentication factor
    pub max_totp_attempts: u32,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            base_urls: DEFAULT_BASE_URLS.iter().map(ToString::to_string).collect(),
            auth: AuthConfig::None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("verimail-sdk-rust/{}", env!("CARGO_PKG_VERSION")),
            enable_logging: false,
            custom_headers: Vec::new(),
            polling: PollingConfig::default(),
            shuffle_base_urls: true,
            max_totp_attempts: 3,
        }
    }
}

impl SdkConfig {
    /// Create a new configuration targeting a single base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_urls: vec![base_url.into()],
            ..Default::default()
        }
    }

    /// Create a new builder with the default endpoints
    pub fn builder() -> SdkConfigBuilder {
        SdkConfigBuilder::default()
    }

    /// Load from `config/verimail.*` (optional) and `VERIMAIL_*` variables
    pub fn load() -> SdkResult<Self> {
        let loader = ConfigLoader::builder()
            .add_source(File::with_name("config/verimail").required(false))
            .add_source(
                Environment::with_prefix("VERIMAIL")
                    .list_separator(",")
                    .with_list_parse_key("base_urls")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_loader(loader)
    }

    /// Build from an already assembled `config` source stack
    pub fn from_loader(loader: ConfigLoader) -> SdkResult<Self> {
        let settings: SdkSettings = loader.try_deserialize()?;
        settings.into_config()
    }

    /// Replace the base URLs
    pub fn with_base_urls<I, S>(mut self, base_urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_urls = base_urls.into_iter().map(Into::into).collect();
        self
    }

    /// Set the authentication method
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Username/password sent as HTTP basic authentication
    pub fn with_basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.with_auth(AuthConfig::Basic {
            username: username.into(),
            password: password.into(),
        })
    }

    /// Username/password exchanged for a bearer token
    pub fn with_bearer_auth(
        self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.with_auth(AuthConfig::Bearer {
            username: username.into(),
            password: password.into(),
            totp: None,
        })
    }

    /// Authenticate with a PEM encoded client certificate and private key.
    ///
    /// Switches to the client-certificate endpoints unless custom base URLs
    /// were configured.
    pub fn with_client_certificate(mut self, pem: impl Into<Vec<u8>>) -> Self {
        if self.uses_default_base_urls() {
            self.base_urls = DEFAULT_CLIENT_CERTIFICATE_BASE_URLS
                .iter()
                .map(ToString::to_string)
                .collect();
        }
        self.with_auth(AuthConfig::ClientCertificate { pem: pem.into() })
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable request/response logging
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    /// Add a custom header to all requests
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Set the polling delay bounds
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Keep the configured endpoint order instead of shuffling it
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle_base_urls = shuffle;
        self
    }

    /// Set how many one-time codes are tried for a second factor
    pub fn with_max_totp_attempts(mut self, attempts: u32) -> Self {
        self.max_totp_attempts = attempts;
        self
    }

    fn uses_default_base_urls(&self) -> bool {
        self.base_urls.len() == DEFAULT_BASE_URLS.len()
            && self
                .base_urls
                .iter()
                .zip(DEFAULT_BASE_URLS)
                .all(|(configured, default)| configured == default)
    }

    /// Validate the configuration
    pub fn validate(&self) -> SdkResult<()> {
        if self.base_urls.is_empty() {
            return Err(SdkError::ConfigurationError(
                "At least one base URL is required".to_string(),
            ));
        }

        for base_url in &self.base_urls {
            let parsed = url::Url::parse(base_url)?;
            if parsed.cannot_be_a_base() {
                return Err(SdkError::ConfigurationError(format!(
                    "{base_url} cannot be used as a base URL"
                )));
            }
        }

        if self.timeout.is_zero() {
            return Err(SdkError::ConfigurationError(
                "Timeout cannot be zero".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(SdkError::ConfigurationError(
                "Connect timeout cannot be zero".to_string(),
            ));
        }

        self.polling.validate()
    }

    /// Instantiate the authenticator described by `auth`
    pub fn authenticator(&self) -> SdkResult<Arc<dyn Authenticator>> {
        let authenticator: Arc<dyn Authenticator> = match &self.auth {
            AuthConfig::None => Arc::new(NoAuthenticator),
            AuthConfig::Basic { username, password } => {
                Arc::new(BasicAuthenticator::new(username.clone(), password.clone()))
            }
            AuthConfig::Bearer {
                username,
                password,
                totp,
            } => {
                let mut bearer = BearerAuthenticator::new(username.clone(), password.clone())
                    .with_max_totp_attempts(self.max_totp_attempts);
                if let Some(totp) = totp {
                    bearer = bearer.with_totp_provider(Arc::clone(totp));
                }
                Arc::new(bearer)
            }
            AuthConfig::ClientCertificate { pem } => {
                Arc::new(ClientCertificateAuthenticator::from_pem(pem)?)
            }
            AuthConfig::Custom(authenticator) => Arc::clone(authenticator),
        };
        Ok(authenticator)
    }
}

/// Polling delay bounds.
///
/// The delay between two polls grows with the job size and is clamped to
/// `[min_delay, max_delay]`; a server supplied estimate is clamped the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Shortest delay between two polls
    pub min_delay: Duration,
    /// Longest delay between two polls
    pub max_delay: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl PollingConfig {
    /// Bounds from `min_delay` to `max_delay`
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
        }
    }

    /// Reject a zero minimum or a minimum above the maximum
    pub fn validate(&self) -> SdkResult<()> {
        if self.min_delay.is_zero() || self.min_delay > self.max_delay {
            return Err(SdkError::ConfigurationError(format!(
                "Invalid polling bounds: {:?}..{:?}",
                self.min_delay, self.max_delay
            )));
        }
        Ok(())
    }
}

/// Authentication configuration
#[derive(Clone, Default)]
pub enum AuthConfig {
    /// No authentication
    #[default]
    None,

    /// Username and password for basic auth
    Basic {
        /// Account name
        username: String,
        /// Account password
        password: String,
    },

    /// Username and password exchanged for a bearer token, with an optional
    /// source of one-time codes for accounts protected by a second factor
    Bearer {
        /// Account name
        username: String,
        /// Account password
        password: String,
        /// One-time code source for the second factor
        totp: Option<Arc<dyn TotpProvider>>,
    },

    /// PEM encoded certificate chain and private key
    ClientCertificate {
        /// PEM bytes
        pem: Vec<u8>,
    },

    /// Caller supplied strategy
    Custom(Arc<dyn Authenticator>),
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthConfig::None => f.write_str("None"),
            AuthConfig::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            AuthConfig::Bearer { username, totp, .. } => f
                .debug_struct("Bearer")
                .field("username", username)
                .field("password", &"***")
                .field("totp", &totp.is_some())
                .finish(),
            AuthConfig::ClientCertificate { pem } => f
                .debug_struct("ClientCertificate")
                .field("pem_bytes", &pem.len())
                .finish(),
            AuthConfig::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// File/environment representation of [`SdkConfig`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SdkSettings {
    /// Base URLs; a comma separated list in the environment
    pub base_urls: Option<Vec<String>>,
    /// Account name
    pub username: Option<String>,
    /// Account password
    pub password: Option<String>,
    /// `basic` (default) or `bearer`
    pub auth_mode: Option<String>,
    /// PEM file with the client certificate and its private key
    pub client_certificate_path: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Connection timeout in seconds
    pub connect_timeout_secs: Option<u64>,
    /// User agent string
    pub user_agent: Option<String>,
    /// Log request and response bodies
    pub enable_logging: bool,
    /// Shortest delay between two polls, in milliseconds
    pub min_polling_delay_ms: Option<u64>,
    /// Longest delay between two polls, in milliseconds
    pub max_polling_delay_ms: Option<u64>,
    /// Shuffle base URLs once when the client is built
    pub shuffle_base_urls: Option<bool>,
    /// One-time codes tried for a second authentication factor
    pub max_totp_attempts: Option<u32>,
}

impl SdkSettings {
    /// Convert into a validated [`SdkConfig`]
    pub fn into_config(self) -> SdkResult<SdkConfig> {
        let mut config = SdkConfig::default();

        if let Some(base_urls) = self.base_urls {
            config = config.with_base_urls(base_urls);
        }

        match (self.username, self.password, self.client_certificate_path) {
            (_, _, Some(path)) => {
                let pem = std::fs::read(&path).map_err(|e| {
                    SdkError::ConfigurationError(format!("cannot read client certificate {path}: {e}"))
                })?;
                config = config.with_client_certificate(pem);
            }
            (Some(username), Some(password), None) => {
                config = match self.auth_mode.as_deref().unwrap_or("basic") {
                    "basic" => config.with_basic_auth(username, password),
                    "bearer" => config.with_bearer_auth(username, password),
                    other => {
                        return Err(SdkError::ConfigurationError(format!(
                            "unknown auth mode {other:?}"
                        )))
                    }
                };
            }
            (Some(_), None, None) | (None, Some(_), None) => {
                return Err(SdkError::ConfigurationError(
                    "username and password must be set together".to_string(),
                ));
            }
            (None, None, None) => {}
        }

        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.connect_timeout_secs {
            config = config.with_connect_timeout(Duration::from_secs(secs));
        }
        if let Some(user_agent) = self.user_agent {
            config = config.with_user_agent(user_agent);
        }

        if let Some(millis) = self.min_polling_delay_ms {
            config.polling.min_delay = Duration::from_millis(millis);
        }
        if let Some(millis) = self.max_polling_delay_ms {
            config.polling.max_delay = Duration::from_millis(millis);
        }
        if let Some(shuffle) = self.shuffle_base_urls {
            config = config.with_shuffle(shuffle);
        }
        if let Some(attempts) = self.max_totp_attempts {
            config = config.with_max_totp_attempts(attempts);
        }

        config.enable_logging = self.enable_logging;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for SDK configuration
#[derive(Debug, Default)]
pub struct SdkConfigBuilder {
    config: SdkConfig,
}

impl SdkConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_urls = vec![url.into()];
        self
    }

    /// Set several equivalent base URLs
    pub fn base_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.with_base_urls(urls);
        self
    }

    /// Set the authentication method
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.config.auth = auth;
        self
    }

    /// Set the timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Enable logging
    pub fn logging(mut self, enable: bool) -> Self {
        self.config.enable_logging = enable;
        self
    }

    /// Add a custom header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Set the polling delay bounds
    pub fn polling(mut self, polling: PollingConfig) -> Self {
        self.config.polling = polling;
        self
    }

    /// Enable or disable the initial endpoint shuffle
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.config.shuffle_base_urls = shuffle;
        self
    }

    /// Build the configuration
    pub fn build(self) -> SdkConfig {
        self.config
    }
}
