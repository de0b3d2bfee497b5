//! Authentication strategies
//!
//! The dispatcher asks its [`Authenticator`] to decorate every outgoing
//! request, and gives it one chance to refresh its credentials after a
//! 401/403 response.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::{header, Identity, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cancellation::CancellationToken;
use crate::dispatcher::{Dispatcher, InvocationRequest};
use crate::error::{SdkError, SdkResult};

/// Decorates outgoing requests with credentials
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Attach credentials to `request`.
    ///
    /// `dispatcher` may be used to issue anonymous requests, e.g. to obtain a
    /// token.
    async fn authenticate(
        &self,
        dispatcher: &Dispatcher,
        request: RequestBuilder,
        token: Option<&CancellationToken>,
    ) -> SdkResult<RequestBuilder>;

    /// React to a 401/403 response. Returning `true` retries the request once.
    async fn handle_unauthorized(&self) -> bool {
        false
    }

    /// TLS client identity installed when the transport is built
    fn identity(&self) -> SdkResult<Option<Identity>> {
        Ok(None)
    }
}

/// Source of time-based one-time codes for accounts with a second factor
#[async_trait]
pub trait TotpProvider: Send + Sync {
    /// Code for the given 1-based attempt, or `None` to give up
    async fn pass_code(&self, attempt: u32) -> SdkResult<Option<String>>;
}

// ===== Anonymous =====

/// Sends requests without credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthenticator;

#[async_trait]
impl Authenticator for NoAuthenticator {
    async fn authenticate(
        &self,
        _dispatcher: &Dispatcher,
        request: RequestBuilder,
        _token: Option<&CancellationToken>,
    ) -> SdkResult<RequestBuilder> {
        Ok(request)
    }
}

// ===== Basic =====

/// Sends the username and password as HTTP basic authentication
#[derive(Clone)]
pub struct BasicAuthenticator {
    username: String,
    password: String,
}

impl BasicAuthenticator {
    /// Authenticator sending the given credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl Authenticator for BasicAuthenticator {
    async fn authenticate(
        &self,
        _dispatcher: &Dispatcher,
        request: RequestBuilder,
        _token: Option<&CancellationToken>,
    ) -> SdkResult<RequestBuilder> {
        Ok(request.basic_auth(&self.username, Some(&self.password)))
    }
}

// ===== Bearer =====

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TotpVerification<'a> {
    pass_code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssuedToken {
    access_token: String,
}

/// Exchanges a username and password for a bearer token.
///
/// The token is cached until the service rejects it. Tokens whose claims
/// carry a pending second factor are upgraded with codes from a
/// [`TotpProvider`].
pub struct BearerAuthenticator {
    username: String,
    password: String,
    totp: Option<Arc<dyn TotpProvider>>,
    max_totp_attempts: u32,
    cached: Mutex<Option<String>>,
}

impl BearerAuthenticator {
    /// Authenticator exchanging the given credentials for a token
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            totp: None,
            max_totp_attempts: 3,
            cached: Mutex::new(None),
        }
    }

    /// Source of one-time codes when the account has a second factor
    pub fn with_totp_provider(mut self, provider: Arc<dyn TotpProvider>) -> Self {
        self.totp = Some(provider);
        self
    }

    /// How many one-time codes are tried before giving up
    pub fn with_max_totp_attempts(mut self, attempts: u32) -> Self {
        self.max_totp_attempts = attempts;
        self
    }

    async fn acquire(
        &self,
        dispatcher: &Dispatcher,
        token: Option<&CancellationToken>,
    ) -> SdkResult<String> {
        let request = InvocationRequest::post("auth/tokens")
            .with_json(&TokenRequest {
                username: &self.username,
                password: &self.password,
            })?
            .anonymous();

        let response = dispatcher.invoke(request, token).await?;
        if !response.status().is_success() {
            return Err(response.unexpected());
        }

        let issued: IssuedToken = response.deserialize()?;
        if !requires_second_factor(&issued.access_token) {
            info!(username = %self.username, "Bearer token issued");
            return Ok(issued.access_token);
        }

        self.verify_second_factor(dispatcher, &issued.access_token, token)
            .await
    }

    async fn verify_second_factor(
        &self,
        dispatcher: &Dispatcher,
        interim: &str,
        token: Option<&CancellationToken>,
    ) -> SdkResult<String> {
        let provider = self.totp.as_ref().ok_or_else(|| SdkError::AuthorizationError {
            url: "auth/tokens".to_string(),
            message: "a second authentication factor is required but no TOTP provider is configured"
                .to_string(),
        })?;

        let mut last_error = None;
        for attempt in 1..=self.max_totp_attempts {
            let Some(pass_code) = provider.pass_code(attempt).await? else {
                break;
            };

            let request = InvocationRequest::post("auth/totp/verifications")
                .with_json(&TotpVerification {
                    pass_code: &pass_code,
                })?
                .with_header(header::AUTHORIZATION.as_str(), format!("Bearer {interim}"))
                .anonymous();

            match dispatcher.invoke(request, token).await {
                Ok(response) if response.status().is_success() => {
                    let issued: IssuedToken = response.deserialize()?;
                    info!(username = %self.username, attempt, "Second factor verified");
                    return Ok(issued.access_token);
                }
                Ok(response) => return Err(response.unexpected()),
                Err(error @ SdkError::AuthorizationError { .. }) => {
                    warn!(attempt, "One-time code rejected");
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(last_error.unwrap_or_else(|| SdkError::AuthorizationError {
            url: "auth/totp/verifications".to_string(),
            message: "no one-time code was supplied".to_string(),
        }))
    }
}

#[async_trait]
impl Authenticator for BearerAuthenticator {
    async fn authenticate(
        &self,
        dispatcher: &Dispatcher,
        request: RequestBuilder,
        token: Option<&CancellationToken>,
    ) -> SdkResult<RequestBuilder> {
        let mut cached = self.cached.lock().await;
        let bearer = match cached.as_ref() {
            Some(bearer) => bearer.clone(),
            None => {
                let bearer = self.acquire(dispatcher, token).await?;
                *cached = Some(bearer.clone());
                bearer
            }
        };

        Ok(request.bearer_auth(bearer))
    }

    async fn handle_unauthorized(&self) -> bool {
        let mut cached = self.cached.lock().await;
        debug!("Discarding rejected bearer token");
        cached.take().is_some()
    }
}

/// Whether the token's claims ask for a second factor (`mfa`).
///
/// Opaque tokens are treated as final.
fn requires_second_factor(access_token: &str) -> bool {
    let Some(payload) = access_token.split('.').nth(1) else {
        return false;
    };

    URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()
        .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
        .and_then(|claims| claims.get("mfa").cloned())
        .is_some_and(|mfa| match mfa {
            serde_json::Value::Bool(pending) => pending,
            serde_json::Value::Null => false,
            _ => true,
        })
}

// ===== Client certificate =====

/// Authenticates at the TLS layer with a client certificate
#[derive(Clone)]
pub struct ClientCertificateAuthenticator {
    pem: Vec<u8>,
}

impl ClientCertificateAuthenticator {
    /// PEM containing the certificate chain and its private key
    pub fn from_pem(pem: &[u8]) -> SdkResult<Self> {
        Identity::from_pem(pem).map_err(|e| {
            SdkError::ConfigurationError(format!("invalid client certificate: {e}"))
        })?;
        Ok(Self { pem: pem.to_vec() })
    }
}

#[async_trait]
impl Authenticator for ClientCertificateAuthenticator {
    async fn authenticate(
        &self,
        _dispatcher: &Dispatcher,
        request: RequestBuilder,
        _token: Option<&CancellationToken>,
    ) -> SdkResult<RequestBuilder> {
        Ok(request)
    }

    fn identity(&self) -> SdkResult<Option<Identity>> {
        Identity::from_pem(&self.pem)
            .map(Some)
            .map_err(|e| SdkError::ConfigurationError(format!("invalid client certificate: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(claims: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
            URL_SAFE_NO_PAD.encode(claims)
        )
    }

    #[test]
    fn test_second_factor_detection() {
        assert!(requires_second_factor(&jwt(r#"{"sub":"ops","mfa":true}"#)));
        assert!(requires_second_factor(&jwt(r#"{"sub":"ops","mfa":"totp"}"#)));
        assert!(!requires_second_factor(&jwt(r#"{"sub":"ops","mfa":false}"#)));
        assert!(!requires_second_factor(&jwt(r#"{"sub":"ops"}"#)));
    }

    #[test]
    fn test_opaque_tokens_are_final() {
        assert!(!requires_second_factor("opaque-token"));
        assert!(!requires_second_factor("a.!!!.c"));
    }

    #[test]
    fn test_invalid_client_certificate_is_rejected() {
        let result = ClientCertificateAuthenticator::from_pem(b"not a pem");
        assert!(matches!(result, Err(SdkError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn test_handle_unauthorized_requires_cached_token() {
        let bearer = BearerAuthenticator::new("ops", "secret");
        assert!(!bearer.handle_unauthorized().await);

        *bearer.cached.lock().await = Some("stale".to_string());
        assert!(bearer.handle_unauthorized().await);
        assert!(bearer.cached.lock().await.is_none());
    }
}
