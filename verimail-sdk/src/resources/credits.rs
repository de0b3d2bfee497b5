//! Credits resource client
//!
//! Account balance and daily credit consumption.

use std::sync::Arc;
use verimail_core::{Balance, DailyUsage, DailyUsageListingOptions};

use crate::cancellation::CancellationToken;
use crate::dispatcher::{Dispatcher, InvocationRequest};
use crate::error::SdkResult;
use crate::pagination::Paginator;

/// Client for credit operations
#[derive(Debug, Clone)]
pub struct CreditsClient {
    dispatcher: Arc<Dispatcher>,
}

impl CreditsClient {
    /// Create a new credits client
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Get the current credit balance
    pub async fn get_balance(&self, token: Option<&CancellationToken>) -> SdkResult<Balance> {
        let response = self
            .dispatcher
            .invoke(InvocationRequest::get("credits/balance"), token)
            .await?;

        if !response.status().is_success() {
            return Err(response.unexpected());
        }
        response.deserialize()
    }

    /// List daily credit usage lazily, one day at a time
    pub fn list_daily_usage(
        &self,
        options: DailyUsageListingOptions,
        token: Option<&CancellationToken>,
    ) -> Paginator<DailyUsage> {
        Paginator::new(
            Arc::clone(&self.dispatcher),
            "credits/daily-usage",
            &options,
            token,
        )
    }
}
