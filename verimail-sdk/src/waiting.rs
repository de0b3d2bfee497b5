//! Waiting for validation jobs to complete
//!
//! A job is polled with an adaptive delay until the service reports it as
//! completed, it disappears, or the caller cancels.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use verimail_core::ValidationOverview;

use crate::cancellation::{self, CancellationToken};
use crate::config::PollingConfig;
use crate::error::SdkResult;

/// Called with every non-final overview observed while waiting
pub type ProgressCallback = Arc<dyn Fn(&ValidationOverview) + Send + Sync>;

/// Whether, and how, an operation waits for its job to complete
#[derive(Clone, Default)]
pub struct WaitingStrategy {
    /// Poll until the job leaves the in-progress state
    pub wait_for_completion: bool,
    progress: Option<ProgressCallback>,
}

impl WaitingStrategy {
    /// Poll until the job completes
    pub fn wait() -> Self {
        Self {
            wait_for_completion: true,
            progress: None,
        }
    }

    /// Return whatever the first response contains
    pub fn no_wait() -> Self {
        Self::default()
    }

    /// Observe progress while waiting
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ValidationOverview) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    fn report(&self, overview: &ValidationOverview) {
        if let Some(progress) = &self.progress {
            progress(overview);
        }
    }
}

impl fmt::Debug for WaitingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitingStrategy")
            .field("wait_for_completion", &self.wait_for_completion)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// States of the polling state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// No wait was requested; the first snapshot is final
    NotWaiting,
    /// The job is in progress and will be polled again
    Waiting,
    /// The job completed
    Completed,
    /// The caller canceled the wait
    Canceled,
    /// The job was deleted or expired while being polled
    Vanished,
}

impl WaitState {
    fn initial(strategy: &WaitingStrategy, overview: &ValidationOverview) -> Self {
        if !strategy.wait_for_completion {
            WaitState::NotWaiting
        } else if overview.is_completed() {
            WaitState::Completed
        } else {
            WaitState::Waiting
        }
    }

    fn after_poll(overview: &ValidationOverview) -> Self {
        if overview.is_completed() {
            WaitState::Completed
        } else if overview.status.is_terminal() {
            WaitState::Vanished
        } else {
            WaitState::Waiting
        }
    }
}

/// Delay before the next poll of `overview`.
///
/// Grows with the job size as `2^(log10(entries) - 1)` seconds, unless the
/// service supplied an estimate. Either way the result lies within the
/// configured bounds.
pub fn compute_delay(overview: &ValidationOverview, polling: &PollingConfig) -> Duration {
    let seconds = match overview.eta() {
        Some(eta) => eta.as_secs_f64(),
        None => 2f64.powf(f64::from(overview.no_of_entries).log10() - 1.0),
    };

    let lower = polling.min_delay.min(polling.max_delay);
    let upper = polling.max_delay.max(polling.min_delay);
    let (min, max) = (lower.as_secs_f64(), upper.as_secs_f64());
    let seconds = if seconds.is_nan() { min } else { seconds.clamp(min, max) };

    Duration::try_from_secs_f64(seconds).unwrap_or(upper)
}

/// Drives one wait, starting from the first snapshot of a job
pub(crate) struct Poller<'a> {
    strategy: &'a WaitingStrategy,
    polling: PollingConfig,
    token: Option<&'a CancellationToken>,
}

impl<'a> Poller<'a> {
    pub(crate) fn new(
        strategy: &'a WaitingStrategy,
        polling: PollingConfig,
        token: Option<&'a CancellationToken>,
    ) -> Self {
        Self {
            strategy,
            polling,
            token,
        }
    }

    /// Poll until a terminal state.
    ///
    /// `refetch` performs exactly one fetch by id and yields `None` when the
    /// job no longer exists. The returned snapshot is `None` only when the
    /// job vanished; cancellation surfaces as an error.
    pub(crate) async fn run<T, O, F, Fut>(
        &self,
        first: T,
        overview_of: O,
        mut refetch: F,
    ) -> SdkResult<(WaitState, Option<T>)>
    where
        O: Fn(&T) -> &ValidationOverview,
        F: FnMut(String) -> Fut,
        Fut: Future<Output = SdkResult<Option<T>>>,
    {
        let mut snapshot = first;
        let mut state = WaitState::initial(self.strategy, overview_of(&snapshot));

        while state == WaitState::Waiting {
            let overview = overview_of(&snapshot);
            self.strategy.report(overview);

            let delay = compute_delay(overview, &self.polling);
            let id = overview.id.clone();
            debug!(id = %id, delay = ?delay, "Waiting before polling validation");

            if let Err(error) = cancellation::sleep(delay, self.token).await {
                debug!(id = %id, state = ?WaitState::Canceled, "Stopped waiting");
                return Err(error);
            }

            match refetch(id.clone()).await? {
                Some(refreshed) => {
                    state = WaitState::after_poll(overview_of(&refreshed));
                    snapshot = refreshed;
                }
                None => state = WaitState::Vanished,
            }
        }

        match state {
            WaitState::Vanished => {
                info!(state = ?state, "Validation is gone");
                Ok((state, None))
            }
            WaitState::Completed => {
                info!(id = %overview_of(&snapshot).id, "Validation completed");
                Ok((state, Some(snapshot)))
            }
            _ => Ok((state, Some(snapshot))),
        }
    }
}
