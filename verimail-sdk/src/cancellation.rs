//! Cooperative cancellation
//!
//! A [`CancellationToken`] is shared by every asynchronous operation of the SDK.
//! Besides the awaitable [`CancellationToken::cancelled`] signal it keeps a
//! registry of callbacks so that the dispatcher can abort an in-flight request
//! the moment cancellation is requested.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{SdkError, SdkResult};

type Callback = Box<dyn FnOnce() + Send>;

/// Identifies a callback registered with a [`CancellationToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

#[derive(Default)]
struct Registry {
    canceled: bool,
    next_id: u64,
    callbacks: Vec<(CallbackId, Callback)>,
}

/// Monotonic cancellation signal with callback registration.
///
/// Cloning yields a handle to the same token.
#[derive(Clone, Default)]
pub struct CancellationToken {
    registry: Arc<Mutex<Registry>>,
    signal: tokio_util::sync::CancellationToken,
}

impl CancellationToken {
    /// Create a new, active token
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested
    pub fn is_canceled(&self) -> bool {
        self.lock().canceled
    }

    /// Register a callback to run on cancellation.
    ///
    /// When the token is already canceled the callback runs immediately, on the
    /// calling thread, and the returned id refers to nothing.
    pub fn register<F>(&self, callback: F) -> CallbackId
    where
        F: FnOnce() + Send + 'static,
    {
        let mut registry = self.lock();
        let id = CallbackId(registry.next_id);
        registry.next_id += 1;

        if registry.canceled {
            drop(registry);
            callback();
        } else {
            registry.callbacks.push((id, Box::new(callback)));
        }

        id
    }

    /// Remove a registered callback; unknown ids are ignored
    pub fn unregister(&self, id: CallbackId) {
        self.lock().callbacks.retain(|(registered, _)| *registered != id);
    }

    /// Register a callback that is removed again when the returned guard drops
    pub fn register_scoped<F>(&self, callback: F) -> Registration
    where
        F: FnOnce() + Send + 'static,
    {
        Registration {
            token: self.clone(),
            id: self.register(callback),
        }
    }

    /// Request cancellation.
    ///
    /// Every registered callback runs exactly once, in registration order, and
    /// the registry is cleared. Subsequent calls do nothing.
    pub fn cancel(&self) {
        let callbacks = {
            let mut registry = self.lock();
            if registry.canceled {
                return;
            }
            registry.canceled = true;
            std::mem::take(&mut registry.callbacks)
        };

        self.signal.cancel();

        for (_, callback) in callbacks {
            callback();
        }
    }

    /// Fail with [`SdkError::OperationCanceled`] if cancellation was requested
    pub fn check_cancelled(&self) -> SdkResult<()> {
        if self.is_canceled() {
            Err(SdkError::OperationCanceled)
        } else {
            Ok(())
        }
    }

    /// Resolve once cancellation is requested
    pub async fn cancelled(&self) {
        self.signal.cancelled().await;
    }

    #[cfg(test)]
    pub(crate) fn registered_callbacks(&self) -> usize {
        self.lock().callbacks.len()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A panicking callback never runs under the lock, so poisoning only
        // means another thread panicked while pushing or removing an entry.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.lock();
        f.debug_struct("CancellationToken")
            .field("canceled", &registry.canceled)
            .field("callbacks", &registry.callbacks.len())
            .finish()
    }
}

/// Scoped callback registration; unregisters on drop.
#[must_use = "dropping the registration unregisters the callback"]
pub struct Registration {
    token: CancellationToken,
    id: CallbackId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.token.unregister(self.id);
    }
}

/// `check_cancelled` for an optional token
pub(crate) fn check(token: Option<&CancellationToken>) -> SdkResult<()> {
    token.map_or(Ok(()), CancellationToken::check_cancelled)
}

/// Sleep for `delay`, returning early with [`SdkError::OperationCanceled`] if
/// the token fires first.
pub(crate) async fn sleep(delay: std::time::Duration, token: Option<&CancellationToken>) -> SdkResult<()> {
    match token {
        Some(token) => {
            tokio::select! {
                _ = token.cancelled() => Err(SdkError::OperationCanceled),
                _ = tokio::time::sleep(delay) => Ok(()),
            }
        }
        None => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}
