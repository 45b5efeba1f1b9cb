//! Request context threaded through every reporting call.
//!
//! A [`Context`] carries:
//! - A cancellation token shared with every context derived from it
//! - An optional deadline that derived contexts can only shorten
//! - Request-scoped string values (request ids, tenant names, ...)
//!
//! Reporters receive the context but are free to ignore it; the session
//! layer checks it before touching the database.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a context is no longer live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation, deadline and value propagation handle.
///
/// Cloning is cheap and yields a handle to the *same* context: cancelling a
/// clone cancels the original. Use [`Context::with_cancel`] to derive a
/// context that can be cancelled independently of its parent.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
    values: Arc<HashMap<String, String>>,
}

impl Context {
    /// A root context: never cancelled unless [`Context::cancel`] is called,
    /// no deadline, no values.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    fn derive(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            values: Arc::clone(&self.values),
        }
    }

    /// Derive a child that is cancelled with this context but can also be
    /// cancelled on its own.
    #[must_use]
    pub fn with_cancel(&self) -> Self {
        self.derive()
    }

    /// Derive a child with the given deadline.
    ///
    /// If this context already has an earlier deadline, the earlier one wins.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut child = self.derive();
        child.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        child
    }

    /// Derive a child whose deadline is `timeout` from now.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child carrying `key = value` on top of the inherited values.
    #[must_use]
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut child = self.derive();
        let mut values = (*self.values).clone();
        values.insert(key.into(), value.into());
        child.values = Arc::new(values);
        child
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `Some(Duration::ZERO)` once it passed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// True once the context is cancelled or past its deadline.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// The reason this context is done, or `None` while it is live.
    ///
    /// Cancellation is reported in preference to an expired deadline.
    #[must_use]
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Look up a request-scoped value.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// All request-scoped values, in no particular order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Wait until the context is cancelled or its deadline passes.
    ///
    /// Returns the reason. Must be awaited inside a tokio runtime.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => ContextError::Cancelled,
                    () = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                        ContextError::DeadlineExceeded
                    }
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Cancelled
            }
        }
    }
}
