//! Cancellation and deadlines for backend calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::types::{Result, SearchError};

/// Caller-supplied cancellation and deadline threaded into every backend call.
///
/// Every context owns a cancellation flag from construction. Cloning shares
/// it, so cancelling through any handle stops every iterator built from it.
#[derive(Clone, Debug)]
pub struct QueryContext {
    cancel_token: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::background()
    }
}

impl QueryContext {
    /// A context with no deadline that runs until cancelled.
    pub fn background() -> Self {
        Self {
            cancel_token: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Replaces the cancellation flag with an externally owned one.
    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel_token = token;
        self
    }

    /// Attaches an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attaches a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Shared handle to the cancellation flag.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_token)
    }

    /// Sets the cancellation flag.
    pub fn cancel(&self) {
        self.cancel_token.store(true, Ordering::SeqCst);
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fails if the context was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.cancel_token.load(Ordering::SeqCst) {
            return Err(SearchError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(SearchError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}
