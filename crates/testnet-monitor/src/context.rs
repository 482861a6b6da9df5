use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::Error;

/// Cancellation scope of a wait.
///
/// Combines a cancellation token with an optional deadline. Children inherit
/// both: cancelling a parent cancels its children, and a child's deadline is
/// never later than its parent's.
#[derive(Clone, Debug)]
pub struct WaitContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl WaitContext {
    /// Creates a root context without deadline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Creates a child context that can be cancelled independently.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Creates a child context that expires after `timeout`.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            token: self.token.child_token(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    /// Cancels this context and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the error the context ended with, or `None` while it is live.
    #[must_use]
    pub fn error(&self) -> Option<Error> {
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(Error::DeadlineExceeded)
        } else if self.token.is_cancelled() {
            Some(Error::Cancelled)
        } else {
            None
        }
    }

    /// Whether the context has ended.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.error().is_some()
    }

    /// Resolves once the context ends, yielding the reason.
    pub async fn done(&self) -> Error {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => return Error::DeadlineExceeded,
                }
            }
            None => self.token.cancelled().await,
        }
        self.error().unwrap_or(Error::Cancelled)
    }
}

impl Default for WaitContext {
    fn default() -> Self {
        Self::new()
    }
}
