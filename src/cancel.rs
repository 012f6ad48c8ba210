//! Cooperative cancellation token, kind, and reason types.
//!
//! Cancellation is a first-class protocol, not a silent drop. A blocked
//! channel participant observes cancellation at a checkpoint on every wake,
//! unwinds its partial state (waiter count, lock), and returns an
//! interruption error to its caller. The token never interrupts a critical
//! section: it is only consulted between waits, while the participant holds
//! the channel lock.

use core::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, ErrorKind};

/// The kind of cancellation request.
///
/// Higher kinds take precedence when a reason is strengthened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CancelKind {
    /// Explicit cancellation requested by user code.
    User,
    /// Cancellation due to a timeout or deadline.
    Timeout,
    /// Cancellation due to host shutdown.
    Shutdown,
}

impl fmt::Display for CancelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Timeout => write!(f, "timeout"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// The reason for a cancellation, including kind and optional context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelReason {
    /// The kind of cancellation.
    pub kind: CancelKind,
    /// Optional human-readable message (static for determinism).
    pub message: Option<&'static str>,
}

impl CancelReason {
    /// Creates a new cancellation reason with the given kind.
    #[must_use]
    pub const fn new(kind: CancelKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Creates a user cancellation reason with a message.
    #[must_use]
    pub const fn user(message: &'static str) -> Self {
        Self {
            kind: CancelKind::User,
            message: Some(message),
        }
    }

    /// Creates a timeout cancellation reason.
    #[must_use]
    pub const fn timeout() -> Self {
        Self::new(CancelKind::Timeout)
    }

    /// Creates a shutdown cancellation reason.
    #[must_use]
    pub const fn shutdown() -> Self {
        Self::new(CancelKind::Shutdown)
    }

    /// Strengthens this reason with another, keeping the more severe one.
    ///
    /// Returns `true` if the reason was changed.
    pub fn strengthen(&mut self, other: &Self) -> bool {
        if other.kind > self.kind {
            *self = *other;
            return true;
        }
        if other.kind == self.kind && self.message.is_none() && other.message.is_some() {
            self.message = other.message;
            return true;
        }
        false
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(msg) = self.message {
            write!(f, " ({msg})")?;
        }
        Ok(())
    }
}

/// Marker error for an observed cancellation, carrying the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled {
    /// The reason for cancellation.
    pub reason: CancelReason,
}

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cancelled: {}", self.reason)
    }
}

impl std::error::Error for Cancelled {}

impl From<Cancelled> for Error {
    fn from(c: Cancelled) -> Self {
        Self::new(ErrorKind::Interrupted).with_message(c.reason.to_string())
    }
}

#[derive(Debug)]
struct TokenInner {
    requested: AtomicBool,
    reason: Mutex<Option<CancelReason>>,
}

/// A cheaply clonable cancellation token.
///
/// Clones share the same underlying state: a `cancel` through any clone is
/// immediately visible to all of them. The token is the external interrupt
/// signal of the rendezvous protocol; blocked participants poll it via
/// [`checkpoint`](Self::checkpoint) on every wake.
///
/// # Example
///
/// ```
/// use handoff::{CancelReason, CancelToken};
///
/// let cx = CancelToken::new();
/// let peer = cx.clone();
/// assert!(cx.checkpoint().is_ok());
///
/// peer.cancel(CancelReason::user("operator abort"));
/// assert!(cx.is_cancel_requested());
/// assert!(cx.checkpoint().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

impl CancelToken {
    /// Creates a fresh, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                requested: AtomicBool::new(false),
                reason: Mutex::new(None),
            }),
        }
    }

    /// Requests cancellation with the given reason.
    ///
    /// Idempotent: a second request only strengthens the stored reason
    /// (higher [`CancelKind`] wins).
    pub fn cancel(&self, reason: CancelReason) {
        let mut stored = self.inner.reason.lock().expect("cancel token lock poisoned");
        match stored.as_mut() {
            Some(existing) => {
                existing.strengthen(&reason);
            }
            None => *stored = Some(reason),
        }
        drop(stored);
        self.inner.requested.store(true, Ordering::Release);
    }

    /// Returns true if cancellation has been requested.
    ///
    /// This does not consume or clear the request; unlike
    /// [`checkpoint`](Self::checkpoint) it cannot be used with `?`.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Observation point for cancellation.
    ///
    /// Returns `Err(Cancelled)` once cancellation has been requested. This
    /// is the only point at which the channel's wait loops observe the
    /// token, so cancellation latency is bounded by the configured poll
    /// interval.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancel_requested() {
            let reason = self
                .reason()
                .unwrap_or(CancelReason::new(CancelKind::User));
            return Err(Cancelled { reason });
        }
        Ok(())
    }

    /// Returns the stored cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        *self.inner.reason.lock().expect("cancel token lock poisoned")
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_passes_checkpoint() {
        let cx = CancelToken::new();
        assert!(!cx.is_cancel_requested());
        assert!(cx.checkpoint().is_ok());
        assert!(cx.reason().is_none());
    }

    #[test]
    fn cancel_is_visible_to_clones() {
        let cx = CancelToken::new();
        let clone = cx.clone();
        clone.cancel(CancelReason::user("test abort"));

        let err = cx.checkpoint().expect_err("checkpoint must fail");
        assert_eq!(err.reason.kind, CancelKind::User);
        assert_eq!(err.reason.message, Some("test abort"));
    }

    #[test]
    fn strengthen_keeps_more_severe_kind() {
        let cx = CancelToken::new();
        cx.cancel(CancelReason::user("first"));
        cx.cancel(CancelReason::shutdown());
        assert_eq!(cx.reason().map(|r| r.kind), Some(CancelKind::Shutdown));

        // Weaker requests do not downgrade.
        cx.cancel(CancelReason::timeout());
        assert_eq!(cx.reason().map(|r| r.kind), Some(CancelKind::Shutdown));
    }

    #[test]
    fn cancelled_converts_to_interrupted_error() {
        let cx = CancelToken::new();
        cx.cancel(CancelReason::timeout());
        let err: crate::error::Error = cx.checkpoint().unwrap_err().into();
        assert_eq!(err.kind(), crate::error::ErrorKind::Interrupted);
        assert!(err.is_retryable());
    }
}
