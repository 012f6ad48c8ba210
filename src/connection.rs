//! Per-connection handles with one-message end-of-stream semantics.
//!
//! A [`Connection`] is the caller-supplied context of the rendezvous
//! protocol: a small opaque state created when a logical connection opens
//! and destroyed when it closes. Its only bookkeeping is the "has already
//! consumed its one message" flag — a handle that got its message reads
//! end-of-stream (an empty payload) from then on, without ever touching
//! the shared channel again.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cancel::CancelToken;
use crate::channel::RendezvousChannel;
use crate::error::{RecvError, SendError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric id.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A per-connection handle onto a shared [`RendezvousChannel`].
///
/// The channel itself carries no per-caller state; this handle owns it.
/// Receiving is connection-scoped (one message, then end-of-stream);
/// sending passes straight through.
#[derive(Debug)]
pub struct Connection {
    channel: Arc<RendezvousChannel>,
    id: ConnectionId,
    consumed: bool,
}

impl Connection {
    /// Opens a handle onto `channel`.
    #[must_use]
    pub fn open(channel: Arc<RendezvousChannel>) -> Self {
        let id = ConnectionId::next();
        debug!(%id, "connection opened");
        Self {
            channel,
            id,
            consumed: false,
        }
    }

    /// Returns this connection's identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns true if this handle already consumed its one message.
    #[must_use]
    pub const fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Re-arms the handle, as if it had been closed and reopened.
    pub fn reset(&mut self) {
        trace!(id = %self.id, "connection reset");
        self.consumed = false;
    }

    /// Receives this connection's one message.
    ///
    /// A handle that already consumed its message returns an empty payload
    /// immediately (end-of-stream) without consulting the channel. A
    /// zero-length message received from the channel still counts as the
    /// one message.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Interrupted` if cancelled while parked; the
    /// handle stays un-consumed and may retry.
    pub fn recv(&mut self, cx: &CancelToken, max_len: usize) -> Result<Vec<u8>, RecvError> {
        if self.consumed {
            trace!(id = %self.id, "read on consumed connection, end-of-stream");
            return Ok(Vec::new());
        }
        let payload = self.channel.recv(cx, max_len)?;
        self.consumed = true;
        trace!(id = %self.id, len = payload.len(), "connection consumed its message");
        Ok(payload)
    }

    /// Sends `payload` through the underlying channel.
    ///
    /// Sending is not connection-scoped; this is a pass-through.
    ///
    /// # Errors
    ///
    /// See [`RendezvousChannel::send`].
    pub fn send(&self, cx: &CancelToken, payload: &[u8]) -> Result<usize, SendError> {
        self.channel.send(cx, payload)
    }

    /// Returns the shared channel this handle is connected to.
    #[must_use]
    pub fn channel(&self) -> &Arc<RendezvousChannel> {
        &self.channel
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        debug!(id = %self.id, consumed = self.consumed, "connection closed");
    }
}
