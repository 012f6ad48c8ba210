//! Single-slot rendezvous channel over owned byte buffers.
//!
//! The channel is one shared synchronization object: a slot for at most one
//! pending message, a count of parked receivers, one mutex guarding both,
//! and two conditions (`readable`, `writable`). Senders block until a
//! receiver is demonstrably waiting *and* the slot is free; receivers block
//! until a message is present. All waits are bounded so a cancellation
//! request is observed within the configured poll interval.
//!
//! # Cancel Safety
//!
//! Every exit path, including cancellation, runs its state cleanup under
//! the lock and releases the lock by RAII at the return. A cancelled
//! receiver decrements the waiter count exactly once; a cancelled sender
//! has nothing to unwind because it commits nothing before the predicate
//! holds.

use std::sync::{Condvar, Mutex};

use tracing::trace;

use crate::cancel::CancelToken;
use crate::config::ChannelConfig;
use crate::error::{RecvError, SendError, TryRecvError, TrySendError};

/// Shared state guarded by the channel lock.
#[derive(Debug)]
struct ChannelState {
    /// The single message slot. `None` is empty; `Some` holds one
    /// unconsumed message.
    slot: Option<Vec<u8>>,
    /// Number of receivers currently parked in the wait loop.
    waiting_receivers: usize,
}

impl ChannelState {
    const fn new() -> Self {
        Self {
            slot: None,
            waiting_receivers: 0,
        }
    }

    /// True when a sender may commit: a receiver is parked and the slot
    /// is free.
    const fn sender_may_proceed(&self) -> bool {
        self.waiting_receivers > 0 && self.slot.is_none()
    }
}

/// A synchronous, single-slot rendezvous channel for byte payloads.
///
/// The channel is explicitly constructed and shared by reference (usually
/// an `Arc`); it is never a process-global singleton. Arbitrarily many
/// threads may call [`send`](Self::send) and [`recv`](Self::recv)
/// concurrently.
///
/// # Protocol
///
/// Per slot: `EMPTY → (send commits) → OCCUPIED → (recv drains) → EMPTY`.
/// Entry to `OCCUPIED` is gated on `waiting_receivers > 0`; exit is
/// unconditional once a receiver holds the lock and finds a message.
///
/// No FIFO ordering is promised among multiple parked senders or
/// receivers: wakes are broadcast and the losers re-check and re-block.
#[derive(Debug)]
pub struct RendezvousChannel {
    state: Mutex<ChannelState>,
    /// Signaled when the slot transitions empty → occupied.
    readable: Condvar,
    /// Signaled when the slot transitions occupied → empty and when the
    /// waiting-receiver count leaves zero.
    writable: Condvar,
    config: ChannelConfig,
}

impl RendezvousChannel {
    /// Creates a channel with the given configuration (normalized).
    #[must_use]
    pub fn new(mut config: ChannelConfig) -> Self {
        config.normalize();
        Self {
            state: Mutex::new(ChannelState::new()),
            readable: Condvar::new(),
            writable: Condvar::new(),
            config,
        }
    }

    /// Returns the channel's configuration.
    #[must_use]
    pub const fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Sends `payload`, blocking until a receiver is parked and the slot
    /// is free.
    ///
    /// The payload is copied into a channel-owned buffer; the receiver
    /// only ever sees a copy. A zero-length payload is a valid message and
    /// still performs a full rendezvous. Returns the number of bytes
    /// accepted (always the full payload).
    ///
    /// # Errors
    ///
    /// - `SendError::PayloadTooLarge` if the payload exceeds the
    ///   configured maximum; nothing is copied and the slot is untouched
    /// - `SendError::AllocationFailed` if message storage could not be
    ///   reserved; the slot is untouched
    /// - `SendError::Interrupted` if `cx` was cancelled while parked
    pub fn send(&self, cx: &CancelToken, payload: &[u8]) -> Result<usize, SendError> {
        if payload.len() > self.config.max_payload {
            return Err(SendError::PayloadTooLarge {
                len: payload.len(),
                max: self.config.max_payload,
            });
        }

        let mut state = self.state.lock().expect("channel lock poisoned");
        while !state.sender_may_proceed() {
            // Checkpoint before every wait: a wake does not imply the
            // predicate holds (spurious wakes, racing senders).
            if cx.checkpoint().is_err() {
                trace!(
                    waiting = state.waiting_receivers,
                    occupied = state.slot.is_some(),
                    "send interrupted while parked"
                );
                return Err(SendError::Interrupted);
            }
            let (guard, _timed_out) = self
                .writable
                .wait_timeout(state, self.config.cancel_poll_interval)
                .expect("channel lock poisoned");
            state = guard;
        }

        let mut message = Vec::new();
        if message.try_reserve_exact(payload.len()).is_err() {
            return Err(SendError::AllocationFailed);
        }
        message.extend_from_slice(payload);
        state.slot = Some(message);
        trace!(len = payload.len(), "message committed to slot");
        drop(state);

        self.readable.notify_all();
        Ok(payload.len())
    }

    /// Receives a message, blocking until one is committed.
    ///
    /// On entry the receiver announces itself (incrementing the parked
    /// count and signaling `writable`) so a blocked sender can observe it.
    /// Up to `max_len` bytes are copied out; a longer stored message is
    /// truncated and the remainder discarded, never requeued.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Interrupted` if `cx` was cancelled while
    /// parked. The waiter count is restored before returning.
    pub fn recv(&self, cx: &CancelToken, max_len: usize) -> Result<Vec<u8>, RecvError> {
        let mut state = self.state.lock().expect("channel lock poisoned");
        state.waiting_receivers += 1;
        trace!(waiting = state.waiting_receivers, "receiver parked");
        // Announce presence before the first wait so a parked sender
        // re-checks its compound predicate.
        self.writable.notify_all();

        loop {
            if let Some(stored) = state.slot.take() {
                state.waiting_receivers -= 1;
                let copied = stored.len().min(max_len);
                let out = stored[..copied].to_vec();
                trace!(
                    stored = stored.len(),
                    copied,
                    waiting = state.waiting_receivers,
                    "message claimed"
                );
                drop(state);
                // Slot is empty again; wake parked senders.
                self.writable.notify_all();
                return Ok(out);
            }

            if cx.checkpoint().is_err() {
                state.waiting_receivers -= 1;
                trace!(
                    waiting = state.waiting_receivers,
                    "recv interrupted while parked"
                );
                return Err(RecvError::Interrupted);
            }

            let (guard, _timed_out) = self
                .readable
                .wait_timeout(state, self.config.cancel_poll_interval)
                .expect("channel lock poisoned");
            state = guard;
        }
    }

    /// Attempts to send without blocking.
    ///
    /// # Errors
    ///
    /// - `TrySendError::NoReceiver` if no receiver is parked
    /// - `TrySendError::Occupied` if the slot holds an unconsumed message
    /// - `TrySendError::PayloadTooLarge` / `AllocationFailed` as for
    ///   [`send`](Self::send)
    pub fn try_send(&self, payload: &[u8]) -> Result<usize, TrySendError> {
        if payload.len() > self.config.max_payload {
            return Err(TrySendError::PayloadTooLarge {
                len: payload.len(),
                max: self.config.max_payload,
            });
        }

        let mut state = self.state.lock().expect("channel lock poisoned");
        if state.slot.is_some() {
            return Err(TrySendError::Occupied);
        }
        if state.waiting_receivers == 0 {
            return Err(TrySendError::NoReceiver);
        }

        let mut message = Vec::new();
        if message.try_reserve_exact(payload.len()).is_err() {
            return Err(TrySendError::AllocationFailed);
        }
        message.extend_from_slice(payload);
        state.slot = Some(message);
        trace!(len = payload.len(), "message committed to slot (try_send)");
        drop(state);

        self.readable.notify_all();
        Ok(payload.len())
    }

    /// Attempts to receive without blocking or parking.
    ///
    /// Does not touch the waiting-receiver count: a `try_recv` caller is
    /// never "demonstrably waiting" and so never enables a blocked sender
    /// by itself.
    ///
    /// # Errors
    ///
    /// Returns `TryRecvError::Empty` if no message is pending.
    pub fn try_recv(&self, max_len: usize) -> Result<Vec<u8>, TryRecvError> {
        let mut state = self.state.lock().expect("channel lock poisoned");
        let Some(stored) = state.slot.take() else {
            return Err(TryRecvError::Empty);
        };
        let copied = stored.len().min(max_len);
        let out = stored[..copied].to_vec();
        trace!(stored = stored.len(), copied, "message claimed (try_recv)");
        drop(state);

        self.writable.notify_all();
        Ok(out)
    }

    /// Returns the number of receivers currently parked in the wait loop.
    #[must_use]
    pub fn waiting_receivers(&self) -> usize {
        self.state
            .lock()
            .expect("channel lock poisoned")
            .waiting_receivers
    }

    /// Returns true if the slot holds an unconsumed message.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.state
            .lock()
            .expect("channel lock poisoned")
            .slot
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelReason;
    use crate::test_utils::{init_test_logging, wait_until};
    use std::sync::Arc;
    use std::time::Duration;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    fn test_channel() -> Arc<RendezvousChannel> {
        Arc::new(RendezvousChannel::new(ChannelConfig::default()))
    }

    fn parked_receiver(
        channel: &Arc<RendezvousChannel>,
        cx: &CancelToken,
        max_len: usize,
    ) -> std::thread::JoinHandle<Result<Vec<u8>, RecvError>> {
        let channel = Arc::clone(channel);
        let cx = cx.clone();
        std::thread::spawn(move || channel.recv(&cx, max_len))
    }

    #[test]
    fn basic_rendezvous() {
        init_test("basic_rendezvous");
        let channel = test_channel();
        let cx = CancelToken::new();

        let receiver = parked_receiver(&channel, &cx, 16);
        assert!(
            wait_until(Duration::from_secs(5), || channel.waiting_receivers() == 1),
            "receiver never parked"
        );

        let sent = channel.send(&cx, b"hello").expect("send failed");
        crate::assert_with_log!(sent == 5, "bytes accepted", 5, sent);

        let got = receiver.join().unwrap().expect("recv failed");
        crate::assert_with_log!(got == b"hello", "payload", b"hello".to_vec(), got);
        crate::assert_with_log!(
            channel.waiting_receivers() == 0,
            "waiter count restored",
            0usize,
            channel.waiting_receivers()
        );
        crate::test_complete!("basic_rendezvous");
    }

    #[test]
    fn zero_length_message_rendezvouses() {
        init_test("zero_length_message_rendezvouses");
        let channel = test_channel();
        let cx = CancelToken::new();

        let receiver = parked_receiver(&channel, &cx, 10);
        assert!(
            wait_until(Duration::from_secs(5), || channel.waiting_receivers() == 1),
            "receiver never parked"
        );

        let sent = channel.send(&cx, b"").expect("send failed");
        crate::assert_with_log!(sent == 0, "bytes accepted", 0, sent);

        let got = receiver.join().unwrap().expect("recv failed");
        crate::assert_with_log!(got.is_empty(), "empty payload", 0, got.len());
        crate::test_complete!("zero_length_message_rendezvouses");
    }

    #[test]
    fn truncation_returns_prefix() {
        init_test("truncation_returns_prefix");
        let channel = test_channel();
        let cx = CancelToken::new();

        let receiver = parked_receiver(&channel, &cx, 5);
        assert!(
            wait_until(Duration::from_secs(5), || channel.waiting_receivers() == 1),
            "receiver never parked"
        );

        channel.send(&cx, b"hello world").expect("send failed");
        let got = receiver.join().unwrap().expect("recv failed");
        crate::assert_with_log!(got == b"hello", "truncated prefix", b"hello".to_vec(), got);

        // The remainder is discarded, not requeued: the next rendezvous
        // carries the next payload in full.
        crate::assert_with_log!(!channel.has_pending(), "slot drained", false, channel.has_pending());
        let receiver = parked_receiver(&channel, &cx, 64);
        assert!(
            wait_until(Duration::from_secs(5), || channel.waiting_receivers() == 1),
            "receiver never parked"
        );
        channel.send(&cx, b"next").expect("send failed");
        let got = receiver.join().unwrap().expect("recv failed");
        crate::assert_with_log!(got == b"next", "next payload intact", b"next".to_vec(), got);
        crate::test_complete!("truncation_returns_prefix");
    }

    #[test]
    fn try_send_requires_parked_receiver() {
        init_test("try_send_requires_parked_receiver");
        let channel = test_channel();

        let err = channel.try_send(b"x").expect_err("must refuse");
        crate::assert_with_log!(
            err == TrySendError::NoReceiver,
            "no receiver",
            TrySendError::NoReceiver,
            err
        );
        crate::assert_with_log!(!channel.has_pending(), "slot untouched", false, channel.has_pending());
        crate::test_complete!("try_send_requires_parked_receiver");
    }

    #[test]
    fn try_recv_empty() {
        init_test("try_recv_empty");
        let channel = test_channel();
        let err = channel.try_recv(16).expect_err("must be empty");
        crate::assert_with_log!(
            err == TryRecvError::Empty,
            "empty slot",
            TryRecvError::Empty,
            err
        );
        crate::test_complete!("try_recv_empty");
    }

    #[test]
    fn payload_too_large_is_rejected_without_blocking() {
        init_test("payload_too_large_is_rejected_without_blocking");
        let channel = Arc::new(RendezvousChannel::new(ChannelConfig {
            max_payload: 4,
            ..ChannelConfig::default()
        }));
        let cx = CancelToken::new();

        let err = channel.send(&cx, b"too long").expect_err("must reject");
        crate::assert_with_log!(
            err == SendError::PayloadTooLarge { len: 8, max: 4 },
            "payload bound",
            SendError::PayloadTooLarge { len: 8, max: 4 },
            err
        );
        crate::assert_with_log!(!channel.has_pending(), "slot untouched", false, channel.has_pending());
        crate::test_complete!("payload_too_large_is_rejected_without_blocking");
    }

    #[test]
    fn cancelled_receiver_restores_waiter_count() {
        init_test("cancelled_receiver_restores_waiter_count");
        let channel = test_channel();
        let cx = CancelToken::new();

        let receiver = parked_receiver(&channel, &cx, 16);
        assert!(
            wait_until(Duration::from_secs(5), || channel.waiting_receivers() == 1),
            "receiver never parked"
        );

        cx.cancel(CancelReason::user("test abort"));
        let err = receiver.join().unwrap().expect_err("must be interrupted");
        crate::assert_with_log!(
            err == RecvError::Interrupted,
            "interrupted",
            RecvError::Interrupted,
            err
        );
        crate::assert_with_log!(
            channel.waiting_receivers() == 0,
            "waiter count restored",
            0usize,
            channel.waiting_receivers()
        );

        // The channel is still fully usable by fresh participants.
        let cx2 = CancelToken::new();
        let receiver = parked_receiver(&channel, &cx2, 16);
        assert!(
            wait_until(Duration::from_secs(5), || channel.waiting_receivers() == 1),
            "receiver never parked"
        );
        channel.send(&cx2, b"after").expect("send failed");
        let got = receiver.join().unwrap().expect("recv failed");
        crate::assert_with_log!(got == b"after", "payload", b"after".to_vec(), got);
        crate::test_complete!("cancelled_receiver_restores_waiter_count");
    }

    #[test]
    fn cancelled_sender_unwinds_without_committing() {
        init_test("cancelled_sender_unwinds_without_committing");
        let channel = test_channel();
        let cx = CancelToken::new();

        let sender = {
            let channel = Arc::clone(&channel);
            let cx = cx.clone();
            std::thread::spawn(move || channel.send(&cx, b"never delivered"))
        };

        // Give the sender time to park (no receiver exists).
        std::thread::sleep(Duration::from_millis(50));
        cx.cancel(CancelReason::shutdown());

        let err = sender.join().unwrap().expect_err("must be interrupted");
        crate::assert_with_log!(
            err == SendError::Interrupted,
            "interrupted",
            SendError::Interrupted,
            err
        );
        crate::assert_with_log!(!channel.has_pending(), "slot untouched", false, channel.has_pending());
        crate::test_complete!("cancelled_sender_unwinds_without_committing");
    }

    #[test]
    fn second_sender_blocks_until_next_receiver() {
        init_test("second_sender_blocks_until_next_receiver");
        let channel = test_channel();
        let cx = CancelToken::new();

        let receiver = parked_receiver(&channel, &cx, 16);
        assert!(
            wait_until(Duration::from_secs(5), || channel.waiting_receivers() == 1),
            "receiver never parked"
        );
        channel.send(&cx, b"first").expect("send failed");
        let got = receiver.join().unwrap().expect("recv failed");
        crate::assert_with_log!(got == b"first", "payload", b"first".to_vec(), got);

        // No receiver is parked anymore; a second send must block until a
        // new one arrives.
        let sender = {
            let channel = Arc::clone(&channel);
            let cx = cx.clone();
            std::thread::spawn(move || channel.send(&cx, b"second"))
        };
        std::thread::sleep(Duration::from_millis(50));
        crate::assert_with_log!(!channel.has_pending(), "no premature commit", false, channel.has_pending());

        let receiver = parked_receiver(&channel, &cx, 16);
        sender.join().unwrap().expect("send failed");
        let got = receiver.join().unwrap().expect("recv failed");
        crate::assert_with_log!(got == b"second", "payload", b"second".to_vec(), got);
        crate::test_complete!("second_sender_blocks_until_next_receiver");
    }
}
