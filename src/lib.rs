//! Handoff: a cancel-correct, synchronous, single-slot rendezvous channel.
//!
//! # Overview
//!
//! A rendezvous channel is a synchronization point at which a sender and a
//! receiver must both be present before a message changes hands. This crate
//! implements the classical CSP/Ada flavor of that protocol for opaque byte
//! payloads, with one refinement: a sender never commits a message unless at
//! least one receiver is demonstrably parked, so nothing is ever produced
//! into an empty room.
//!
//! # Core Guarantees
//!
//! - **At most one pending message**: the channel owns a single slot; a
//!   second send blocks until the slot is drained and a receiver is parked
//! - **No message without a receiver**: the commit is gated on the live
//!   waiting-receiver count, checked under the same lock as the slot
//! - **Cancel-correctness**: a blocked participant woken by cancellation
//!   unwinds its partial state (waiter count, lock) on every exit path,
//!   never leaving the slot half-written
//! - **Copy-out semantics**: receivers only ever see an owned prefix copy of
//!   the stored buffer; the channel frees the original
//!
//! # Module Structure
//!
//! - [`channel`]: The rendezvous protocol itself
//! - [`cancel`]: Cancellation token, kind, and reason types
//! - [`connection`]: Per-connection handles with one-message EOF semantics
//! - [`registry`]: Named endpoint table for channel registration and lookup
//! - [`config`]: Channel and registry configuration with env overrides
//! - [`error`]: Error taxonomy and recoverability classification
//! - [`test_utils`]: Shared logging/assertion helpers for test suites
//!
//! # Example
//!
//! ```
//! use handoff::{CancelToken, ChannelConfig, RendezvousChannel};
//! use std::sync::Arc;
//!
//! let channel = Arc::new(RendezvousChannel::new(ChannelConfig::default()));
//! let cx = CancelToken::new();
//!
//! let receiver = {
//!     let channel = Arc::clone(&channel);
//!     let cx = cx.clone();
//!     std::thread::spawn(move || channel.recv(&cx, 16))
//! };
//!
//! // Blocks until the receiver above is parked, then hands the bytes over.
//! let sent = channel.send(&cx, b"ping").expect("send failed");
//! assert_eq!(sent, 4);
//! assert_eq!(receiver.join().unwrap().expect("recv failed"), b"ping");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod channel;
pub mod config;
pub mod connection;
pub mod error;
pub mod registry;
pub mod test_utils;

pub use cancel::{CancelKind, CancelReason, CancelToken, Cancelled};
pub use channel::RendezvousChannel;
pub use config::{ChannelConfig, ConfigError, RegistryConfig};
pub use connection::{Connection, ConnectionId};
pub use error::{
    Error, ErrorKind, Recoverability, RecvError, RegistryError, SendError, TryRecvError,
    TrySendError,
};
pub use registry::ChannelRegistry;
