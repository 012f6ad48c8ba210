//! Synchronous rendezvous channel primitives.
//!
//! A rendezvous completes only when both parties are present:
//!
//! ```text
//! Sender                         Receiver
//!   │                               │
//!   │  (blocks: no receiver)        │
//!   │                               ├── recv() parks, announces itself
//!   ├── send() commits slot ───────►│
//!   │                               ├── copies prefix, drains slot
//!   │◄── slot empty, next cycle ────┤
//! ```
//!
//! The sender-side gate is the defining property: a message is never
//! committed while the waiting-receiver count is zero, so the slot can
//! never accumulate output nobody asked for.
//!
//! # Module Contents
//!
//! - [`rendezvous`]: The single-slot channel implementation

pub mod rendezvous;

pub use rendezvous::RendezvousChannel;
