//! Error types and error handling strategy for Handoff.
//!
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - Every operation error converts into the crate-wide [`Error`]
//! - Errors are classified by [`Recoverability`] for caller-level retry
//!   loops; the channel itself never retries internally
//!
//! The single most important cross-cutting contract: the channel lock is
//! released on every exit path. All state transitions happen while the
//! guard is live; returns drop it via RAII.

use core::fmt;

/// The kind of error, across all operations in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A blocked operation was woken by an external cancellation request.
    Interrupted,
    /// Storage for an incoming message could not be obtained.
    AllocationFailed,
    /// The byte transfer into or out of caller-supplied storage was refused.
    TransferFault,
    /// A connection handle already consumed its one message.
    AlreadyConsumed,
    /// A channel name is already registered.
    NameInUse,
    /// No channel is registered under the requested name.
    NotRegistered,
    /// The registry is configured to refuse registrations.
    RegistrationDenied,
}

impl ErrorKind {
    /// Returns the recoverability classification for this kind.
    #[must_use]
    pub const fn recoverability(self) -> Recoverability {
        match self {
            Self::Interrupted => Recoverability::Transient,
            Self::AllocationFailed => Recoverability::Unknown,
            Self::TransferFault
            | Self::AlreadyConsumed
            | Self::NameInUse
            | Self::NotRegistered
            | Self::RegistrationDenied => Recoverability::Permanent,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => write!(f, "interrupted"),
            Self::AllocationFailed => write!(f, "allocation failed"),
            Self::TransferFault => write!(f, "transfer fault"),
            Self::AlreadyConsumed => write!(f, "already consumed"),
            Self::NameInUse => write!(f, "name in use"),
            Self::NotRegistered => write!(f, "not registered"),
            Self::RegistrationDenied => write!(f, "registration denied"),
        }
    }
}

/// Whether an error is worth retrying.
///
/// An interrupted rendezvous is a "try again later" condition: the caller
/// was unwound cleanly and may simply re-issue the call once the
/// cancellation window has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recoverability {
    /// Temporary failure, safe to retry.
    Transient,
    /// Unrecoverable, do not retry.
    Permanent,
    /// Recoverability depends on context.
    Unknown,
}

/// Crate-wide error carrying a kind and optional context message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Attaches a context message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true if a caller-level retry loop may re-issue the operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind.recoverability(), Recoverability::Transient)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// Error returned by a blocking [`send`](crate::RendezvousChannel::send).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The sender was woken by cancellation while parked.
    Interrupted,
    /// The channel could not allocate storage for the message;
    /// the slot is unchanged.
    AllocationFailed,
    /// The payload exceeds the configured maximum; nothing was copied.
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
        /// Configured maximum payload length.
        max: usize,
    },
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => write!(f, "send interrupted while waiting for a receiver"),
            Self::AllocationFailed => write!(f, "failed to allocate message storage"),
            Self::PayloadTooLarge { len, max } => {
                write!(f, "payload of {len} bytes exceeds maximum of {max}")
            }
        }
    }
}

impl std::error::Error for SendError {}

/// Error returned by a blocking [`recv`](crate::RendezvousChannel::recv).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    /// The receiver was woken by cancellation while parked.
    Interrupted,
}

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => write!(f, "receive interrupted while waiting for a message"),
        }
    }
}

impl std::error::Error for RecvError {}

/// Error returned by [`try_send`](crate::RendezvousChannel::try_send).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrySendError {
    /// No receiver is currently parked; committing would produce a message
    /// with zero consumers.
    NoReceiver,
    /// The slot already holds an unconsumed message.
    Occupied,
    /// The channel could not allocate storage for the message.
    AllocationFailed,
    /// The payload exceeds the configured maximum.
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
        /// Configured maximum payload length.
        max: usize,
    },
}

impl fmt::Display for TrySendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoReceiver => write!(f, "no receiver is waiting"),
            Self::Occupied => write!(f, "slot already holds a pending message"),
            Self::AllocationFailed => write!(f, "failed to allocate message storage"),
            Self::PayloadTooLarge { len, max } => {
                write!(f, "payload of {len} bytes exceeds maximum of {max}")
            }
        }
    }
}

impl std::error::Error for TrySendError {}

/// Error returned by [`try_recv`](crate::RendezvousChannel::try_recv).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    /// No message is pending in the slot.
    Empty,
}

impl fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no message is pending"),
        }
    }
}

impl std::error::Error for TryRecvError {}

/// Error returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A channel is already registered under this name.
    NameInUse(String),
    /// No channel is registered under this name.
    NotRegistered(String),
    /// The registry is configured to refuse all registrations.
    RegistrationDenied,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameInUse(name) => write!(f, "channel name {name:?} is already registered"),
            Self::NotRegistered(name) => write!(f, "no channel registered under {name:?}"),
            Self::RegistrationDenied => write!(f, "registry refuses registrations"),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<SendError> for Error {
    fn from(e: SendError) -> Self {
        match e {
            SendError::Interrupted => Self::new(ErrorKind::Interrupted),
            SendError::AllocationFailed => Self::new(ErrorKind::AllocationFailed),
            SendError::PayloadTooLarge { len, max } => Self::new(ErrorKind::TransferFault)
                .with_message(format!("payload of {len} bytes exceeds maximum of {max}")),
        }
    }
}

impl From<RecvError> for Error {
    fn from(e: RecvError) -> Self {
        match e {
            RecvError::Interrupted => Self::new(ErrorKind::Interrupted),
        }
    }
}

impl From<TrySendError> for Error {
    fn from(e: TrySendError) -> Self {
        match e {
            TrySendError::NoReceiver => {
                Self::new(ErrorKind::TransferFault).with_message("no receiver is waiting")
            }
            TrySendError::Occupied => {
                Self::new(ErrorKind::TransferFault).with_message("slot already occupied")
            }
            TrySendError::AllocationFailed => Self::new(ErrorKind::AllocationFailed),
            TrySendError::PayloadTooLarge { len, max } => Self::new(ErrorKind::TransferFault)
                .with_message(format!("payload of {len} bytes exceeds maximum of {max}")),
        }
    }
}

impl From<TryRecvError> for Error {
    fn from(e: TryRecvError) -> Self {
        match e {
            TryRecvError::Empty => {
                Self::new(ErrorKind::TransferFault).with_message("no message is pending")
            }
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NameInUse(name) => Self::new(ErrorKind::NameInUse).with_message(name),
            RegistryError::NotRegistered(name) => {
                Self::new(ErrorKind::NotRegistered).with_message(name)
            }
            RegistryError::RegistrationDenied => Self::new(ErrorKind::RegistrationDenied),
        }
    }
}
