//! Named endpoint table for channel registration and lookup.
//!
//! The registry is the host-facing collaborator that exposes a channel
//! under an externally visible name at startup and withdraws it at
//! shutdown. It is explicitly constructed and passed by reference to
//! whoever needs it — never a process-global singleton. The channel core
//! is agnostic to how callers locate it; this table is one concrete
//! answer.
//!
//! Registration can be configured to fail unconditionally
//! ([`RegistryConfig::refuse_registrations`]), which exercises host
//! startup failure paths the same way the original environment's
//! insertion-refusal switch did.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::channel::RendezvousChannel;
use crate::config::RegistryConfig;
use crate::connection::Connection;
use crate::error::RegistryError;

/// A table of named [`RendezvousChannel`] endpoints.
///
/// # Example
///
/// ```
/// use handoff::{ChannelConfig, ChannelRegistry, RegistryConfig, RendezvousChannel};
/// use std::sync::Arc;
///
/// let registry = ChannelRegistry::new(RegistryConfig::default());
/// let channel = Arc::new(RendezvousChannel::new(ChannelConfig::default()));
///
/// registry.register("echo", Arc::clone(&channel)).expect("register failed");
/// let conn = registry.open("echo").expect("open failed");
/// assert!(!conn.is_consumed());
///
/// registry.deregister("echo").expect("deregister failed");
/// assert!(registry.lookup("echo").is_none());
/// ```
#[derive(Debug)]
pub struct ChannelRegistry {
    entries: Mutex<BTreeMap<String, Arc<RendezvousChannel>>>,
    config: RegistryConfig,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            config,
        }
    }

    /// Registers `channel` under `name`.
    ///
    /// # Errors
    ///
    /// - `RegistryError::RegistrationDenied` if the registry is configured
    ///   to refuse registrations
    /// - `RegistryError::NameInUse` if the name is taken; the existing
    ///   registration is untouched
    pub fn register(
        &self,
        name: impl Into<String>,
        channel: Arc<RendezvousChannel>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.config.refuse_registrations {
            info!(name = %name, "registration refused by configuration");
            return Err(RegistryError::RegistrationDenied);
        }

        let mut entries = self.entries.lock().expect("registry lock poisoned");
        if entries.contains_key(&name) {
            return Err(RegistryError::NameInUse(name));
        }
        info!(name = %name, "channel registered");
        entries.insert(name, channel);
        Ok(())
    }

    /// Withdraws the registration under `name`, returning the channel.
    ///
    /// Existing connections keep their `Arc` and continue to work; only
    /// the name becomes unavailable.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotRegistered` if the name is absent.
    pub fn deregister(&self, name: &str) -> Result<Arc<RendezvousChannel>, RegistryError> {
        let mut entries = self.entries.lock().expect("registry lock poisoned");
        let channel = entries
            .remove(name)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;
        info!(name = %name, "channel deregistered");
        Ok(channel)
    }

    /// Looks up the channel registered under `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<RendezvousChannel>> {
        self.entries
            .lock()
            .expect("registry lock poisoned")
            .get(name)
            .cloned()
    }

    /// Opens a per-connection handle onto the channel under `name`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotRegistered` if the name is absent.
    pub fn open(&self, name: &str) -> Result<Connection, RegistryError> {
        let channel = self
            .lookup(name)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;
        let conn = Connection::open(channel);
        debug!(name = %name, id = %conn.id(), "connection opened via registry");
        Ok(conn)
    }

    /// Returns the number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("registry lock poisoned").len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .expect("registry lock poisoned")
            .is_empty()
    }

    /// Returns the registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}
