//! Runtime settings read by the bridge on every request.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::Config;

/// Configuration-store capability consumed by the request pipeline.
///
/// Implementations are queried per request and must never be cached by the
/// caller, so a rotated token applies to the very next request.
pub trait BridgeSettings: Send + Sync {
    /// Shared secret expected from clients, or `None` when auth is disabled.
    fn token(&self) -> Option<String>;

    /// Port the listener binds on its next start.
    fn port(&self) -> u16;
}

impl<T> BridgeSettings for Arc<T>
where
    T: BridgeSettings + ?Sized,
{
    fn token(&self) -> Option<String> {
        (**self).token()
    }

    fn port(&self) -> u16 {
        (**self).port()
    }
}

/// In-memory settings store seeded from [`Config`].
#[derive(Debug)]
pub struct SettingsStore {
    token: RwLock<Option<String>>,
    port: AtomicU16,
}

impl SettingsStore {
    /// Builds a store with the given token and port.
    #[must_use]
    pub fn new(token: Option<&str>, port: u16) -> Self {
        let store = Self {
            token: RwLock::new(None),
            port: AtomicU16::new(port),
        };
        if let Some(initial) = token {
            store.set_token(initial);
        }
        store
    }

    /// Builds a store from the resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.token(), config.port())
    }

    /// Replaces the token. Surrounding whitespace is dropped and a blank
    /// value disables authentication.
    pub fn set_token(&self, token: &str) {
        let trimmed = token.trim();
        let next = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Disables authentication.
    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Changes the port used by the next listener start.
    pub fn set_port(&self, port: u16) {
        self.port.store(port, Ordering::SeqCst);
    }
}

impl BridgeSettings for SettingsStore {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn port(&self) -> u16 {
        self.port.load(Ordering::SeqCst)
    }
}
