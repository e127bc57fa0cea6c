//! Cache service: lazily constructed, resettable handle to a backend.
//!
//! Resolvers receive a [`CacheService`] at construction instead of reaching
//! for a process global. The backend client is built by a factory on first
//! use; [`CacheService::reset`] drops every entry and the client itself, so
//! the next access builds a fresh one.
//!
//! Every backend failure is logged and reported to the caller as a miss
//! (or a no-op for writes). A cache outage never blocks scheduling.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::backend::{CacheBackend, DisabledCache};
use crate::memory::MemoryCache;

type BackendFactory = dyn Fn() -> Arc<dyn CacheBackend> + Send + Sync;

/// Shared handle to a lazily built cache backend.
///
/// `Clone` shares the same underlying client.
#[derive(Clone)]
pub struct CacheService {
    factory: Arc<BackendFactory>,
    client: Arc<RwLock<Option<Arc<dyn CacheBackend>>>>,
}

impl CacheService {
    /// Create a service that builds its backend with `factory` on first use.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn CacheBackend> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            client: Arc::new(RwLock::new(None)),
        }
    }

    /// In-memory backend bounded to `max_entries`.
    pub fn memory(max_entries: usize) -> Self {
        Self::new(move || Arc::new(MemoryCache::new(max_entries)) as Arc<dyn CacheBackend>)
    }

    /// Service whose backend is always unavailable.
    pub fn disabled() -> Self {
        Self::new(|| Arc::new(DisabledCache) as Arc<dyn CacheBackend>)
    }

    /// The backend client, building it if this is the first access since
    /// construction or the last reset.
    pub fn client(&self) -> Arc<dyn CacheBackend> {
        if let Some(client) = self
            .client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return client.clone();
        }

        let mut slot = self.client.write().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(|| {
            info!("constructing cache backend client");
            (self.factory)()
        })
        .clone()
    }

    /// Drop all entries and the client.
    pub fn reset(&self) {
        let previous = self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(client) = previous {
            if let Err(e) = client.clear() {
                warn!(error = %e, "failed to clear cache backend on reset");
            }
        }
        info!("cache reset");
    }

    /// Read and decode `key`. Backend errors and undecodable values read
    /// as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = match self.client().get(key) {
            Ok(value) => value?,
            Err(e) => {
                warn!(key, error = %e, "cache get failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(key, error = %e, "undecodable cache value, treating as miss");
                None
            }
        }
    }

    /// Store `value` under `key`. Failures are logged and ignored.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let encoded = match serde_json::to_value(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key, error = %e, "failed to encode cache value");
                return;
            }
        };
        if let Err(e) = self.client().set(key, encoded, ttl) {
            warn!(key, error = %e, "cache set failed");
        }
    }

    /// Remove `key`. Failures are logged and ignored.
    pub fn delete(&self, key: &str) {
        if let Err(e) = self.client().delete(key) {
            warn!(key, error = %e, "cache delete failed");
        }
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let built = self
            .client
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false);
        f.debug_struct("CacheService")
            .field("client_built", &built)
            .finish()
    }
}
