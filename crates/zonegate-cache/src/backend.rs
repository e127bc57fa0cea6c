//! Cache backend contract.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Result type alias for cache backend operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors a cache backend may report. Callers treat all of them as a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache value encoding error: {0}")]
    Encode(String),
}

/// A TTL-keyed value store with independent expiry per key.
///
/// Each call is atomic on its own; no cross-call locking is offered.
pub trait CacheBackend: Send + Sync {
    /// Fetch a live value. Expired entries read as `None`.
    fn get(&self, key: &str) -> CacheResult<Option<Value>>;

    /// Store `value` under `key`, replacing any existing entry.
    /// A zero `ttl` never expires.
    fn set(&self, key: &str, value: Value, ttl: Duration) -> CacheResult<()>;

    fn delete(&self, key: &str) -> CacheResult<()>;

    /// Drop every entry.
    fn clear(&self) -> CacheResult<()>;
}

/// Backend used when no cache is configured. Every call fails with
/// [`CacheError::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCache;

impl CacheBackend for DisabledCache {
    fn get(&self, _key: &str) -> CacheResult<Option<Value>> {
        Err(CacheError::Unavailable("no cache configured".to_string()))
    }

    fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Unavailable("no cache configured".to_string()))
    }

    fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::Unavailable("no cache configured".to_string()))
    }

    fn clear(&self) -> CacheResult<()> {
        Ok(())
    }
}
