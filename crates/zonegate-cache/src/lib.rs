//! zonegate-cache: the acceleration layer in front of the inventory and
//! the project service.
//!
//! # Components
//!
//! - **`backend`**: the [`CacheBackend`] get/set/delete contract and
//!   [`DisabledCache`] for deployments without a cache
//! - **`memory`**: [`MemoryCache`], per-entry TTL with LRU eviction
//! - **`service`**: [`CacheService`], lazily builds a backend client on
//!   first use, can be reset, and turns every backend failure into a miss
//!
//! The cache is never the source of truth: anything read from it can be
//! re-derived from the authoritative source.

pub mod backend;
pub mod memory;
pub mod service;

pub use backend::{CacheBackend, CacheError, CacheResult, DisabledCache};
pub use memory::{CacheStats, MemoryCache};
pub use service::CacheService;
