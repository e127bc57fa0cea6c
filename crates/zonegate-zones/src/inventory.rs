//! Inventory contract: the authoritative source of aggregate membership.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use serde::Deserialize;
use thiserror::Error;
use zonegate_core::{Aggregate, AggregateMetadata, ServiceRecord, TrustedContext};

/// Result type alias for inventory lookups.
pub type InventoryResult<T> = Result<T, InventoryError>;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("inventory unavailable: {0}")]
    Unavailable(String),

    #[error("inventory query failed: {0}")]
    Query(String),
}

/// Read access to aggregates and services, owned elsewhere.
pub trait Inventory: Send + Sync {
    /// Metadata under `key` merged across every aggregate containing `host`.
    fn aggregate_metadata_by_host(
        &self,
        ctx: &TrustedContext,
        host: &str,
        key: &str,
    ) -> InventoryResult<AggregateMetadata>;

    /// Batched form: for each of `hosts` that belongs to at least one
    /// aggregate carrying `key`, the union of that key's values.
    fn host_metadata_by_key(
        &self,
        ctx: &TrustedContext,
        hosts: &BTreeSet<String>,
        key: &str,
    ) -> InventoryResult<BTreeMap<String, BTreeSet<String>>>;

    /// Service rows, either enabled (`disabled == false`) or disabled.
    fn services(&self, ctx: &TrustedContext, disabled: bool) -> InventoryResult<Vec<ServiceRecord>>;
}

/// Serialized form of a [`StaticInventory`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub aggregates: Vec<Aggregate>,
    #[serde(default)]
    pub services: Vec<ServiceRecord>,
}

/// In-memory inventory built from a snapshot.
///
/// Counts every query so callers can assert when the inventory was (or
/// was not) consulted.
#[derive(Debug, Default)]
pub struct StaticInventory {
    state: RwLock<InventorySnapshot>,
    queries: AtomicUsize,
}

impl StaticInventory {
    pub fn new(aggregates: Vec<Aggregate>, services: Vec<ServiceRecord>) -> Self {
        Self::from_snapshot(InventorySnapshot {
            aggregates,
            services,
        })
    }

    pub fn from_snapshot(snapshot: InventorySnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
            queries: AtomicUsize::new(0),
        }
    }

    /// Number of queries served so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Add `host` to the named aggregate, creating it with `metadata` if absent.
    pub fn add_host_to_aggregate(&self, aggregate: &str, host: &str, metadata: &[(&str, &str)]) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let position = state.aggregates.iter().position(|a| a.name == aggregate);
        let entry = match position {
            Some(i) => &mut state.aggregates[i],
            None => {
                state.aggregates.push(Aggregate {
                    name: aggregate.to_string(),
                    ..Aggregate::default()
                });
                let last = state.aggregates.len() - 1;
                &mut state.aggregates[last]
            }
        };
        entry.hosts.insert(host.to_string());
        for (k, v) in metadata {
            entry.metadata.insert(k.to_string(), v.to_string());
        }
    }

    pub fn remove_host_from_aggregate(&self, aggregate: &str, host: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = state.aggregates.iter_mut().find(|a| a.name == aggregate) {
            entry.hosts.remove(host);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, InventorySnapshot> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inventory for StaticInventory {
    fn aggregate_metadata_by_host(
        &self,
        _ctx: &TrustedContext,
        host: &str,
        key: &str,
    ) -> InventoryResult<AggregateMetadata> {
        let state = self.read();
        Ok(zonegate_core::merge_aggregate_metadata(
            &state.aggregates,
            Some(host),
            Some(key),
        ))
    }

    fn host_metadata_by_key(
        &self,
        _ctx: &TrustedContext,
        hosts: &BTreeSet<String>,
        key: &str,
    ) -> InventoryResult<BTreeMap<String, BTreeSet<String>>> {
        let state = self.read();
        let mut by_host: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for aggregate in &state.aggregates {
            let Some(value) = aggregate.metadata.get(key) else {
                continue;
            };
            for host in aggregate.hosts.intersection(hosts) {
                by_host.entry(host.clone()).or_default().insert(value.clone());
            }
        }
        Ok(by_host)
    }

    fn services(&self, _ctx: &TrustedContext, disabled: bool) -> InventoryResult<Vec<ServiceRecord>> {
        let state = self.read();
        Ok(state
            .services
            .iter()
            .filter(|s| s.disabled == disabled)
            .cloned()
            .collect())
    }
}
