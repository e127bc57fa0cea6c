//! Domain types for zone-aware admission.
//!
//! These mirror the records the scheduler hands us: aggregates from the
//! inventory, child-cell capability reports, host states, service rows,
//! instances, and project records from the identity service. All types are
//! serde-serializable so they can travel through the cache and be loaded
//! from snapshot files.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Name of an availability zone.
pub type ZoneName = String;

/// Metadata key under which aggregates carry their availability zone.
pub const AVAILABILITY_ZONE_KEY: &str = "availability_zone";

/// Service topic marking a compute node.
pub const COMPUTE_TOPIC: &str = "compute";

/// Domain assumed when a request or cell does not name one.
pub const DEFAULT_DOMAIN: &str = "default";

/// Aggregate metadata: key → set of values, merged across aggregates.
pub type AggregateMetadata = BTreeMap<String, BTreeSet<String>>;

// ── Aggregate ─────────────────────────────────────────────────────

/// A named grouping of hosts carrying metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Aggregate {
    pub name: String,
    #[serde(default)]
    pub hosts: BTreeSet<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Aggregate {
    pub fn contains_host(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }
}

/// Merge the metadata of every aggregate containing `host`.
///
/// With `key` set, only that key is collected. Values from different
/// aggregates under the same key are unioned.
pub fn merge_aggregate_metadata<'a>(
    aggregates: impl IntoIterator<Item = &'a Aggregate>,
    host: Option<&str>,
    key: Option<&str>,
) -> AggregateMetadata {
    let mut merged = AggregateMetadata::new();
    for aggregate in aggregates {
        if let Some(host) = host {
            if !aggregate.contains_host(host) {
                continue;
            }
        }
        for (k, v) in &aggregate.metadata {
            if key.is_some_and(|wanted| wanted != k) {
                continue;
            }
            merged.entry(k.clone()).or_default().insert(v.clone());
        }
    }
    merged
}

// ── Cell ──────────────────────────────────────────────────────────

/// Capabilities advertised by a child cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CellCapabilities {
    /// `None` when the report carries no zone list at all.
    #[serde(default)]
    pub availability_zones: Option<Vec<ZoneName>>,
    #[serde(default)]
    pub required_roles: Vec<String>,
    /// `None` means the cell accepts only the default domain.
    #[serde(default)]
    pub allowed_domains: Option<Vec<String>>,
}

impl CellCapabilities {
    pub fn zones(&self) -> &[ZoneName] {
        self.availability_zones.as_deref().unwrap_or(&[])
    }

    pub fn allowed_domains(&self) -> Vec<String> {
        self.allowed_domains
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_DOMAIN.to_string()])
    }
}

/// Free disk advertised by a cell, bucketed by instance disk size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DiskFree {
    /// Disk size in MB (as a decimal string) → number of free units.
    #[serde(default)]
    pub units_by_mb: BTreeMap<String, u64>,
}

/// Capacities advertised by a child cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CellCapacities {
    #[serde(default)]
    pub disk_free: DiskFree,
}

impl CellCapacities {
    /// Free units for instances needing exactly `disk_mb`.
    pub fn disk_units_for(&self, disk_mb: u64) -> u64 {
        self.disk_free
            .units_by_mb
            .get(&disk_mb.to_string())
            .copied()
            .unwrap_or(0)
    }
}

/// A child cell as seen by the cell scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CellState {
    pub name: String,
    #[serde(default)]
    pub capabilities: CellCapabilities,
    #[serde(default)]
    pub capacities: CellCapacities,
    /// Unix timestamp (seconds) of the last capability report.
    #[serde(default)]
    pub last_seen: Option<u64>,
}

impl CellState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_zones(mut self, zones: &[&str]) -> Self {
        self.capabilities.availability_zones =
            Some(zones.iter().map(|z| z.to_string()).collect());
        self
    }
}

// ── Host ──────────────────────────────────────────────────────────

/// A candidate host within a cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HostState {
    pub host: String,
    #[serde(default)]
    pub nodename: String,
    /// Routing scope (cell) the host belongs to, if any.
    #[serde(default)]
    pub cell_name: Option<String>,
    #[serde(default)]
    pub free_disk_mb: u64,
    #[serde(default)]
    pub free_ram_mb: u64,
    /// Aggregates this host is a member of.
    #[serde(default)]
    pub aggregates: Vec<Aggregate>,
}

impl HostState {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            nodename: host.to_string(),
            ..Self::default()
        }
    }

    /// Aggregate metadata for this host, restricted to `key`.
    pub fn aggregate_metadata(&self, key: &str) -> AggregateMetadata {
        merge_aggregate_metadata(&self.aggregates, None, Some(key))
    }

    /// Values under `key` across this host's aggregates.
    pub fn aggregate_values(&self, key: &str) -> BTreeSet<String> {
        self.aggregate_metadata(key).remove(key).unwrap_or_default()
    }
}

// ── Service ───────────────────────────────────────────────────────

/// A service row, as listed by the inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRecord {
    pub host: String,
    pub binary: String,
    pub topic: String,
    #[serde(default)]
    pub disabled: bool,
    /// Filled in by zone annotation.
    #[serde(default)]
    pub availability_zone: Option<ZoneName>,
}

impl ServiceRecord {
    pub fn is_compute(&self) -> bool {
        self.topic == COMPUTE_TOPIC
    }
}

// ── Instance ──────────────────────────────────────────────────────

/// A workload instance whose zone may be asked for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InstanceRecord {
    pub uuid: String,
    /// Host the instance was placed on; `None` until placement is durable.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub cell_name: Option<String>,
    /// Zone recorded on the instance at boot time.
    #[serde(default)]
    pub availability_zone: Option<ZoneName>,
    #[serde(default)]
    pub system_metadata: BTreeMap<String, String>,
}

// ── Project ───────────────────────────────────────────────────────

/// A project record from the identity service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProjectRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Comma-joined zone names, or `"ALL"`.
    #[serde(default)]
    pub compute_zones: Option<String>,
}
