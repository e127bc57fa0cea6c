//! Availability zone resolution for hosts, services and instances.
//!
//! The inventory's aggregate metadata is the source of truth. Resolved
//! zones are cached per host (and per routing scope) for an hour; writes
//! that move hosts between aggregates call
//! [`AvailabilityZoneResolver::invalidate_and_refresh`] so readers see the
//! new zone without waiting for the TTL.
//!
//! # Failure model
//!
//! Zone lookups never fail. A host outside every zoned aggregate reports
//! the configured default zone, and so does a host whose lookup failed
//! because the inventory was unreachable. Degraded answers are not cached.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use zonegate_cache::CacheService;
use zonegate_core::{
    AVAILABILITY_ZONE_KEY, CellType, InstanceRecord, ServiceRecord, TrustedContext, ZoneName,
    ZonegateConfig,
};

use crate::inventory::{Inventory, InventoryResult};

/// Cache key for a host's zone, qualified by routing scope so that the
/// same host name in two cells never collides.
///
/// A present scope is length-prefixed, so no (scope, host) pair can share a
/// key with another. `none` marks an absent scope and cannot match a cell
/// literally named "none", which is written `4:none`.
pub fn host_cache_key(host: &str, scope: Option<&str>) -> String {
    match scope {
        Some(scope) => format!("azcache-{}:{}-{}", scope.len(), scope, host),
        None => format!("azcache-none-{host}"),
    }
}

/// Resolves zones with a read-through cache in front of the inventory.
#[derive(Clone)]
pub struct AvailabilityZoneResolver {
    inventory: Arc<dyn Inventory>,
    cache: CacheService,
    default_zone: ZoneName,
    internal_zone: ZoneName,
    cell_type: CellType,
    ttl: Duration,
}

impl AvailabilityZoneResolver {
    pub fn new(inventory: Arc<dyn Inventory>, cache: CacheService, config: &ZonegateConfig) -> Self {
        Self {
            inventory,
            cache,
            default_zone: config.default_availability_zone.clone(),
            internal_zone: config.internal_service_availability_zone.clone(),
            cell_type: config.cells.cell_type,
            ttl: config.cache.availability_zone_ttl(),
        }
    }

    pub fn default_zone(&self) -> &str {
        &self.default_zone
    }

    pub fn internal_zone(&self) -> &str {
        &self.internal_zone
    }

    pub fn inventory(&self) -> &Arc<dyn Inventory> {
        &self.inventory
    }

    /// Zone of `host` straight from the inventory.
    ///
    /// A host in several zoned aggregates reports their zones comma-joined
    /// in sorted order. `Ok(None)` means the host has no zoned aggregate.
    fn lookup_host_zone(&self, ctx: &TrustedContext, host: &str) -> InventoryResult<Option<ZoneName>> {
        let mut metadata = self
            .inventory
            .aggregate_metadata_by_host(ctx, host, AVAILABILITY_ZONE_KEY)?;
        Ok(metadata
            .remove(AVAILABILITY_ZONE_KEY)
            .filter(|zones| !zones.is_empty())
            .map(join_zones))
    }

    /// Zone from the inventory, with the default applied. The flag is
    /// `false` when the answer is a degraded fallback that must not be cached.
    fn fresh_host_zone(&self, ctx: &TrustedContext, host: &str) -> (ZoneName, bool) {
        match self.lookup_host_zone(ctx, host) {
            Ok(Some(zone)) => (zone, true),
            Ok(None) => (self.default_zone.clone(), true),
            Err(e) => {
                warn!(
                    host,
                    error = %e,
                    default_zone = %self.default_zone,
                    "inventory lookup failed, using default zone"
                );
                (self.default_zone.clone(), false)
            }
        }
    }

    /// Zone of `host` within `scope`, read through the cache.
    pub fn resolve_host_zone(&self, ctx: &TrustedContext, host: &str, scope: Option<&str>) -> ZoneName {
        let key = host_cache_key(host, scope);
        if let Some(zone) = self.cache.get::<String>(&key) {
            return zone;
        }

        let (zone, authoritative) = self.fresh_host_zone(ctx, host);
        if authoritative {
            self.cache.set(&key, &zone, self.ttl);
        }
        debug!(host, zone = %zone, "resolved host zone");
        zone
    }

    /// Drop the cached zone for `host` and store a fresh one.
    ///
    /// When the caller already knows the new zone (for instance right after
    /// moving the host between aggregates) it is stored as given; otherwise
    /// the inventory is queried.
    pub fn invalidate_and_refresh(
        &self,
        ctx: &TrustedContext,
        host: &str,
        scope: Option<&str>,
        zone: Option<&str>,
    ) -> ZoneName {
        let key = host_cache_key(host, scope);
        self.cache.delete(&key);

        let (zone, authoritative) = match zone.filter(|z| !z.is_empty()) {
            Some(zone) => (zone.to_string(), true),
            None => self.fresh_host_zone(ctx, host),
        };
        if authoritative {
            self.cache.set(&key, &zone, self.ttl);
        }
        debug!(host, zone = %zone, "refreshed host zone");
        zone
    }

    /// Fill in `availability_zone` on a batch of service rows.
    ///
    /// Compute services get their host's zone from one batched inventory
    /// query. Compute hosts outside every zoned aggregate get the default
    /// zone, and their cache entry is refreshed to match. Every other
    /// service gets the internal zone.
    pub fn annotate_services(&self, ctx: &TrustedContext, services: &[ServiceRecord]) -> Vec<ServiceRecord> {
        let compute_hosts: BTreeSet<String> = services
            .iter()
            .filter(|s| s.is_compute())
            .map(|s| s.host.clone())
            .collect();

        let (zones_by_host, authoritative) = if compute_hosts.is_empty() {
            (Default::default(), true)
        } else {
            match self
                .inventory
                .host_metadata_by_key(ctx, &compute_hosts, AVAILABILITY_ZONE_KEY)
            {
                Ok(by_host) => (by_host, true),
                Err(e) => {
                    warn!(error = %e, "batched zone lookup failed, using default zone");
                    (Default::default(), false)
                }
            }
        };

        let mut refreshed = BTreeSet::new();
        services
            .iter()
            .map(|service| {
                let zone = if !service.is_compute() {
                    self.internal_zone.clone()
                } else {
                    match zones_by_host.get(&service.host).filter(|z| !z.is_empty()) {
                        Some(zones) => join_zones(zones.clone()),
                        None => {
                            if authoritative && refreshed.insert(service.host.clone()) {
                                self.invalidate_and_refresh(
                                    ctx,
                                    &service.host,
                                    None,
                                    Some(&self.default_zone),
                                );
                            }
                            self.default_zone.clone()
                        }
                    }
                };
                ServiceRecord {
                    availability_zone: Some(zone),
                    ..service.clone()
                }
            })
            .collect()
    }

    /// Zone of an instance, or `None` when it cannot be determined.
    ///
    /// An instance without a host yet reports the zone recorded at boot,
    /// touching neither cache nor inventory. Otherwise the cache is
    /// consulted; a cached zone that disagrees with the zone recorded on the
    /// instance is treated as stale and re-resolved.
    ///
    /// In an API cell the cache is keyed by host and cell name and misses
    /// are answered from the instance's system metadata.
    pub fn resolve_instance_zone(&self, ctx: &TrustedContext, instance: &InstanceRecord) -> Option<ZoneName> {
        let Some(host) = instance.host.as_deref().filter(|h| !h.is_empty()) else {
            return instance.availability_zone.clone();
        };

        let scope = match self.cell_type {
            CellType::Api => Some(instance.cell_name.as_deref().filter(|c| !c.is_empty())?),
            CellType::Compute => None,
        };
        let key = host_cache_key(host, scope);

        if let Some(cached) = self.cache.get::<String>(&key) {
            match instance.availability_zone.as_deref().filter(|z| !z.is_empty()) {
                Some(recorded) if recorded != cached => {
                    debug!(
                        instance = %instance.uuid,
                        cached = %cached,
                        recorded,
                        "cached zone disagrees with instance, re-resolving"
                    );
                    self.cache.delete(&key);
                }
                _ => return Some(cached),
            }
        }

        let zone = match self.cell_type {
            CellType::Api => instance
                .system_metadata
                .get(AVAILABILITY_ZONE_KEY)
                .filter(|z| !z.is_empty())
                .cloned()?,
            CellType::Compute => {
                let (zone, authoritative) = self.fresh_host_zone(ctx, host);
                if !authoritative {
                    return Some(zone);
                }
                zone
            }
        };
        self.cache.set(&key, &zone, self.ttl);
        Some(zone)
    }
}

fn join_zones(zones: BTreeSet<String>) -> ZoneName {
    zones.into_iter().collect::<Vec<_>>().join(",")
}
