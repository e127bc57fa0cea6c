//! Zone catalog: which zones are currently offered to users.
//!
//! In a compute cell the catalog is derived from service rows: zones with
//! at least one enabled service are available, zones seen only on disabled
//! services are not. In an API cell it is derived from child-cell
//! capability reports: zones advertised by a cell that has gone quiet for
//! longer than the mute interval are listed as unavailable.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zonegate_cache::CacheService;
use zonegate_core::{CellState, Clock, TrustedContext, ZoneName, ZonegateConfig};

use crate::availability::AvailabilityZoneResolver;

const AVAILABLE_LIST_KEY: &str = "az-available-list";
const UNAVAILABLE_LIST_KEY: &str = "az-unavailable-list";

/// Available and unavailable zones, each de-duplicated in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneListing {
    pub available: Vec<ZoneName>,
    pub unavailable: Vec<ZoneName>,
}

pub struct ZoneCatalog {
    resolver: AvailabilityZoneResolver,
    cache: CacheService,
    clock: Arc<dyn Clock>,
    mute_child_interval: Duration,
    list_ttl: Duration,
}

impl ZoneCatalog {
    pub fn new(
        resolver: AvailabilityZoneResolver,
        cache: CacheService,
        clock: Arc<dyn Clock>,
        config: &ZonegateConfig,
    ) -> Self {
        Self {
            resolver,
            cache,
            clock,
            mute_child_interval: Duration::from_secs(config.cells.mute_child_interval_secs),
            list_ttl: config.cache.zone_list_ttl(),
        }
    }

    /// Zones of this cell's services. With `only_available` the disabled
    /// services are not queried and `unavailable` is left empty.
    ///
    /// An unreachable inventory yields an empty listing.
    pub fn list_zones(&self, ctx: &TrustedContext, only_available: bool) -> ZoneListing {
        let inventory = self.resolver.inventory();
        let enabled = inventory.services(ctx, false).unwrap_or_else(|e| {
            warn!(error = %e, "failed to list enabled services");
            Vec::new()
        });
        let mut listing = ZoneListing::default();
        for service in self.resolver.annotate_services(ctx, &enabled) {
            if let Some(zone) = service.availability_zone {
                push_unique(&mut listing.available, zone);
            }
        }

        if only_available {
            return listing;
        }

        let disabled = inventory.services(ctx, true).unwrap_or_else(|e| {
            warn!(error = %e, "failed to list disabled services");
            Vec::new()
        });
        for service in self.resolver.annotate_services(ctx, &disabled) {
            if let Some(zone) = service.availability_zone {
                if !listing.available.contains(&zone) {
                    push_unique(&mut listing.unavailable, zone);
                }
            }
        }
        listing
    }

    /// Zones advertised by child cells, split by whether the cell is muted.
    ///
    /// Reports without a zone list are skipped. A zone offered by any live
    /// cell is available even if a muted cell also offers it. Results are
    /// cached for the zone list TTL.
    pub fn list_cell_zones(&self, cells: &[CellState]) -> ZoneListing {
        if let Some(available) = self.cache.get::<Vec<ZoneName>>(AVAILABLE_LIST_KEY) {
            if !available.is_empty() {
                let unavailable = self
                    .cache
                    .get::<Vec<ZoneName>>(UNAVAILABLE_LIST_KEY)
                    .unwrap_or_default();
                return ZoneListing {
                    available,
                    unavailable,
                };
            }
        }

        let now = self.clock.now_secs();
        let mute_after = self.mute_child_interval.as_secs();
        let mut listing = ZoneListing::default();
        let mut muted = Vec::new();

        for cell in cells {
            let Some(zones) = cell.capabilities.availability_zones.as_ref() else {
                continue;
            };
            let is_muted = cell
                .last_seen
                .is_some_and(|seen| now.saturating_sub(seen) > mute_after);
            if is_muted {
                debug!(cell = %cell.name, "cell is muted, its zones are unavailable");
            }
            let target = if is_muted {
                &mut muted
            } else {
                &mut listing.available
            };
            for zone in zones {
                push_unique(target, zone.clone());
            }
        }

        for zone in muted {
            if !listing.available.contains(&zone) {
                push_unique(&mut listing.unavailable, zone);
            }
        }

        self.cache.set(AVAILABLE_LIST_KEY, &listing.available, self.list_ttl);
        self.cache.set(UNAVAILABLE_LIST_KEY, &listing.unavailable, self.list_ttl);
        listing
    }
}

fn push_unique(zones: &mut Vec<ZoneName>, zone: ZoneName) {
    if !zones.contains(&zone) {
        zones.push(zone);
    }
}
