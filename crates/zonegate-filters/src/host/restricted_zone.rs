//! Host filtering on the requester's authorized zones.

use std::collections::BTreeSet;

use tracing::debug;
use zonegate_core::{AVAILABILITY_ZONE_KEY, FilterContext, HostState};
use zonegate_zones::{AvailabilityZoneResolver, RestrictedZoneResolver};

use super::HostFilter;
use crate::error::FilterResult;
use crate::services::FilterServices;

/// Passes hosts in one of the requester's authorized zones.
///
/// Requests naming a zone pass without any lookup; the zone was authorized
/// when the request was accepted.
pub struct RestrictedZoneFilter {
    restricted: RestrictedZoneResolver,
    zones: AvailabilityZoneResolver,
}

impl RestrictedZoneFilter {
    pub fn new(restricted: RestrictedZoneResolver, zones: AvailabilityZoneResolver) -> Self {
        Self { restricted, zones }
    }

    pub fn from_services(services: &FilterServices) -> Self {
        Self::new(services.restricted.clone(), services.zones.clone())
    }

    /// Zones of `host`: its aggregates' zone metadata when the host state
    /// carries any, otherwise the resolver's (possibly default) answer.
    fn host_zones(&self, host: &HostState, ctx: &FilterContext) -> BTreeSet<String> {
        let from_aggregates = host.aggregate_values(AVAILABILITY_ZONE_KEY);
        if !from_aggregates.is_empty() {
            return from_aggregates;
        }
        self.zones
            .resolve_host_zone(&ctx.trusted, &host.host, host.cell_name.as_deref())
            .split(',')
            .map(str::to_string)
            .collect()
    }
}

impl HostFilter for RestrictedZoneFilter {
    fn name(&self) -> &'static str {
        "restricted_zone"
    }

    fn run_filter_once_per_request(&self) -> bool {
        true
    }

    fn host_passes(&self, host: &HostState, ctx: &FilterContext) -> FilterResult<bool> {
        if ctx.requested_zone().is_some() {
            return Ok(true);
        }

        let restricted = self.restricted.resolve(&ctx.request)?;
        if restricted.is_empty() {
            return Ok(true);
        }

        let host_zones = self.host_zones(host, ctx);
        if restricted.iter().any(|z| host_zones.contains(z)) {
            return Ok(true);
        }
        debug!(
            host = %host.host,
            ?restricted,
            ?host_zones,
            "host is outside the project's restricted zones"
        );
        Ok(false)
    }
}
