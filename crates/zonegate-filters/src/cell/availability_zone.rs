//! Cell filtering on advertised availability zones.

use tracing::debug;
use zonegate_core::{CellState, FilterContext, ZoneName};
use zonegate_zones::RestrictedZoneResolver;

use super::CellPredicate;
use crate::error::FilterResult;
use crate::services::FilterServices;

/// Passes cells that advertise the requested zone.
///
/// Without an explicit zone, a cell is rejected only when the requester's
/// project is restricted and none of its authorized zones are advertised by
/// the cell. Restriction lookup failures are returned as errors.
///
/// A cell whose report carries no zone list is taken to be in the default
/// zone.
pub struct AvailabilityZoneFilter {
    restricted: RestrictedZoneResolver,
    default_zone: ZoneName,
}

impl AvailabilityZoneFilter {
    pub fn new(restricted: RestrictedZoneResolver, default_zone: &str) -> Self {
        Self {
            restricted,
            default_zone: default_zone.to_string(),
        }
    }

    pub fn from_services(services: &FilterServices) -> Self {
        Self::new(
            services.restricted.clone(),
            &services.config.default_availability_zone,
        )
    }

    fn advertised<'c>(&'c self, cell: &'c CellState) -> &'c [ZoneName] {
        match cell.capabilities.availability_zones.as_deref() {
            Some(zones) => zones,
            None => std::slice::from_ref(&self.default_zone),
        }
    }
}

impl CellPredicate for AvailabilityZoneFilter {
    fn name(&self) -> &'static str {
        "availability_zone"
    }

    fn cell_passes(&self, cell: &CellState, ctx: &FilterContext) -> FilterResult<bool> {
        let advertised = self.advertised(cell);
        debug!(cell = %cell.name, ?advertised, "filtering on availability zones");

        if let Some(requested) = ctx.requested_zone() {
            return Ok(advertised.iter().any(|z| z == requested));
        }

        let restricted = self.restricted.resolve(&ctx.request)?;
        if restricted.is_empty() {
            return Ok(true);
        }
        Ok(restricted.iter().any(|z| advertised.contains(z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use zonegate_cache::CacheService;
    use zonegate_core::{ProjectRecord, RequestContext};
    use zonegate_zones::{RequestTokenCredentials, StaticProjects, ZoneError};

    fn filter(enabled: bool, projects: Arc<StaticProjects>) -> AvailabilityZoneFilter {
        AvailabilityZoneFilter::new(
            RestrictedZoneResolver::new(
                enabled,
                projects,
                Arc::new(RequestTokenCredentials),
                CacheService::memory(16),
                Duration::from_secs(60),
            ),
            "nova",
        )
    }

    fn project(id: &str, zones: Option<&str>) -> ProjectRecord {
        ProjectRecord {
            id: id.to_string(),
            compute_zones: zones.map(str::to_string),
            ..ProjectRecord::default()
        }
    }

    fn ctx(project_id: &str) -> FilterContext {
        FilterContext::new(RequestContext::new("u", project_id).with_token("tok"))
    }

    #[test]
    fn explicit_zone_must_be_advertised() {
        let f = filter(true, Arc::new(StaticProjects::default()));
        let cell = CellState::new("c1").with_zones(&["nova", "nova2"]);
        assert!(f.cell_passes(&cell, &ctx("p").with_zone("nova2")).unwrap());
        assert!(!f.cell_passes(&cell, &ctx("p").with_zone("other")).unwrap());
    }

    #[test]
    fn explicit_zone_skips_restriction_lookup() {
        let projects = Arc::new(StaticProjects::new([project("p", Some("nova"))]));
        let f = filter(true, projects.clone());
        let cell = CellState::new("c1").with_zones(&["nova"]);
        f.cell_passes(&cell, &ctx("p").with_zone("nova")).unwrap();
        assert_eq!(projects.calls(), 0);
    }

    #[test]
    fn restricted_project_needs_overlap() {
        let projects = Arc::new(StaticProjects::new([project("p", Some("nova"))]));
        let f = filter(true, projects);
        let c1 = CellState::new("c1").with_zones(&["nova", "nova2"]);
        let c2 = CellState::new("c2").with_zones(&["nova2"]);
        assert!(f.cell_passes(&c1, &ctx("p")).unwrap());
        assert!(!f.cell_passes(&c2, &ctx("p")).unwrap());
    }

    #[test]
    fn unrestricted_project_passes_any_cell() {
        let projects = Arc::new(StaticProjects::new([project("p", Some("ALL"))]));
        let f = filter(true, projects);
        let bare = CellState::new("bare");
        assert!(f.cell_passes(&bare, &ctx("p")).unwrap());
    }

    #[test]
    fn cell_without_zone_list_is_in_default_zone() {
        let projects = Arc::new(StaticProjects::new([project("p", Some("nova"))]));
        let f = filter(true, projects);
        let bare = CellState::new("bare");
        assert!(f.cell_passes(&bare, &ctx("p")).unwrap());
        assert!(f.cell_passes(&bare, &ctx("p").with_zone("nova")).unwrap());
        assert!(!f.cell_passes(&bare, &ctx("p").with_zone("other")).unwrap());

        let elsewhere = Arc::new(StaticProjects::new([project("q", Some("nova2"))]));
        let f = filter(true, elsewhere);
        assert!(!f.cell_passes(&bare, &ctx("q")).unwrap());
    }

    #[test]
    fn empty_zone_list_advertises_nothing() {
        let projects = Arc::new(StaticProjects::new([project("p", Some("nova"))]));
        let f = filter(true, projects);
        let empty = CellState::new("empty").with_zones(&[]);
        assert!(!f.cell_passes(&empty, &ctx("p")).unwrap());
    }

    #[test]
    fn missing_credential_is_an_error() {
        let projects = Arc::new(StaticProjects::new([project("p", Some("nova"))]));
        let f = filter(true, projects);
        let cell = CellState::new("c1").with_zones(&["nova"]);
        let no_token = FilterContext::new(RequestContext::new("u", "p"));
        let err = f.cell_passes(&cell, &no_token).unwrap_err();
        assert!(matches!(
            err,
            crate::FilterError::Zone(ZoneError::Unauthorized { .. })
        ));
    }
}
