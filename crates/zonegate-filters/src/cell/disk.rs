//! Cell filtering on advertised free disk.

use tracing::debug;
use zonegate_core::{CellState, FilterContext};

use super::CellPredicate;
use crate::error::FilterResult;

/// Free units a cell must advertise for the exact disk size requested.
/// The last unit of any size is never offered at cell level.
pub const MIN_FREE_UNITS: u64 = 2;

/// Passes cells with at least [`MIN_FREE_UNITS`] free for the request's
/// disk size. Requests naming a zone bypass the check.
pub struct DiskFilter;

impl CellPredicate for DiskFilter {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn cell_passes(&self, cell: &CellState, ctx: &FilterContext) -> FilterResult<bool> {
        if ctx.requested_zone().is_some() {
            return Ok(true);
        }
        let needed = ctx.flavor.disk_mb();
        let free = cell.capacities.disk_units_for(needed);
        debug!(cell = %cell.name, disk_mb = needed, free, "filtering on disk");
        Ok(free >= MIN_FREE_UNITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonegate_core::{FlavorRequest, RequestContext};

    fn cell_with_units(mb: u64, units: u64) -> CellState {
        let mut cell = CellState::new("c");
        cell.capacities
            .disk_free
            .units_by_mb
            .insert(mb.to_string(), units);
        cell
    }

    fn ctx() -> FilterContext {
        FilterContext::new(RequestContext::new("u", "p")).with_flavor(FlavorRequest {
            root_gb: 10,
            ephemeral_gb: 20,
            ..FlavorRequest::default()
        })
    }

    #[test]
    fn two_free_units_pass() {
        assert!(DiskFilter.cell_passes(&cell_with_units(30_720, 2), &ctx()).unwrap());
    }

    #[test]
    fn one_free_unit_fails() {
        assert!(!DiskFilter.cell_passes(&cell_with_units(30_720, 1), &ctx()).unwrap());
    }

    #[test]
    fn only_the_exact_bucket_counts() {
        assert!(!DiskFilter.cell_passes(&cell_with_units(20_480, 50), &ctx()).unwrap());
    }

    #[test]
    fn explicit_zone_bypasses_check() {
        let ctx = ctx().with_zone("nova");
        assert!(DiskFilter.cell_passes(&cell_with_units(30_720, 0), &ctx).unwrap());
        assert!(DiskFilter.cell_passes(&CellState::new("empty"), &ctx).unwrap());
    }
}
