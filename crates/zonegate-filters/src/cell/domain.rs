//! Domain-restricted cells.

use tracing::{debug, warn};
use zonegate_core::{CellState, FilterContext};

use super::CellBatchFilter;
use crate::error::FilterResult;

/// Keeps cells whose allowed domains include the requester's project domain.
pub struct DomainRestrictCellFilter;

impl CellBatchFilter for DomainRestrictCellFilter {
    fn name(&self) -> &'static str {
        "domain_restrict"
    }

    fn filter_all<'a>(
        &self,
        cells: &[&'a CellState],
        ctx: &FilterContext,
    ) -> FilterResult<Vec<&'a CellState>> {
        if ctx.request.domain().is_none() {
            warn!(project = %ctx.request.project_id, "no domain found in context, using default");
        }
        let domain = ctx.domain_or_default();
        debug!(domain, "filtering on project domain");

        Ok(cells
            .iter()
            .copied()
            .filter(|cell| cell.capabilities.allowed_domains().iter().any(|d| d == domain))
            .collect())
    }
}
