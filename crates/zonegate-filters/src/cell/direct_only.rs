//! Cells reachable only when targeted directly.

use std::collections::BTreeSet;

use tracing::debug;
use zonegate_core::{CellState, FilterContext};

use super::CellPredicate;
use crate::error::FilterResult;
use crate::services::FilterServices;

/// Scheduler hint naming a target cell.
pub const CELL_HINT: &str = "cell";

/// Rejects direct-only cells unless the request names a zone or carries a
/// `cell` scheduler hint.
pub struct DirectOnlyCellFilter {
    direct_only: BTreeSet<String>,
}

impl DirectOnlyCellFilter {
    pub fn new(direct_only: impl IntoIterator<Item = String>) -> Self {
        Self {
            direct_only: direct_only.into_iter().collect(),
        }
    }

    pub fn from_services(services: &FilterServices) -> Self {
        Self::new(services.config.cells.scheduler_direct_only_cells.iter().cloned())
    }
}

impl CellPredicate for DirectOnlyCellFilter {
    fn name(&self) -> &'static str {
        "direct_only"
    }

    fn cell_passes(&self, cell: &CellState, ctx: &FilterContext) -> FilterResult<bool> {
        let targeted = ctx.requested_zone().is_some() || ctx.hint(CELL_HINT).is_some();
        if !targeted && self.direct_only.contains(&cell.name) {
            debug!(cell = %cell.name, "cell only accessible directly");
            return Ok(false);
        }
        Ok(true)
    }
}
