//! Cell filter chain.
//!
//! Cell filters come in two shapes:
//!
//! - **predicates** ([`CellPredicate`]) judge one cell at a time
//! - **batch filters** ([`CellBatchFilter`]) take the current survivors and
//!   return the subset to keep
//!
//! The chain runs filters in configured order, threading the shrinking
//! survivor list from one to the next, and stops as soon as it is empty.

pub mod availability_zone;
pub mod direct_only;
pub mod disk;
pub mod domain;
pub mod restrict;

use std::sync::Arc;

use tracing::{debug, warn};
use zonegate_core::{CellState, FilterContext};

use crate::error::{FilterResult, FilterScope};
use crate::registry::FilterRegistry;
use crate::services::FilterServices;

pub use availability_zone::AvailabilityZoneFilter;
pub use direct_only::DirectOnlyCellFilter;
pub use disk::DiskFilter;
pub use domain::DomainRestrictCellFilter;
pub use restrict::RestrictCellFilter;

/// A cell filter evaluated independently per cell.
pub trait CellPredicate: Send + Sync {
    fn name(&self) -> &'static str;

    fn cell_passes(&self, cell: &CellState, ctx: &FilterContext) -> FilterResult<bool>;
}

/// A cell filter evaluated over the whole survivor list.
pub trait CellBatchFilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Return the cells from `cells` to keep. Anything returned that was
    /// not in `cells` is discarded by the chain.
    fn filter_all<'a>(
        &self,
        cells: &[&'a CellState],
        ctx: &FilterContext,
    ) -> FilterResult<Vec<&'a CellState>>;
}

/// One step of a [`CellFilterChain`].
#[derive(Clone)]
pub enum CellFilter {
    Predicate(Arc<dyn CellPredicate>),
    Batch(Arc<dyn CellBatchFilter>),
}

impl CellFilter {
    pub fn predicate(filter: impl CellPredicate + 'static) -> Self {
        CellFilter::Predicate(Arc::new(filter))
    }

    pub fn batch(filter: impl CellBatchFilter + 'static) -> Self {
        CellFilter::Batch(Arc::new(filter))
    }

    pub fn name(&self) -> &'static str {
        match self {
            CellFilter::Predicate(f) => f.name(),
            CellFilter::Batch(f) => f.name(),
        }
    }

    fn apply<'a>(
        &self,
        cells: Vec<&'a CellState>,
        ctx: &FilterContext,
    ) -> FilterResult<Vec<&'a CellState>> {
        match self {
            CellFilter::Predicate(filter) => {
                let mut kept = Vec::with_capacity(cells.len());
                for cell in cells {
                    if filter.cell_passes(cell, ctx)? {
                        kept.push(cell);
                    } else {
                        debug!(filter = filter.name(), cell = %cell.name, "cell rejected");
                    }
                }
                Ok(kept)
            }
            CellFilter::Batch(filter) => {
                let returned = filter.filter_all(&cells, ctx)?;
                let kept: Vec<&CellState> = cells
                    .iter()
                    .copied()
                    .filter(|cell| returned.iter().any(|r| std::ptr::eq(*r, *cell)))
                    .collect();
                let foreign = returned
                    .iter()
                    .filter(|r| !cells.iter().any(|c| std::ptr::eq(**r, *c)))
                    .count();
                if foreign > 0 {
                    warn!(
                        filter = filter.name(),
                        foreign,
                        "batch filter returned cells outside its input, ignoring them"
                    );
                }
                Ok(kept)
            }
        }
    }
}

/// Ordered cell filters, resolved once and reused across requests.
#[derive(Clone, Default)]
pub struct CellFilterChain {
    filters: Vec<CellFilter>,
}

impl CellFilterChain {
    pub fn new(filters: Vec<CellFilter>) -> Self {
        Self { filters }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(CellFilter::name).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Cells from `cells` that pass every filter, in input order.
    pub fn filter_cells<'a>(
        &self,
        cells: &'a [CellState],
        ctx: &FilterContext,
    ) -> FilterResult<Vec<&'a CellState>> {
        let mut survivors: Vec<&CellState> = cells.iter().collect();
        for filter in &self.filters {
            if survivors.is_empty() {
                debug!(filter = filter.name(), "no cells left, skipping remaining filters");
                break;
            }
            let before = survivors.len();
            survivors = filter.apply(survivors, ctx)?;
            debug!(
                filter = filter.name(),
                before,
                after = survivors.len(),
                "cell filter applied"
            );
        }
        Ok(survivors)
    }
}

fn standard_cell_filters(services: &FilterServices) -> Vec<CellFilter> {
    vec![
        CellFilter::batch(RestrictCellFilter),
        CellFilter::batch(DomainRestrictCellFilter),
        CellFilter::predicate(DirectOnlyCellFilter::from_services(services)),
        CellFilter::predicate(AvailabilityZoneFilter::from_services(services)),
        CellFilter::predicate(DiskFilter),
    ]
}

/// Registry of the built-in cell filters plus the `all_cell_filters` group.
pub fn standard_cell_registry() -> FilterRegistry<CellFilter> {
    FilterRegistry::new(FilterScope::Cell)
        .with_filter("restrict", |_| CellFilter::batch(RestrictCellFilter))
        .with_filter("domain_restrict", |_| CellFilter::batch(DomainRestrictCellFilter))
        .with_filter("direct_only", |s| {
            CellFilter::predicate(DirectOnlyCellFilter::from_services(s))
        })
        .with_filter("availability_zone", |s| {
            CellFilter::predicate(AvailabilityZoneFilter::from_services(s))
        })
        .with_filter("disk", |_| CellFilter::predicate(DiskFilter))
        .with_group("all_cell_filters", standard_cell_filters)
}
