//! Admission engine: both chains, resolved from configuration once.

use std::sync::Arc;

use tracing::info;
use zonegate_core::{CellState, FilterContext, HostState};

use crate::cell::{CellFilter, CellFilterChain, standard_cell_registry};
use crate::error::{FilterError, FilterResult};
use crate::host::{HostFilter, HostFilterChain, standard_host_registry};
use crate::registry::FilterRegistry;
use crate::services::FilterServices;

/// Resolved cell and host chains plus the services they were built over.
///
/// Cheap to clone and safe to share between concurrent requests.
#[derive(Clone)]
pub struct Admission {
    services: FilterServices,
    cells: CellFilterChain,
    hosts: HostFilterChain,
}

impl Admission {
    /// Resolve the configured filter names against the standard registries.
    ///
    /// Unknown names fail with `ClassNotFound`; a host filter configured on
    /// the cell chain (or the reverse) fails with `WrongScope`.
    pub fn from_config(services: FilterServices) -> FilterResult<Self> {
        Self::with_registries(services, &standard_cell_registry(), &standard_host_registry())
    }

    pub fn with_registries(
        services: FilterServices,
        cell_registry: &FilterRegistry<CellFilter>,
        host_registry: &FilterRegistry<Arc<dyn HostFilter>>,
    ) -> FilterResult<Self> {
        let filters = &services.config.filters;
        check_scope(&filters.cell_filters, cell_registry, host_registry)?;
        check_scope(&filters.host_filters, host_registry, cell_registry)?;

        let cells = CellFilterChain::new(cell_registry.resolve(&filters.cell_filters, &services)?);
        let hosts = HostFilterChain::new(host_registry.resolve(&filters.host_filters, &services)?);
        info!(
            cell_filters = ?cells.names(),
            host_filters = ?hosts.names(),
            "admission filters loaded"
        );

        Ok(Self {
            services,
            cells,
            hosts,
        })
    }

    pub fn services(&self) -> &FilterServices {
        &self.services
    }

    pub fn cell_chain(&self) -> &CellFilterChain {
        &self.cells
    }

    pub fn host_chain(&self) -> &HostFilterChain {
        &self.hosts
    }

    pub fn filter_cells<'a>(
        &self,
        cells: &'a [CellState],
        ctx: &FilterContext,
    ) -> FilterResult<Vec<&'a CellState>> {
        self.cells.filter_cells(cells, ctx)
    }

    /// Every host filter is applied; see [`HostFilterChain::filter_hosts`].
    pub fn filter_hosts<'a>(
        &self,
        hosts: &'a [HostState],
        ctx: &FilterContext,
    ) -> FilterResult<Vec<&'a HostState>> {
        self.hosts.filter_hosts(hosts, ctx)
    }

    /// Narrow an earlier pass's survivors for a later instance of the same
    /// request; see [`HostFilterChain::filter_survivors`].
    pub fn filter_survivors<'a>(
        &self,
        survivors: &[&'a HostState],
        ctx: &FilterContext,
    ) -> FilterResult<Vec<&'a HostState>> {
        self.hosts.filter_survivors(survivors, ctx)
    }
}

fn check_scope<F, G>(
    names: &[String],
    own: &FilterRegistry<F>,
    other: &FilterRegistry<G>,
) -> FilterResult<()> {
    match names
        .iter()
        .find(|name| !own.contains(name) && other.contains(name))
    {
        Some(name) => Err(FilterError::WrongScope {
            name: name.clone(),
            expected: own.scope(),
        }),
        None => Ok(()),
    }
}
