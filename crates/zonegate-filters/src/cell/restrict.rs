//! Role-restricted cells.

use std::collections::BTreeSet;

use tracing::debug;
use zonegate_core::{CellState, FilterContext};

use super::CellBatchFilter;
use crate::error::FilterResult;

/// Role that opens a role-restricted cell to everyone.
pub const UNRESTRICTED_ROLE: &str = "unrestricted";

/// Keeps cells that require no role, require [`UNRESTRICTED_ROLE`], or
/// require a role the requester holds.
pub struct RestrictCellFilter;

impl CellBatchFilter for RestrictCellFilter {
    fn name(&self) -> &'static str {
        "restrict"
    }

    fn filter_all<'a>(
        &self,
        cells: &[&'a CellState],
        ctx: &FilterContext,
    ) -> FilterResult<Vec<&'a CellState>> {
        let roles: BTreeSet<&str> = ctx.request.roles.iter().map(String::as_str).collect();
        Ok(cells
            .iter()
            .copied()
            .filter(|cell| {
                let required = &cell.capabilities.required_roles;
                let allowed = required.is_empty()
                    || required.iter().any(|r| r == UNRESTRICTED_ROLE)
                    || required.iter().any(|r| roles.contains(r.as_str()));
                if !allowed {
                    debug!(cell = %cell.name, ?required, "requester lacks a required role");
                }
                allowed
            })
            .collect())
    }
}
