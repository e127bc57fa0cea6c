use std::path::Path;
use std::sync::Arc;

use zonegate_core::{CellType, SystemClock, TrustedContext};
use zonegate_zones::ZoneCatalog;

use crate::snapshot::{Snapshot, load_config};

pub fn run(config: Option<&Path>, snapshot: &Path, available_only: bool) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let snapshot = Snapshot::from_file(snapshot)?;
    let cell_type = config.cells.cell_type;

    let services = snapshot.services(config);
    let catalog = ZoneCatalog::new(
        services.zones.clone(),
        services.cache.clone(),
        Arc::new(SystemClock),
        &services.config,
    );

    let mut listing = match cell_type {
        CellType::Api => catalog.list_cell_zones(&snapshot.cells),
        CellType::Compute => catalog.list_zones(&TrustedContext::service(), available_only),
    };
    if available_only {
        listing.unavailable.clear();
    }
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}
