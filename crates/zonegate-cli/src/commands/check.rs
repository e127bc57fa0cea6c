use std::path::Path;

use serde::Serialize;
use tracing::info;
use zonegate_filters::Admission;

use crate::snapshot::{Snapshot, load_config};

#[derive(Debug, Serialize)]
struct CheckReport {
    cell_filters: Vec<&'static str>,
    host_filters: Vec<&'static str>,
    cells: Vec<String>,
    hosts: Vec<String>,
}

pub fn run(config: Option<&Path>, snapshot: &Path) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let snapshot = Snapshot::from_file(snapshot)?;
    let report = evaluate(&snapshot, config)?;
    info!(cells = report.cells.len(), hosts = report.hosts.len(), "admission complete");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn evaluate(snapshot: &Snapshot, config: zonegate_core::ZonegateConfig) -> anyhow::Result<CheckReport> {
    let engine = Admission::from_config(snapshot.services(config))?;
    let ctx = snapshot.filter_context();

    let cells = engine
        .filter_cells(&snapshot.cells, &ctx)?
        .into_iter()
        .map(|c| c.name.clone())
        .collect();
    // Later instances are placed from the first instance's survivors.
    let mut first = ctx.clone();
    first.request_index = 0;
    let mut hosts = engine.filter_hosts(&snapshot.hosts, &first)?;
    if ctx.request_index > 0 {
        hosts = engine.filter_survivors(&hosts, &ctx)?;
    }
    let hosts = hosts.into_iter().map(|h| h.host.clone()).collect();

    Ok(CheckReport {
        cell_filters: engine.cell_chain().names(),
        host_filters: engine.host_chain().names(),
        cells,
        hosts,
    })
}
