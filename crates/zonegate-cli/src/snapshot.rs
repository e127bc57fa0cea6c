//! Snapshot files: a frozen view of the collaborators plus one request.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use zonegate_cache::CacheService;
use zonegate_core::{
    CellState, FilterContext, FlavorRequest, HostState, ProjectRecord, RequestContext,
    ZoneName, ZonegateConfig,
};
use zonegate_filters::FilterServices;
use zonegate_zones::{InventorySnapshot, RequestTokenCredentials, StaticInventory, StaticProjects};

#[derive(Debug, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub inventory: InventorySnapshot,
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
    #[serde(default)]
    pub cells: Vec<CellState>,
    #[serde(default)]
    pub hosts: Vec<HostState>,
    #[serde(default)]
    pub request: PendingRequest,
}

/// The request being admitted.
#[derive(Debug, Default, Deserialize)]
pub struct PendingRequest {
    #[serde(default)]
    pub context: RequestContext,
    #[serde(default)]
    pub availability_zone: Option<ZoneName>,
    #[serde(default)]
    pub scheduler_hints: BTreeMap<String, String>,
    #[serde(default)]
    pub flavor: FlavorRequest,
    #[serde(default)]
    pub request_index: usize,
}

impl Snapshot {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("failed to parse snapshot {}", path.display()))
    }

    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn filter_context(&self) -> FilterContext {
        let request = &self.request;
        let mut ctx = FilterContext::new(request.context.clone()).with_flavor(request.flavor);
        ctx.availability_zone = request.availability_zone.clone();
        ctx.scheduler_hints = request.scheduler_hints.clone();
        ctx.request_index = request.request_index;
        ctx
    }

    /// Wire filter services over this snapshot's inventory and projects.
    pub fn services(&self, config: ZonegateConfig) -> FilterServices {
        let cache = CacheService::memory(config.cache.max_entries);
        FilterServices::new(
            config,
            Arc::new(StaticInventory::from_snapshot(self.inventory.clone())),
            Arc::new(StaticProjects::new(self.projects.clone())),
            Arc::new(RequestTokenCredentials),
            cache,
        )
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<ZonegateConfig> {
    match path {
        Some(path) => ZonegateConfig::from_file(path),
        None => Ok(ZonegateConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "inventory": {
            "aggregates": [
                {"name": "a", "hosts": ["h1"], "metadata": {"availability_zone": "zoneA"}}
            ],
            "services": [{"host": "h1", "binary": "nova-compute", "topic": "compute"}]
        },
        "projects": [{"id": "p1", "compute_zones": "zoneA"}],
        "cells": [{"name": "c1", "capabilities": {"availability_zones": ["zoneA"]}}],
        "hosts": [{"host": "h1"}],
        "request": {
            "context": {"project_id": "p1", "auth_token": "secret"},
            "scheduler_hints": {"cell": "c1"},
            "flavor": {"root_gb": 1}
        }
    }"#;

    #[test]
    fn parses_full_snapshot() {
        let snapshot = Snapshot::from_json_str(SNAPSHOT).unwrap();
        assert_eq!(snapshot.inventory.aggregates.len(), 1);
        assert_eq!(snapshot.cells[0].capabilities.zones(), ["zoneA".to_string()]);

        let ctx = snapshot.filter_context();
        assert_eq!(ctx.request.auth_token.as_deref(), Some("secret"));
        assert_eq!(ctx.hint("cell"), Some("c1"));
        assert_eq!(ctx.flavor.disk_mb(), 1024);
        assert_eq!(ctx.requested_zone(), None);
    }

    #[test]
    fn empty_snapshot_is_valid() {
        let snapshot = Snapshot::from_json_str("{}").unwrap();
        assert!(snapshot.cells.is_empty());
        assert!(snapshot.hosts.is_empty());
    }

    #[test]
    fn reads_snapshot_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, SNAPSHOT).unwrap();
        let snapshot = Snapshot::from_file(&path).unwrap();
        assert_eq!(snapshot.projects[0].id, "p1");
    }

    #[test]
    fn missing_config_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), ZonegateConfig::default());
    }
}
