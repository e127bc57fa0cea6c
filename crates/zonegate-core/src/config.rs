//! zonegate.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZonegateConfig {
    /// Zone reported for compute hosts outside any zoned aggregate.
    pub default_availability_zone: String,
    /// Zone reported for non-compute services.
    pub internal_service_availability_zone: String,
    /// Enforce per-project zone restrictions.
    pub restrict_zones: bool,
    pub cells: CellsConfig,
    pub cache: CacheConfig,
    pub filters: FiltersConfig,
}

impl Default for ZonegateConfig {
    fn default() -> Self {
        Self {
            default_availability_zone: "nova".to_string(),
            internal_service_availability_zone: "internal".to_string(),
            restrict_zones: false,
            cells: CellsConfig::default(),
            cache: CacheConfig::default(),
            filters: FiltersConfig::default(),
        }
    }
}

/// Role of this process in the cell tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    /// Top-level cell: instance zones come from system metadata.
    Api,
    /// Child cell: instance zones come from the inventory.
    #[default]
    Compute,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CellsConfig {
    pub cell_type: CellType,
    /// Cells that may only be scheduled to with an explicit zone or `cell` hint.
    pub scheduler_direct_only_cells: Vec<String>,
    /// Seconds without a capability report before a child cell is muted.
    pub mute_child_interval_secs: u64,
}

impl Default for CellsConfig {
    fn default() -> Self {
        Self {
            cell_type: CellType::Compute,
            scheduler_direct_only_cells: Vec::new(),
            mute_child_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub availability_zone_ttl_secs: u64,
    pub project_ttl_secs: u64,
    pub restricted_zone_ttl_secs: u64,
    pub zone_list_ttl_secs: u64,
    /// Upper bound on in-memory entries before LRU eviction.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            availability_zone_ttl_secs: 3600,
            project_ttl_secs: 3600,
            restricted_zone_ttl_secs: 3600,
            zone_list_ttl_secs: 300,
            max_entries: 4096,
        }
    }
}

impl CacheConfig {
    pub fn availability_zone_ttl(&self) -> Duration {
        Duration::from_secs(self.availability_zone_ttl_secs)
    }

    pub fn project_ttl(&self) -> Duration {
        Duration::from_secs(self.project_ttl_secs)
    }

    pub fn restricted_zone_ttl(&self) -> Duration {
        Duration::from_secs(self.restricted_zone_ttl_secs)
    }

    pub fn zone_list_ttl(&self) -> Duration {
        Duration::from_secs(self.zone_list_ttl_secs)
    }
}

/// Ordered filter identifiers, resolved once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FiltersConfig {
    pub cell_filters: Vec<String>,
    pub host_filters: Vec<String>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            cell_filters: vec!["all_cell_filters".to_string()],
            host_filters: vec!["restricted_zone".to_string(), "project_tags".to_string()],
        }
    }
}

impl ZonegateConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn is_direct_only(&self, cell_name: &str) -> bool {
        self.cells
            .scheduler_direct_only_cells
            .iter()
            .any(|c| c == cell_name)
    }
}
