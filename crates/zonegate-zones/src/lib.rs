//! zonegate-zones: availability zone and zone-restriction resolution.
//!
//! Resolvers sit between the filters and two external collaborators: the
//! inventory (authoritative aggregate membership) and the project service
//! (per-project authorized zones and tags). Both are reached through narrow
//! traits and fronted by a [`zonegate_cache::CacheService`].
//!
//! # Components
//!
//! - **`inventory`**: [`Inventory`] contract and [`StaticInventory`]
//! - **`availability`**: [`AvailabilityZoneResolver`], read-through host
//!   and instance zones with explicit invalidation
//! - **`projects`**: [`ProjectService`], [`CredentialSource`] and the
//!   cached [`ProjectDirectory`]
//! - **`restricted`**: [`RestrictedZoneResolver`], a project's authorized
//!   zone set
//! - **`catalog`**: [`ZoneCatalog`], available vs. unavailable zone lists
//!
//! Zone lookups degrade to the configured default zone when the inventory
//! is unreachable. Restriction lookups never degrade: they fail closed.

pub mod availability;
pub mod catalog;
pub mod error;
pub mod inventory;
pub mod projects;
pub mod restricted;

pub use availability::{AvailabilityZoneResolver, host_cache_key};
pub use catalog::{ZoneCatalog, ZoneListing};
pub use error::{ZoneError, ZoneResult};
pub use inventory::{Inventory, InventoryError, InventoryResult, InventorySnapshot, StaticInventory};
pub use projects::{
    Credential, CredentialSource, ProjectDirectory, ProjectService, ProjectServiceError,
    RequestTokenCredentials, StaticProjects,
};
pub use restricted::{RestrictedZoneResolver, UNRESTRICTED_ZONES, parse_restricted_zones};
