//! zonegate-core: shared vocabulary for zone-aware admission filtering.
//!
//! Holds the data model consumed by the resolvers and filter chains
//! (cells, hosts, aggregates, services, instances, projects), the request
//! contexts threaded through every filter, the `zonegate.toml` config, and
//! the clock abstraction used for TTL and staleness checks.

pub mod clock;
pub mod config;
pub mod context;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, CellType, CellsConfig, FiltersConfig, ZonegateConfig};
pub use context::{FilterContext, FlavorRequest, RequestContext, TrustedContext};
pub use types::*;
