//! zonegate-filters: zone-aware admission filtering.
//!
//! Narrows candidate cells and hosts down to those eligible for a request.
//! It does NOT weigh or rank survivors; that is the scheduler's job.
//!
//! # Components
//!
//! - **`cell`**: [`CellFilterChain`] and the reference cell filters
//! - **`host`**: [`HostFilterChain`] and the reference host filters
//! - **`registry`**: [`FilterRegistry`], name → filter constructor tables
//! - **`services`**: [`FilterServices`], resolvers shared by all filters
//! - **`engine`**: [`Admission`], chains resolved from config at startup
//!
//! Every chain is a pure function of (context, candidates) → subset.
//! Filters may shrink the candidate list but never grow it.

pub mod cell;
pub mod engine;
pub mod error;
pub mod host;
pub mod registry;
pub mod services;

pub use cell::{CellBatchFilter, CellFilter, CellFilterChain, CellPredicate, standard_cell_registry};
pub use engine::Admission;
pub use error::{FilterError, FilterResult, FilterScope};
pub use host::{HostFilter, HostFilterChain, standard_host_registry};
pub use registry::{FilterRegistry, RegistryEntry};
pub use services::FilterServices;
