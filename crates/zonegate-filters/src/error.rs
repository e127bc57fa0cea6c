//! Filter error types.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use zonegate_zones::ZoneError;

/// Result type alias for filter construction and evaluation.
pub type FilterResult<T> = Result<T, FilterError>;

/// Which chain a filter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterScope {
    Cell,
    Host,
}

impl fmt::Display for FilterScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterScope::Cell => write!(f, "cell"),
            FilterScope::Host => write!(f, "host"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FilterError {
    /// A configured filter name matched nothing. Raised while building the
    /// chains, before any request is evaluated.
    #[error("filter class not found: {name} ({reason})")]
    ClassNotFound { name: String, reason: String },

    /// A filter name from one chain's registry was configured on the other.
    #[error("filter {name} is not a {expected} filter")]
    WrongScope { name: String, expected: FilterScope },

    /// Restriction lookup failed; the request must not be scheduled.
    #[error(transparent)]
    Zone(#[from] ZoneError),
}
