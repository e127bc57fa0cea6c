//! Error types for zone restriction lookups.

use thiserror::Error;

use crate::projects::ProjectServiceError;

/// Result type alias for restriction lookups.
pub type ZoneResult<T> = Result<T, ZoneError>;

/// Errors on the restriction path. None of these may be read as
/// "unrestricted"; they block the request.
#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("unauthorized: no valid credential for project {project_id}")]
    Unauthorized { project_id: String },

    #[error("project lookup failed for {project_id}: {source}")]
    ProjectLookup {
        project_id: String,
        #[source]
        source: ProjectServiceError,
    },
}
