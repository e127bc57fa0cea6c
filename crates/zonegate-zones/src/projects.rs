//! Project service contract and the cached project directory.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use zonegate_cache::CacheService;
use zonegate_core::{ProjectRecord, RequestContext};

use crate::error::{ZoneError, ZoneResult};

/// Opaque credential presented to the project service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Obtains a credential on behalf of a requester.
pub trait CredentialSource: Send + Sync {
    fn credential(&self, ctx: &RequestContext) -> Option<Credential>;
}

/// Uses the requester's own auth token.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestTokenCredentials;

impl CredentialSource for RequestTokenCredentials {
    fn credential(&self, ctx: &RequestContext) -> Option<Credential> {
        ctx.auth_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(Credential::new)
    }
}

#[derive(Debug, Error)]
pub enum ProjectServiceError {
    #[error("project not found: {0}")]
    NotFound(String),

    #[error("credential rejected")]
    Unauthorized,

    #[error("project service unavailable: {0}")]
    Unavailable(String),

    #[error("project service timed out after {0:?}")]
    Timeout(Duration),
}

/// The identity/project service, owned elsewhere.
///
/// Implementations are expected to bound their own call time and report
/// [`ProjectServiceError::Timeout`] rather than block indefinitely.
pub trait ProjectService: Send + Sync {
    fn get_project(
        &self,
        project_id: &str,
        credential: &Credential,
    ) -> Result<ProjectRecord, ProjectServiceError>;
}

/// In-memory project service.
///
/// Accepts any credential unless `required_token` is set. Counts calls.
#[derive(Debug, Default)]
pub struct StaticProjects {
    projects: HashMap<String, ProjectRecord>,
    required_token: Option<String>,
    calls: AtomicUsize,
}

impl StaticProjects {
    pub fn new(projects: impl IntoIterator<Item = ProjectRecord>) -> Self {
        Self {
            projects: projects.into_iter().map(|p| (p.id.clone(), p)).collect(),
            required_token: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn requiring_token(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProjectService for StaticProjects {
    fn get_project(
        &self,
        project_id: &str,
        credential: &Credential,
    ) -> Result<ProjectRecord, ProjectServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .required_token
            .as_deref()
            .is_some_and(|t| t != credential.token())
        {
            return Err(ProjectServiceError::Unauthorized);
        }
        self.projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| ProjectServiceError::NotFound(project_id.to_string()))
    }
}

/// Fetch a project record, uncached. Missing credentials and rejected
/// credentials both surface as [`ZoneError::Unauthorized`].
pub(crate) fn fetch_project(
    service: &dyn ProjectService,
    credentials: &dyn CredentialSource,
    ctx: &RequestContext,
) -> ZoneResult<ProjectRecord> {
    let unauthorized = || ZoneError::Unauthorized {
        project_id: ctx.project_id.clone(),
    };
    let credential = credentials.credential(ctx).ok_or_else(unauthorized)?;
    service
        .get_project(&ctx.project_id, &credential)
        .map_err(|source| match source {
            ProjectServiceError::Unauthorized => unauthorized(),
            source => ZoneError::ProjectLookup {
                project_id: ctx.project_id.clone(),
                source,
            },
        })
}

/// Cached project records, keyed by project id.
#[derive(Clone)]
pub struct ProjectDirectory {
    service: Arc<dyn ProjectService>,
    credentials: Arc<dyn CredentialSource>,
    cache: CacheService,
    ttl: Duration,
}

impl ProjectDirectory {
    pub fn new(
        service: Arc<dyn ProjectService>,
        credentials: Arc<dyn CredentialSource>,
        cache: CacheService,
        ttl: Duration,
    ) -> Self {
        Self {
            service,
            credentials,
            cache,
            ttl,
        }
    }

    fn cache_key(project_id: &str) -> String {
        format!("project-{project_id}")
    }

    /// The requester's project record, from cache or the project service.
    pub fn get_project(&self, ctx: &RequestContext) -> ZoneResult<ProjectRecord> {
        let key = Self::cache_key(&ctx.project_id);
        if let Some(project) = self.cache.get::<ProjectRecord>(&key) {
            debug!(project_id = %ctx.project_id, "project record cache hit");
            return Ok(project);
        }

        let project = fetch_project(self.service.as_ref(), self.credentials.as_ref(), ctx)?;
        self.cache.set(&key, &project, self.ttl);
        Ok(project)
    }
}
