//! Restricted zone resolution.
//!
//! A project's authorized zones live on its record in the project service
//! as a comma-joined `compute_zones` attribute. A missing attribute, an
//! empty one, or the `"ALL"` sentinel all mean the project may use any zone.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use zonegate_cache::CacheService;
use zonegate_core::{RequestContext, ZoneName};

use crate::error::ZoneResult;
use crate::projects::{CredentialSource, ProjectService, fetch_project};

/// Attribute value meaning "no restriction".
pub const UNRESTRICTED_ZONES: &str = "ALL";

/// Resolves the set of zones a project is authorized to use.
#[derive(Clone)]
pub struct RestrictedZoneResolver {
    enabled: bool,
    service: Arc<dyn ProjectService>,
    credentials: Arc<dyn CredentialSource>,
    cache: CacheService,
    ttl: Duration,
}

impl RestrictedZoneResolver {
    pub fn new(
        enabled: bool,
        service: Arc<dyn ProjectService>,
        credentials: Arc<dyn CredentialSource>,
        cache: CacheService,
        ttl: Duration,
    ) -> Self {
        Self {
            enabled,
            service,
            credentials,
            cache,
            ttl,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn cache_key(project_id: &str) -> String {
        format!("restricted-zones-{project_id}")
    }

    /// Authorized zones for the requester's project. Empty means
    /// unrestricted.
    ///
    /// Fails with `Unauthorized` when no credential can be obtained and with
    /// `ProjectLookup` when the project service fails; neither is ever
    /// reported as "unrestricted".
    pub fn resolve(&self, ctx: &RequestContext) -> ZoneResult<Vec<ZoneName>> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let key = Self::cache_key(&ctx.project_id);
        let raw = match self.cache.get::<String>(&key) {
            Some(raw) => {
                debug!(project_id = %ctx.project_id, "restricted zones cache hit");
                raw
            }
            None => {
                let project =
                    fetch_project(self.service.as_ref(), self.credentials.as_ref(), ctx)?;
                let raw = project
                    .compute_zones
                    .unwrap_or_else(|| UNRESTRICTED_ZONES.to_string());
                self.cache.set(&key, &raw, self.ttl);
                raw
            }
        };

        Ok(parse_restricted_zones(&raw))
    }
}

/// Split a raw `compute_zones` value into zone names.
pub fn parse_restricted_zones(raw: &str) -> Vec<ZoneName> {
    let raw = raw.trim();
    if raw.is_empty() || raw == UNRESTRICTED_ZONES {
        return Vec::new();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|zone| !zone.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZoneError;
    use crate::projects::{ProjectServiceError, RequestTokenCredentials, StaticProjects};
    use zonegate_core::ProjectRecord;

    fn project(id: &str, compute_zones: Option<&str>) -> ProjectRecord {
        ProjectRecord {
            id: id.to_string(),
            compute_zones: compute_zones.map(str::to_string),
            ..ProjectRecord::default()
        }
    }

    fn resolver(enabled: bool, service: Arc<StaticProjects>) -> RestrictedZoneResolver {
        RestrictedZoneResolver::new(
            enabled,
            service,
            Arc::new(RequestTokenCredentials),
            CacheService::memory(64),
            Duration::from_secs(3600),
        )
    }

    fn ctx(project_id: &str) -> RequestContext {
        RequestContext::new("u", project_id).with_token("t")
    }

    #[test]
    fn disabled_enforcement_is_unrestricted_without_lookup() {
        let service = Arc::new(StaticProjects::new([project("p1", Some("nova"))]));
        let resolver = resolver(false, service.clone());

        assert!(resolver.resolve(&ctx("p1")).unwrap().is_empty());
        // Even an unauthenticated request is unrestricted when disabled.
        assert!(resolver.resolve(&RequestContext::new("u", "p1")).unwrap().is_empty());
        assert_eq!(service.calls(), 0);
    }

    #[test]
    fn splits_comma_joined_zones() {
        let service = Arc::new(StaticProjects::new([project("p1", Some("nova,nova2"))]));
        let resolver = resolver(true, service);
        assert_eq!(resolver.resolve(&ctx("p1")).unwrap(), vec!["nova", "nova2"]);
    }

    #[test]
    fn all_sentinel_is_unrestricted() {
        let service = Arc::new(StaticProjects::new([project("p1", Some("ALL"))]));
        assert!(resolver(true, service).resolve(&ctx("p1")).unwrap().is_empty());
    }

    #[test]
    fn absent_or_empty_attribute_is_unrestricted() {
        let service = Arc::new(StaticProjects::new([
            project("absent", None),
            project("empty", Some("")),
        ]));
        let resolver = resolver(true, service);
        assert!(resolver.resolve(&ctx("absent")).unwrap().is_empty());
        assert!(resolver.resolve(&ctx("empty")).unwrap().is_empty());
    }

    #[test]
    fn caches_raw_value_per_project() {
        let service = Arc::new(StaticProjects::new([
            project("p1", Some("nova")),
            project("p2", None),
        ]));
        let resolver = resolver(true, service.clone());

        resolver.resolve(&ctx("p1")).unwrap();
        resolver.resolve(&ctx("p1")).unwrap();
        resolver.resolve(&ctx("p2")).unwrap();
        resolver.resolve(&ctx("p2")).unwrap();

        assert_eq!(service.calls(), 2);
    }

    #[test]
    fn missing_credential_fails_closed() {
        let service = Arc::new(StaticProjects::new([project("p1", Some("nova"))]));
        let resolver = resolver(true, service);
        let err = resolver.resolve(&RequestContext::new("u", "p1")).unwrap_err();
        assert!(matches!(err, ZoneError::Unauthorized { .. }));
    }

    #[test]
    fn service_failure_propagates() {
        struct Down;
        impl ProjectService for Down {
            fn get_project(
                &self,
                _project_id: &str,
                _credential: &crate::projects::Credential,
            ) -> Result<ProjectRecord, ProjectServiceError> {
                Err(ProjectServiceError::Timeout(Duration::from_secs(5)))
            }
        }

        let resolver = RestrictedZoneResolver::new(
            true,
            Arc::new(Down),
            Arc::new(RequestTokenCredentials),
            CacheService::memory(8),
            Duration::from_secs(60),
        );
        assert!(matches!(
            resolver.resolve(&ctx("p1")),
            Err(ZoneError::ProjectLookup {
                source: ProjectServiceError::Timeout(_),
                ..
            })
        ));
    }

    #[test]
    fn parse_trims_whitespace_and_empties() {
        assert_eq!(parse_restricted_zones(" nova , ,nova2 "), vec!["nova", "nova2"]);
        assert!(parse_restricted_zones("  ").is_empty());
        assert!(parse_restricted_zones(" ALL ").is_empty());
    }
}
