//! Shared resolvers handed to filter constructors.

use std::sync::Arc;

use zonegate_cache::CacheService;
use zonegate_core::ZonegateConfig;
use zonegate_zones::{
    AvailabilityZoneResolver, CredentialSource, Inventory, ProjectDirectory, ProjectService,
    RestrictedZoneResolver,
};

/// Everything a filter constructor may depend on.
///
/// Built once per process and cloned cheaply into filters; all members are
/// safe to share across concurrent requests.
#[derive(Clone)]
pub struct FilterServices {
    pub config: Arc<ZonegateConfig>,
    pub zones: AvailabilityZoneResolver,
    pub restricted: RestrictedZoneResolver,
    pub projects: ProjectDirectory,
    pub cache: CacheService,
}

impl FilterServices {
    /// Wire the resolvers over one shared cache.
    pub fn new(
        config: ZonegateConfig,
        inventory: Arc<dyn Inventory>,
        project_service: Arc<dyn ProjectService>,
        credentials: Arc<dyn CredentialSource>,
        cache: CacheService,
    ) -> Self {
        let zones = AvailabilityZoneResolver::new(inventory, cache.clone(), &config);
        let restricted = RestrictedZoneResolver::new(
            config.restrict_zones,
            project_service.clone(),
            credentials.clone(),
            cache.clone(),
            config.cache.restricted_zone_ttl(),
        );
        let projects = ProjectDirectory::new(
            project_service,
            credentials,
            cache.clone(),
            config.cache.project_ttl(),
        );
        Self {
            config: Arc::new(config),
            zones,
            restricted,
            projects,
            cache,
        }
    }
}
