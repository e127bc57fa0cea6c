//! Host filtering on project tags.

use std::collections::BTreeSet;

use zonegate_core::{FilterContext, HostState};
use zonegate_zones::ProjectDirectory;

use super::HostFilter;
use crate::error::FilterResult;
use crate::services::FilterServices;

/// Aggregate metadata key listing the project tags a host accepts.
pub const PROJECT_TAGS_KEY: &str = "project_tags";

/// Project tags this filter acts on.
pub const ALLOWED_TAGS: &[&str] = &["preemptible"];

/// Confines projects carrying an allowed tag to hosts that advertise one of
/// the project's tags. Projects without such a tag may use any host.
pub struct ProjectTagsFilter {
    projects: ProjectDirectory,
    allowed_tags: BTreeSet<String>,
}

impl ProjectTagsFilter {
    pub fn new(projects: ProjectDirectory) -> Self {
        Self {
            projects,
            allowed_tags: ALLOWED_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn from_services(services: &FilterServices) -> Self {
        Self::new(services.projects.clone())
    }
}

impl HostFilter for ProjectTagsFilter {
    fn name(&self) -> &'static str {
        "project_tags"
    }

    fn run_filter_once_per_request(&self) -> bool {
        true
    }

    fn host_passes(&self, host: &HostState, ctx: &FilterContext) -> FilterResult<bool> {
        let project = self.projects.get_project(&ctx.request)?;
        let project_tags: BTreeSet<String> = project.tags.into_iter().collect();
        if project_tags.is_disjoint(&self.allowed_tags) {
            return Ok(true);
        }
        let host_tags = host.aggregate_values(PROJECT_TAGS_KEY);
        Ok(!project_tags.is_disjoint(&host_tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use zonegate_cache::CacheService;
    use zonegate_core::{Aggregate, ProjectRecord, RequestContext};
    use zonegate_zones::{RequestTokenCredentials, StaticProjects};

    fn filter(tags: &[&str]) -> ProjectTagsFilter {
        let projects = StaticProjects::new([ProjectRecord {
            id: "p".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..ProjectRecord::default()
        }]);
        ProjectTagsFilter::new(ProjectDirectory::new(
            Arc::new(projects),
            Arc::new(RequestTokenCredentials),
            CacheService::memory(16),
            Duration::from_secs(60),
        ))
    }

    fn tagged_host(name: &str, tags: &str) -> HostState {
        let mut host = HostState::new(name);
        host.aggregates.push(Aggregate {
            name: "tagged".to_string(),
            hosts: [name.to_string()].into(),
            metadata: [(PROJECT_TAGS_KEY.to_string(), tags.to_string())].into(),
        });
        host
    }

    fn ctx() -> FilterContext {
        FilterContext::new(RequestContext::new("u", "p").with_token("tok"))
    }

    #[test]
    fn untagged_project_uses_any_host() {
        let f = filter(&["gold"]);
        assert!(f.host_passes(&HostState::new("h1"), &ctx()).unwrap());
        assert!(f.host_passes(&tagged_host("h2", "preemptible"), &ctx()).unwrap());
    }

    #[test]
    fn tagged_project_needs_tagged_host() {
        let f = filter(&["preemptible"]);
        assert!(!f.host_passes(&HostState::new("h1"), &ctx()).unwrap());
        assert!(f.host_passes(&tagged_host("h2", "preemptible"), &ctx()).unwrap());
        assert!(!f.host_passes(&tagged_host("h3", "other"), &ctx()).unwrap());
    }

    #[test]
    fn missing_credential_is_an_error() {
        let f = filter(&["preemptible"]);
        let anonymous = FilterContext::new(RequestContext::new("u", "p"));
        assert!(f.host_passes(&HostState::new("h1"), &anonymous).is_err());
    }
}
