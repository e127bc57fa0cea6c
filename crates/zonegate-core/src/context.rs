//! Request contexts threaded through resolvers and filters.
//!
//! A [`RequestContext`] describes who is asking. Inventory lookups need
//! elevated privileges, so the caller derives a [`TrustedContext`] once
//! with [`RequestContext::elevated`] and passes it explicitly; resolvers
//! never escalate on their own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{DEFAULT_DOMAIN, ZoneName};

/// Identity of the requester.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RequestContext {
    #[serde(default)]
    pub user_id: String,
    pub project_id: String,
    #[serde(default)]
    pub project_domain: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
    /// Token used to obtain a credential for the project service.
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,
}

impl RequestContext {
    pub fn new(user_id: &str, project_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            project_id: project_id.to_string(),
            ..Self::default()
        }
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.project_domain = Some(domain.to_string());
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_string());
        self
    }

    /// Project domain, or `None` when the request did not carry one.
    pub fn domain(&self) -> Option<&str> {
        self.project_domain.as_deref().filter(|d| !d.is_empty())
    }

    /// Build the elevated context used for inventory lookups.
    pub fn elevated(&self) -> TrustedContext {
        TrustedContext {
            user_id: self.user_id.clone(),
            project_id: self.project_id.clone(),
        }
    }
}

/// Elevated copy of a request context. Only constructible via
/// [`RequestContext::elevated`] or [`TrustedContext::service`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedContext {
    user_id: String,
    project_id: String,
}

impl TrustedContext {
    /// Context for internal maintenance calls not tied to a request.
    pub fn service() -> Self {
        Self {
            user_id: String::new(),
            project_id: String::new(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

/// Flavor requirements of the requested instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FlavorRequest {
    #[serde(default)]
    pub root_gb: u64,
    #[serde(default)]
    pub ephemeral_gb: u64,
    #[serde(default)]
    pub memory_mb: u64,
    #[serde(default)]
    pub vcpus: u32,
}

impl FlavorRequest {
    /// Total disk needed in MB (root plus ephemeral).
    pub fn disk_mb(&self) -> u64 {
        self.root_gb.saturating_add(self.ephemeral_gb).saturating_mul(1024)
    }
}

/// Everything a filter may look at for one scheduling request.
#[derive(Debug, Clone)]
pub struct FilterContext {
    pub request: RequestContext,
    pub trusted: TrustedContext,
    /// Zone explicitly requested by the user.
    pub availability_zone: Option<ZoneName>,
    pub scheduler_hints: BTreeMap<String, String>,
    pub flavor: FlavorRequest,
    /// Index of the instance being placed within a multi-instance request.
    pub request_index: usize,
}

impl FilterContext {
    pub fn new(request: RequestContext) -> Self {
        let trusted = request.elevated();
        Self {
            request,
            trusted,
            availability_zone: None,
            scheduler_hints: BTreeMap::new(),
            flavor: FlavorRequest::default(),
            request_index: 0,
        }
    }

    pub fn with_zone(mut self, zone: &str) -> Self {
        self.availability_zone = Some(zone.to_string());
        self
    }

    pub fn with_hint(mut self, key: &str, value: &str) -> Self {
        self.scheduler_hints.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_flavor(mut self, flavor: FlavorRequest) -> Self {
        self.flavor = flavor;
        self
    }

    /// Explicitly requested zone, ignoring empty strings.
    pub fn requested_zone(&self) -> Option<&str> {
        self.availability_zone.as_deref().filter(|z| !z.is_empty())
    }

    pub fn hint(&self, key: &str) -> Option<&str> {
        self.scheduler_hints
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Requester domain with the default applied.
    pub fn domain_or_default(&self) -> &str {
        self.request.domain().unwrap_or(DEFAULT_DOMAIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevated_keeps_identity() {
        let ctx = RequestContext::new("alice", "p1");
        let trusted = ctx.elevated();
        assert_eq!(trusted.user_id(), "alice");
        assert_eq!(trusted.project_id(), "p1");
    }

    #[test]
    fn disk_mb_sums_root_and_ephemeral() {
        let flavor = FlavorRequest {
            root_gb: 10,
            ephemeral_gb: 20,
            ..FlavorRequest::default()
        };
        assert_eq!(flavor.disk_mb(), 30 * 1024);
    }

    #[test]
    fn disk_mb_saturates_on_oversized_flavor() {
        let flavor = FlavorRequest {
            root_gb: u64::MAX,
            ephemeral_gb: 1,
            ..FlavorRequest::default()
        };
        assert_eq!(flavor.disk_mb(), u64::MAX);
    }

    #[test]
    fn empty_zone_is_not_a_request() {
        let ctx = FilterContext::new(RequestContext::new("u", "p")).with_zone("");
        assert!(ctx.requested_zone().is_none());
    }

    #[test]
    fn domain_defaults_when_absent_or_empty() {
        let ctx = FilterContext::new(RequestContext::new("u", "p"));
        assert_eq!(ctx.domain_or_default(), "default");

        let ctx = FilterContext::new(RequestContext::new("u", "p").with_domain(""));
        assert_eq!(ctx.domain_or_default(), "default");

        let ctx = FilterContext::new(RequestContext::new("u", "p").with_domain("partner"));
        assert_eq!(ctx.domain_or_default(), "partner");
    }

    #[test]
    fn auth_token_is_not_serialized() {
        let ctx = RequestContext::new("u", "p").with_token("secret");
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(!json.contains("secret"));
    }
}
