//! Host filter chain.
//!
//! Every host filter is a predicate. A host survives when all configured
//! filters pass it. Filters whose answer cannot vary across the hosts of a
//! request declare [`HostFilter::run_filter_once_per_request`]. When later
//! instances of a multi-instance request are placed from the survivors of
//! the first pass ([`HostFilterChain::filter_survivors`]), those filters are
//! not evaluated again.

pub mod project_tags;
pub mod restricted_zone;

use std::sync::Arc;

use tracing::debug;
use zonegate_core::{FilterContext, HostState};

use crate::error::{FilterResult, FilterScope};
use crate::registry::FilterRegistry;
use crate::services::FilterServices;

pub use project_tags::ProjectTagsFilter;
pub use restricted_zone::RestrictedZoneFilter;

pub trait HostFilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// The result depends on the request only, not on the host.
    fn run_filter_once_per_request(&self) -> bool {
        false
    }

    fn host_passes(&self, host: &HostState, ctx: &FilterContext) -> FilterResult<bool>;
}

/// Ordered host filters, resolved once and reused across requests.
#[derive(Clone, Default)]
pub struct HostFilterChain {
    filters: Vec<Arc<dyn HostFilter>>,
}

impl HostFilterChain {
    pub fn new(filters: Vec<Arc<dyn HostFilter>>) -> Self {
        Self { filters }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Hosts from `hosts` that pass every filter, in input order.
    ///
    /// Every filter runs, run-once filters included, whatever the value of
    /// `ctx.request_index`: nothing is known about `hosts` yet.
    pub fn filter_hosts<'a>(
        &self,
        hosts: &'a [HostState],
        ctx: &FilterContext,
    ) -> FilterResult<Vec<&'a HostState>> {
        self.run(hosts.iter().collect(), ctx, false)
    }

    /// Narrow the survivors of an earlier pass of the same request for the
    /// instance at `ctx.request_index`.
    ///
    /// `survivors` must come from [`filter_hosts`](Self::filter_hosts) (or
    /// an earlier call to this method) for the same request: when
    /// `ctx.request_index > 0` run-once filters are skipped and their
    /// earlier verdict is trusted.
    pub fn filter_survivors<'a>(
        &self,
        survivors: &[&'a HostState],
        ctx: &FilterContext,
    ) -> FilterResult<Vec<&'a HostState>> {
        self.run(survivors.to_vec(), ctx, ctx.request_index > 0)
    }

    fn run<'a>(
        &self,
        mut survivors: Vec<&'a HostState>,
        ctx: &FilterContext,
        skip_run_once: bool,
    ) -> FilterResult<Vec<&'a HostState>> {
        for filter in &self.filters {
            if survivors.is_empty() {
                break;
            }
            if skip_run_once && filter.run_filter_once_per_request() {
                debug!(
                    filter = filter.name(),
                    request_index = ctx.request_index,
                    "run-once filter already applied for this request"
                );
                continue;
            }
            let before = survivors.len();
            let mut kept = Vec::with_capacity(before);
            for host in survivors {
                if filter.host_passes(host, ctx)? {
                    kept.push(host);
                } else {
                    debug!(filter = filter.name(), host = %host.host, "host rejected");
                }
            }
            survivors = kept;
            debug!(
                filter = filter.name(),
                before,
                after = survivors.len(),
                "host filter applied"
            );
        }
        Ok(survivors)
    }
}

fn standard_host_filters(services: &FilterServices) -> Vec<Arc<dyn HostFilter>> {
    vec![
        Arc::new(RestrictedZoneFilter::from_services(services)),
        Arc::new(ProjectTagsFilter::from_services(services)),
    ]
}

/// Registry of the built-in host filters plus the `all_host_filters` group.
pub fn standard_host_registry() -> FilterRegistry<Arc<dyn HostFilter>> {
    FilterRegistry::new(FilterScope::Host)
        .with_filter("restricted_zone", |s| {
            Arc::new(RestrictedZoneFilter::from_services(s)) as Arc<dyn HostFilter>
        })
        .with_filter("project_tags", |s| {
            Arc::new(ProjectTagsFilter::from_services(s)) as Arc<dyn HostFilter>
        })
        .with_group("all_host_filters", standard_host_filters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use zonegate_core::RequestContext;

    struct Reject(&'static str);

    impl HostFilter for Reject {
        fn name(&self) -> &'static str {
            "reject"
        }

        fn host_passes(&self, host: &HostState, _ctx: &FilterContext) -> FilterResult<bool> {
            Ok(host.host != self.0)
        }
    }

    struct Once(Arc<AtomicUsize>);

    impl HostFilter for Once {
        fn name(&self) -> &'static str {
            "once"
        }

        fn run_filter_once_per_request(&self) -> bool {
            true
        }

        fn host_passes(&self, _host: &HostState, _ctx: &FilterContext) -> FilterResult<bool> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }
    }

    fn hosts(names: &[&str]) -> Vec<HostState> {
        names.iter().map(|n| HostState::new(n)).collect()
    }

    fn ctx() -> FilterContext {
        FilterContext::new(RequestContext::new("u", "p"))
    }

    #[test]
    fn all_filters_must_pass() {
        let chain = HostFilterChain::new(vec![Arc::new(Reject("h1")), Arc::new(Reject("h3"))]);
        let input = hosts(&["h1", "h2", "h3"]);
        let out = chain.filter_hosts(&input, &ctx()).unwrap();
        let names: Vec<&str> = out.iter().map(|h| h.host.as_str()).collect();
        assert_eq!(names, vec!["h2"]);
    }

    #[test]
    fn run_once_filters_are_skipped_for_later_survivors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = HostFilterChain::new(vec![
            Arc::new(Reject("h3")),
            Arc::new(Once(calls.clone())),
        ]);
        let input = hosts(&["h1", "h2", "h3"]);
        let survivors: Vec<&HostState> = input.iter().collect();

        let mut second = ctx();
        second.request_index = 1;
        let out = chain.filter_survivors(&survivors, &second).unwrap();
        let names: Vec<&str> = out.iter().map(|h| h.host.as_str()).collect();
        assert_eq!(names, vec!["h1", "h2"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unthreaded_hosts_always_get_run_once_filters() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = HostFilterChain::new(vec![Arc::new(Once(calls.clone()))]);
        let input = hosts(&["h1", "h2"]);

        assert!(chain.filter_hosts(&input, &ctx()).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let mut second = ctx();
        second.request_index = 1;
        assert!(chain.filter_hosts(&input, &second).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn first_instance_survivors_run_every_filter() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = HostFilterChain::new(vec![Arc::new(Once(calls.clone()))]);
        let input = hosts(&["h1"]);
        let survivors: Vec<&HostState> = input.iter().collect();

        assert!(chain.filter_survivors(&survivors, &ctx()).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn standard_registry_lists_builtin_filters() {
        let reg = standard_host_registry();
        assert_eq!(reg.standard_filters(), vec!["restricted_zone", "project_tags"]);
        assert_eq!(reg.groups(), vec!["all_host_filters"]);
    }
}
