//! Filter registry: maps stable names to filter constructors.
//!
//! Each entry is either a single filter or a named group that expands to
//! several filters. Registries are populated explicitly; nothing registers
//! itself. Names are resolved once when the chains are built, so an unknown
//! name fails at startup rather than on the first request.

use tracing::debug;

use crate::error::{FilterError, FilterResult, FilterScope};
use crate::services::FilterServices;

/// Builds one filter.
pub type Constructor<F> = fn(&FilterServices) -> F;

/// Builds a group of filters in order.
pub type GroupConstructor<F> = fn(&FilterServices) -> Vec<F>;

pub enum RegistryEntry<F> {
    Single(Constructor<F>),
    Group(GroupConstructor<F>),
}

impl<F> Clone for RegistryEntry<F> {
    fn clone(&self) -> Self {
        match self {
            RegistryEntry::Single(c) => RegistryEntry::Single(*c),
            RegistryEntry::Group(g) => RegistryEntry::Group(*g),
        }
    }
}

/// Ordered table of filter constructors for one chain.
pub struct FilterRegistry<F> {
    scope: FilterScope,
    entries: Vec<(&'static str, RegistryEntry<F>)>,
}

impl<F> FilterRegistry<F> {
    pub fn new(scope: FilterScope) -> Self {
        Self {
            scope,
            entries: Vec::new(),
        }
    }

    pub fn scope(&self) -> FilterScope {
        self.scope
    }

    /// Register a single filter. Re-registering a name replaces it.
    pub fn with_filter(self, name: &'static str, constructor: Constructor<F>) -> Self {
        self.with_entry(name, RegistryEntry::Single(constructor))
    }

    /// Register a filter group.
    pub fn with_group(self, name: &'static str, constructor: GroupConstructor<F>) -> Self {
        self.with_entry(name, RegistryEntry::Group(constructor))
    }

    fn with_entry(mut self, name: &'static str, entry: RegistryEntry<F>) -> Self {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((name, entry)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry<F>> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, entry)| entry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names of every single (non-group) filter, in registration order.
    pub fn standard_filters(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|(_, entry)| matches!(entry, RegistryEntry::Single(_)))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Names of every group.
    pub fn groups(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|(_, entry)| matches!(entry, RegistryEntry::Group(_)))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Build the filters named in `names`, in order, expanding groups.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S], services: &FilterServices) -> FilterResult<Vec<F>> {
        let mut filters = Vec::new();
        for name in names {
            let name = name.as_ref();
            match self.get(name) {
                Some(RegistryEntry::Single(constructor)) => filters.push(constructor(services)),
                Some(RegistryEntry::Group(constructor)) => filters.extend(constructor(services)),
                None => {
                    return Err(FilterError::ClassNotFound {
                        name: name.to_string(),
                        reason: format!("not a valid {} scheduler filter", self.scope),
                    });
                }
            }
            debug!(scope = %self.scope, filter = name, "resolved filter");
        }
        Ok(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use zonegate_cache::CacheService;
    use zonegate_core::ZonegateConfig;
    use zonegate_zones::{RequestTokenCredentials, StaticInventory, StaticProjects};

    fn services() -> FilterServices {
        FilterServices::new(
            ZonegateConfig::default(),
            Arc::new(StaticInventory::default()),
            Arc::new(StaticProjects::default()),
            Arc::new(RequestTokenCredentials),
            CacheService::memory(16),
        )
    }

    fn registry() -> FilterRegistry<&'static str> {
        FilterRegistry::new(FilterScope::Cell)
            .with_filter("one", |_| "one")
            .with_filter("two", |_| "two")
            .with_group("both", |_| vec!["one", "two"])
    }

    #[test]
    fn resolves_in_configured_order() {
        let filters = registry().resolve(&["two", "one"], &services()).unwrap();
        assert_eq!(filters, vec!["two", "one"]);
    }

    #[test]
    fn groups_expand_in_place() {
        let filters = registry().resolve(&["two", "both"], &services()).unwrap();
        assert_eq!(filters, vec!["two", "one", "two"]);
    }

    #[test]
    fn unknown_name_is_class_not_found() {
        let err = registry().resolve(&["one", "bogus"], &services()).unwrap_err();
        match err {
            FilterError::ClassNotFound { name, reason } => {
                assert_eq!(name, "bogus");
                assert!(reason.contains("cell"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn standard_filters_lists_singles_only() {
        let reg = registry();
        assert_eq!(reg.standard_filters(), vec!["one", "two"]);
        assert_eq!(reg.groups(), vec!["both"]);
    }

    #[test]
    fn reregistering_replaces_entry() {
        let reg = registry().with_filter("one", |_| "uno");
        assert_eq!(reg.resolve(&["one"], &services()).unwrap(), vec!["uno"]);
        assert_eq!(reg.standard_filters().len(), 2);
    }

    #[test]
    fn empty_list_resolves_to_nothing() {
        let names: [&str; 0] = [];
        assert!(registry().resolve(&names, &services()).unwrap().is_empty());
    }
}
