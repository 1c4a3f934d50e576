// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed registry of named [`AdServerAdapter`] implementations.

use crate::AdServerAdapter;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps tenant `ad_server` names to adapter instances. Assembled once at
/// startup.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn AdServerAdapter>>,
}

impl AdapterRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under the given name, replacing any previous
    /// entry.
    pub fn register(&mut self, name: impl Into<String>, adapter: impl AdServerAdapter + 'static) {
        self.adapters.insert(name.into(), Arc::new(adapter));
    }

    /// Look up an adapter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn AdServerAdapter>> {
        self.adapters.get(name).cloned()
    }

    /// Resolve a tenant's adapter: its configured `ad_server`, or the mock
    /// when none is configured (incomplete onboarding still answers
    /// discovery).
    #[must_use]
    pub fn for_tenant(&self, ad_server: Option<&str>) -> Option<Arc<dyn AdServerAdapter>> {
        self.get(ad_server.unwrap_or("mock"))
    }

    /// Sorted adapter names.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockAdapter;

    #[test]
    fn register_and_lookup() {
        let mut registry = AdapterRegistry::new();
        registry.register("mock", MockAdapter::new());
        assert!(registry.get("mock").is_some());
        assert!(registry.get("google_ad_manager").is_none());
        assert_eq!(registry.names(), vec!["mock"]);
    }

    #[test]
    fn unset_ad_server_falls_back_to_mock() {
        let mut registry = AdapterRegistry::new();
        registry.register("mock", MockAdapter::new());
        assert!(registry.for_tenant(None).is_some());
        assert!(registry.for_tenant(Some("mock")).is_some());
        assert!(registry.for_tenant(Some("kevel")).is_none());
    }
}
