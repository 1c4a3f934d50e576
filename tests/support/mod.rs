// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use adcp_a2a::A2aState;
use adcp_adapters::{AdapterRegistry, MockAdapter};
use adcp_skills::{Services, SkillRegistry};
use adcp_store::mem::test_support;
use adcp_store::MemStore;
use adcp_tasks::{TaskService, WebhookSender};
use std::sync::Arc;

/// A seeded in-memory deployment: two tenants, two principals in the
/// first tenant, one product.
pub struct TestAgent {
    pub store: Arc<MemStore>,
    pub services: Arc<Services>,
    pub registry: Arc<SkillRegistry>,
}

impl TestAgent {
    pub async fn new() -> Self {
        let store = Arc::new(MemStore::new());
        store.add_tenant(test_support::tenant("t_alpha", "alpha")).await;
        store.add_tenant(test_support::tenant("t_beta", "beta")).await;
        store
            .add_principal(test_support::principal("t_alpha", "alice", "tok_alice"))
            .await;
        store
            .add_principal(test_support::principal("t_alpha", "bob", "tok_bob"))
            .await;
        store
            .add_principal(test_support::principal("t_beta", "carol", "tok_carol"))
            .await;
        store
            .add_product(test_support::product("t_alpha", "prod_1"))
            .await;

        let mut adapters = AdapterRegistry::new();
        adapters.register("mock", MockAdapter::new());
        let tasks = Arc::new(TaskService::new(
            store.clone(),
            WebhookSender::with_container_host("localhost"),
        ));
        let services = Arc::new(Services {
            store: store.clone(),
            adapters: Arc::new(adapters),
            tasks,
            ranker: None,
        });

        Self {
            store,
            services,
            registry: Arc::new(SkillRegistry::standard()),
        }
    }

    pub fn a2a_state(&self) -> A2aState {
        A2aState {
            services: self.services.clone(),
            registry: self.registry.clone(),
            db: None,
            agent_version: "0.1.0-test".to_string(),
            default_url: "http://localhost:8091/a2a".to_string(),
        }
    }
}
