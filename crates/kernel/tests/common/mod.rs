#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Every [`TestApp`] wires the real kernel service against the in-memory
//! catalog and association records, so no database or search core is needed.

#![allow(dead_code)]

use std::sync::Arc;

use showcase_kernel::association::MemoryAssociationRecords;
use showcase_kernel::catalog::{CatalogItem, MemoryCatalog};
use showcase_kernel::permissions::RolePermissionGate;
use showcase_kernel::search::{FacetContributor, FacetRegistry};
use showcase_kernel::{Actor, Config, RequestContext, ShowcaseService};

/// Name of the configured sysadmin used by [`TestApp::admin`].
pub const ADMIN: &str = "admin";

/// Service plus direct handles on its in-memory collaborators.
pub struct TestApp {
    pub service: ShowcaseService,
    pub catalog: Arc<MemoryCatalog>,
    pub records: Arc<MemoryAssociationRecords>,
    pub gate: RolePermissionGate,
}

impl TestApp {
    /// App over the default catalog fixture.
    pub fn new() -> Self {
        Self::with_catalog(sample_catalog(), Config::default(), FacetRegistry::new())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_catalog(sample_catalog(), config, FacetRegistry::new())
    }

    pub fn with_contributors(contributors: Vec<(Arc<dyn FacetContributor>, i32)>) -> Self {
        let mut registry = FacetRegistry::new();
        for (contributor, weight) in contributors {
            registry.register(contributor, weight);
        }
        Self::with_catalog(sample_catalog(), Config::default(), registry)
    }

    pub fn with_catalog(catalog: MemoryCatalog, config: Config, registry: FacetRegistry) -> Self {
        let catalog = Arc::new(catalog);
        let records = Arc::new(MemoryAssociationRecords::new());
        let gate = RolePermissionGate::with_public_read([ADMIN]);
        let service = ShowcaseService::new(
            &config,
            records.clone(),
            catalog.clone(),
            Arc::new(gate.clone()),
            registry,
        );

        Self {
            service,
            catalog,
            records,
            gate,
        }
    }

    /// Context of the configured sysadmin.
    pub fn admin(&self) -> RequestContext {
        RequestContext::new(Actor::user(ADMIN, &[]))
    }

    pub fn anonymous(&self) -> RequestContext {
        RequestContext::for_view(Actor::anonymous())
    }

    /// Associate datasets directly, bypassing permission checks.
    pub async fn associate(&self, showcase_id: &str, dataset_ids: &[&str]) {
        for dataset_id in dataset_ids {
            self.service
                .store()
                .create(showcase_id, dataset_id)
                .await
                .unwrap();
        }
    }

    pub async fn dataset_ids(&self, showcase_id: &str) -> Vec<String> {
        self.service
            .store()
            .list_by_showcase(showcase_id)
            .await
            .unwrap()
    }
}

/// Two showcases and eight datasets with tags, organizations and formats.
pub fn sample_catalog() -> MemoryCatalog {
    MemoryCatalog::with_items([
        CatalogItem::new("s1", "city-dashboards", "showcase").with_title("City dashboards"),
        CatalogItem::new("s2", "river-watch", "showcase").with_title("River watch"),
        dataset("d1", "air-quality", "Air quality", "env-agency", &["air", "health"], "CSV"),
        dataset("d2", "water-levels", "Water levels", "env-agency", &["water"], "JSON"),
        dataset("d3", "pollen-counts", "Pollen counts", "health-dept", &["air", "health"], "CSV"),
        dataset("d4", "bus-stops", "Bus stops", "transport", &["transit"], "GeoJSON"),
        dataset("d5", "river-flow", "River flow", "env-agency", &["water", "rivers"], "CSV"),
        dataset("d6", "noise-map", "Noise map", "transport", &["noise", "health"], "WMS"),
        dataset("d7", "tree-census", "Tree census", "parks", &["trees"], "CSV"),
        dataset("d8", "air-sensors", "Air sensors", "env-agency", &["air"], "JSON"),
        CatalogItem::new("h1", "help-page", "harvest").with_title("Harvest source"),
    ])
}

pub fn dataset(
    id: &str,
    name: &str,
    title: &str,
    organization: &str,
    tags: &[&str],
    format: &str,
) -> CatalogItem {
    tags.iter().fold(
        CatalogItem::new(id, name, "dataset")
            .with_title(title)
            .with_field("organization", organization)
            .with_field("res_format", format)
            .with_field("license_id", "cc-by"),
        |item, tag| item.with_field("tags", *tag),
    )
}

pub fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
