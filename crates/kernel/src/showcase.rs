//! Entry points exposed to the controller layer.
//!
//! Every call takes an explicit [`RequestContext`] and consults the
//! permission gate before touching associations. Permission denials are
//! returned immediately and never folded into bulk results.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::association::{AssociationRecords, AssociationStore, PgAssociationRecords};
use crate::batch::{BulkAssociationProcessor, BulkOperation, BulkOutcome, dataset_ids_from_form};
use crate::catalog::{Catalog, CatalogItem, SolrCatalog};
use crate::config::Config;
use crate::context::RequestContext;
use crate::db;
use crate::error::{ShowcaseError, ShowcaseResult};
use crate::models::ShowcaseAssociation;
use crate::permissions::{PermissionGate, RolePermissionGate, actions};
use crate::search::{
    ConfiguredFacets, DiscoveryResult, DiscoveryService, DiscoverySettings,
    ExclusionFilterBuilder, FacetCatalog, FacetRegistry, SearchParams,
};

/// Weight of the configuration-driven facet contributor.
const CONFIGURED_FACETS_WEIGHT: i32 = 100;

/// Showcase association and discovery service.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct ShowcaseService {
    inner: Arc<ShowcaseServiceInner>,
}

struct ShowcaseServiceInner {
    catalog: Arc<dyn Catalog>,
    permissions: Arc<dyn PermissionGate>,
    store: AssociationStore,
    bulk: BulkAssociationProcessor,
    discovery: DiscoveryService,
}

impl ShowcaseService {
    /// Wire the service from its collaborators.
    pub fn new(
        config: &Config,
        records: Arc<dyn AssociationRecords>,
        catalog: Arc<dyn Catalog>,
        permissions: Arc<dyn PermissionGate>,
        mut facet_registry: FacetRegistry,
    ) -> Self {
        if !config.extra_facet_titles.is_empty() {
            facet_registry.register(
                Arc::new(ConfiguredFacets::new(config.extra_facet_titles.clone())),
                CONFIGURED_FACETS_WEIGHT,
            );
        }

        let store = AssociationStore::new(records, catalog.clone(), config.showcase_type.clone());
        let facets = FacetCatalog::new(config.search_facets.clone(), Arc::new(facet_registry));
        let discovery = DiscoveryService::new(
            catalog.clone(),
            ExclusionFilterBuilder::new(store.clone()),
            facets,
            DiscoverySettings::from_config(config),
        );

        Self {
            inner: Arc::new(ShowcaseServiceInner {
                catalog,
                permissions,
                bulk: BulkAssociationProcessor::new(store.clone()),
                store,
                discovery,
            }),
        }
    }

    /// Production wiring: Postgres association table, Solr catalog, role gate.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config).await?;
        let catalog = SolrCatalog::new(&config.search_url, config.search_timeout)
            .context("failed to create search client")?;
        let permissions = RolePermissionGate::with_public_read(config.sysadmins.clone());

        info!(search_url = %config.search_url, "showcase service ready");

        Ok(Self::new(
            config,
            Arc::new(PgAssociationRecords::new(pool)),
            Arc::new(catalog),
            Arc::new(permissions),
            FacetRegistry::new(),
        ))
    }

    pub fn store(&self) -> &AssociationStore {
        &self.inner.store
    }

    pub fn discovery(&self) -> &DiscoveryService {
        &self.inner.discovery
    }

    async fn authorize(
        &self,
        ctx: &RequestContext,
        action: &str,
        target: Option<&str>,
    ) -> ShowcaseResult<()> {
        if self
            .inner
            .permissions
            .check(action, &ctx.actor, target)
            .await?
        {
            Ok(())
        } else {
            Err(ShowcaseError::not_authorized(action))
        }
    }

    /// Add one dataset to a showcase.
    pub async fn add_dataset(
        &self,
        ctx: &RequestContext,
        showcase_id: &str,
        dataset_id: &str,
    ) -> ShowcaseResult<ShowcaseAssociation> {
        self.authorize(ctx, actions::ASSOCIATION_CREATE, Some(showcase_id))
            .await?;
        self.inner.store.create(showcase_id, dataset_id).await
    }

    /// Remove one dataset from a showcase. Returns whether a pair was removed.
    pub async fn remove_dataset(
        &self,
        ctx: &RequestContext,
        showcase_id: &str,
        dataset_id: &str,
    ) -> ShowcaseResult<bool> {
        self.authorize(ctx, actions::ASSOCIATION_DELETE, Some(showcase_id))
            .await?;
        self.inner.store.delete(showcase_id, dataset_id).await
    }

    /// Apply `operation` to many datasets of one showcase.
    pub async fn bulk(
        &self,
        ctx: &RequestContext,
        operation: BulkOperation,
        showcase_id: &str,
        dataset_ids: &[String],
    ) -> ShowcaseResult<BulkOutcome> {
        let item_action = match operation {
            BulkOperation::Add => actions::ASSOCIATION_CREATE,
            BulkOperation::Remove => actions::ASSOCIATION_DELETE,
        };
        self.authorize(ctx, actions::SHOWCASE_UPDATE, Some(showcase_id))
            .await?;
        self.authorize(ctx, item_action, Some(showcase_id)).await?;

        let showcase = self.inner.store.resolve_showcase(showcase_id).await?;
        self.inner
            .bulk
            .process(operation, &showcase.id, dataset_ids)
            .await
    }

    pub async fn bulk_add(
        &self,
        ctx: &RequestContext,
        showcase_id: &str,
        dataset_ids: &[String],
    ) -> ShowcaseResult<BulkOutcome> {
        self.bulk(ctx, BulkOperation::Add, showcase_id, dataset_ids)
            .await
    }

    pub async fn bulk_remove(
        &self,
        ctx: &RequestContext,
        showcase_id: &str,
        dataset_ids: &[String],
    ) -> ShowcaseResult<BulkOutcome> {
        self.bulk(ctx, BulkOperation::Remove, showcase_id, dataset_ids)
            .await
    }

    /// Handle a management form post.
    ///
    /// `None` when the form carries no bulk action or no `dataset_<id>`
    /// targets.
    pub async fn bulk_from_form(
        &self,
        ctx: &RequestContext,
        showcase_id: &str,
        form: &SearchParams,
    ) -> ShowcaseResult<Option<BulkOutcome>> {
        let operation = [BulkOperation::Add, BulkOperation::Remove]
            .into_iter()
            .find(|op| form.get(op.form_action()).is_some());
        let Some(operation) = operation else {
            return Ok(None);
        };

        let dataset_ids = dataset_ids_from_form(form);
        if dataset_ids.is_empty() {
            debug!(showcase_id = %showcase_id, "bulk form without targets");
            return Ok(None);
        }

        self.bulk(ctx, operation, showcase_id, &dataset_ids)
            .await
            .map(Some)
    }

    /// Search datasets that could be added to a showcase.
    pub async fn discover(
        &self,
        ctx: &RequestContext,
        showcase_id: &str,
        params: &SearchParams,
    ) -> ShowcaseResult<DiscoveryResult> {
        self.authorize(ctx, actions::SHOWCASE_UPDATE, Some(showcase_id))
            .await?;
        let showcase = self.inner.store.resolve_showcase(showcase_id).await?;
        self.inner.discovery.search(&showcase.id, params).await
    }

    /// Dataset ids of a showcase, in association order.
    pub async fn dataset_ids_for_showcase(
        &self,
        ctx: &RequestContext,
        showcase_id: &str,
    ) -> ShowcaseResult<Vec<String>> {
        self.authorize(ctx, actions::SHOWCASE_READ, Some(showcase_id))
            .await?;
        let showcase = self.inner.store.resolve_showcase(showcase_id).await?;
        self.inner.store.list_by_showcase(&showcase.id).await
    }

    /// Datasets of a showcase. Ids no longer in the catalog are skipped.
    pub async fn datasets_for_showcase(
        &self,
        ctx: &RequestContext,
        showcase_id: &str,
    ) -> ShowcaseResult<Vec<CatalogItem>> {
        let ids = self.dataset_ids_for_showcase(ctx, showcase_id).await?;
        self.fetch_items(ctx, &ids).await
    }

    /// Showcase ids a dataset belongs to, in association order.
    pub async fn showcase_ids_for_dataset(
        &self,
        ctx: &RequestContext,
        dataset_id: &str,
    ) -> ShowcaseResult<Vec<String>> {
        self.authorize(ctx, actions::DATASET_READ, Some(dataset_id))
            .await?;
        let dataset = self.inner.store.resolve_dataset(dataset_id).await?;
        self.inner.store.list_by_dataset(&dataset.id).await
    }

    /// Showcases a dataset belongs to. Ids no longer in the catalog are skipped.
    pub async fn showcases_for_dataset(
        &self,
        ctx: &RequestContext,
        dataset_id: &str,
    ) -> ShowcaseResult<Vec<CatalogItem>> {
        let ids = self.showcase_ids_for_dataset(ctx, dataset_id).await?;
        self.fetch_items(ctx, &ids).await
    }

    /// Cascade hook called when the catalog deletes a showcase or dataset.
    pub async fn item_deleted(&self, item_id: &str) -> ShowcaseResult<u64> {
        self.inner.store.on_item_deleted(item_id).await
    }

    async fn fetch_items(
        &self,
        ctx: &RequestContext,
        ids: &[String],
    ) -> ShowcaseResult<Vec<CatalogItem>> {
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            match self.inner.catalog.fetch(id).await? {
                Some(item) => items.push(item),
                None => debug!(item_id = %id, for_view = ctx.for_view, "listed item missing from catalog"),
            }
        }
        Ok(items)
    }
}

impl std::fmt::Debug for ShowcaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShowcaseService")
            .field("store", &self.inner.store)
            .field("discovery", &self.inner.discovery)
            .finish()
    }
}
