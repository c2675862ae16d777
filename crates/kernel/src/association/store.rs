//! Association store: the showcase/dataset relation.

use std::sync::Arc;

use tracing::{debug, info};

use super::records::AssociationRecords;
use crate::catalog::{Catalog, CatalogItem};
use crate::error::{ItemKind, ShowcaseError, ShowcaseResult};
use crate::models::ShowcaseAssociation;

/// Owns create/delete/list of associations.
///
/// Ids passed to `create` may be catalog ids or names; they are resolved to
/// canonical ids and type-checked against the catalog before anything is
/// written. Listing and deletion work on canonical ids.
#[derive(Clone)]
pub struct AssociationStore {
    records: Arc<dyn AssociationRecords>,
    catalog: Arc<dyn Catalog>,
    showcase_type: String,
}

impl AssociationStore {
    pub fn new(
        records: Arc<dyn AssociationRecords>,
        catalog: Arc<dyn Catalog>,
        showcase_type: impl Into<String>,
    ) -> Self {
        Self {
            records,
            catalog,
            showcase_type: showcase_type.into(),
        }
    }

    /// Catalog type of showcases.
    pub fn showcase_type(&self) -> &str {
        &self.showcase_type
    }

    /// Resolve a showcase by id or name. Items of another type are not found.
    pub async fn resolve_showcase(&self, id_or_name: &str) -> ShowcaseResult<CatalogItem> {
        match self.catalog.fetch(id_or_name).await? {
            Some(item) if item.item_type == self.showcase_type => Ok(item),
            _ => Err(ShowcaseError::not_found(ItemKind::Showcase, id_or_name)),
        }
    }

    /// Resolve a dataset by id or name. Showcases are never datasets.
    pub async fn resolve_dataset(&self, id_or_name: &str) -> ShowcaseResult<CatalogItem> {
        match self.catalog.fetch(id_or_name).await? {
            Some(item) if item.item_type != self.showcase_type => Ok(item),
            _ => Err(ShowcaseError::not_found(ItemKind::Dataset, id_or_name)),
        }
    }

    /// Associate a dataset with a showcase.
    pub async fn create(
        &self,
        showcase_id: &str,
        dataset_id: &str,
    ) -> ShowcaseResult<ShowcaseAssociation> {
        let showcase = self.resolve_showcase(showcase_id).await?;
        let dataset = self.resolve_dataset(dataset_id).await?;

        match self.records.insert(&showcase.id, &dataset.id).await? {
            Some(association) => {
                info!(
                    showcase_id = %showcase.id,
                    dataset_id = %dataset.id,
                    "dataset added to showcase"
                );
                Ok(association)
            }
            None => Err(ShowcaseError::DuplicateAssociation {
                showcase_id: showcase.id,
                dataset_id: dataset.id,
            }),
        }
    }

    /// Remove an association. Removing a missing pair succeeds.
    ///
    /// Ids or names are resolved like in `create`. An id the catalog no longer
    /// knows is used as given, so pairs left behind by deleted items can
    /// still be removed. Returns whether a pair was actually removed.
    pub async fn delete(&self, showcase_id: &str, dataset_id: &str) -> ShowcaseResult<bool> {
        let showcase_id = self.canonical_id(ItemKind::Showcase, showcase_id).await?;
        let dataset_id = self.canonical_id(ItemKind::Dataset, dataset_id).await?;
        let (showcase_id, dataset_id) = (showcase_id.as_str(), dataset_id.as_str());

        let removed = self.records.remove(showcase_id, dataset_id).await?;
        if removed {
            info!(showcase_id = %showcase_id, dataset_id = %dataset_id, "dataset removed from showcase");
        } else {
            debug!(showcase_id = %showcase_id, dataset_id = %dataset_id, "no association to remove");
        }
        Ok(removed)
    }

    /// Canonical id for `id_or_name`, or the input when it does not resolve.
    async fn canonical_id(&self, kind: ItemKind, id_or_name: &str) -> ShowcaseResult<String> {
        let resolved = match kind {
            ItemKind::Showcase => self.resolve_showcase(id_or_name).await,
            ItemKind::Dataset => self.resolve_dataset(id_or_name).await,
        };
        match resolved {
            Ok(item) => Ok(item.id),
            Err(ShowcaseError::NotFound { .. }) => Ok(id_or_name.to_string()),
            Err(e) => Err(e),
        }
    }

    /// Dataset ids of a showcase, in creation order.
    pub async fn list_by_showcase(&self, showcase_id: &str) -> ShowcaseResult<Vec<String>> {
        Ok(self.records.dataset_ids(showcase_id).await?)
    }

    /// Showcase ids a dataset belongs to, in creation order.
    pub async fn list_by_dataset(&self, dataset_id: &str) -> ShowcaseResult<Vec<String>> {
        Ok(self.records.showcase_ids(dataset_id).await?)
    }

    /// Cascade hook for a deleted catalog item (showcase or dataset).
    pub async fn on_item_deleted(&self, item_id: &str) -> ShowcaseResult<u64> {
        let removed = self.records.remove_item(item_id).await?;
        info!(item_id = %item_id, removed, "associations removed for deleted item");
        Ok(removed)
    }
}

impl std::fmt::Debug for AssociationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssociationStore")
            .field("showcase_type", &self.showcase_type)
            .finish()
    }
}
