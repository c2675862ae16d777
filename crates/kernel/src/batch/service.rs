//! Bulk add/remove of datasets on a showcase.

use tracing::{info, warn};

use super::types::{BulkOperation, BulkOutcome, ItemFailure};
use crate::association::AssociationStore;
use crate::error::ShowcaseResult;
use crate::search::SearchParams;

/// Form parameters carrying target dataset ids (`dataset_<id>`).
const DATASET_PARAM_PREFIX: &str = "dataset_";

/// Target dataset ids from a bulk form post, in request order, deduplicated.
pub fn dataset_ids_from_form(params: &SearchParams) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for (key, _) in params.iter() {
        if let Some(id) = key.strip_prefix(DATASET_PARAM_PREFIX)
            && !id.is_empty()
            && !ids.iter().any(|existing| existing == id)
        {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Applies one operation to many datasets with per-item failure isolation.
///
/// Items are processed sequentially. There is no rollback: associations
/// created before a failing item stay in place.
#[derive(Debug, Clone)]
pub struct BulkAssociationProcessor {
    store: AssociationStore,
}

impl BulkAssociationProcessor {
    pub fn new(store: AssociationStore) -> Self {
        Self { store }
    }

    /// Run `operation` for every id against `showcase_id` (canonical id).
    pub async fn process(
        &self,
        operation: BulkOperation,
        showcase_id: &str,
        dataset_ids: &[String],
    ) -> ShowcaseResult<BulkOutcome> {
        match operation {
            BulkOperation::Add => self.add(showcase_id, dataset_ids).await,
            BulkOperation::Remove => self.remove(showcase_id, dataset_ids).await,
        }
    }

    /// Associate every dataset, recording not-found and duplicate items as
    /// failures. Any other error aborts the batch.
    pub async fn add(&self, showcase_id: &str, dataset_ids: &[String]) -> ShowcaseResult<BulkOutcome> {
        let mut outcome = BulkOutcome::new(BulkOperation::Add, showcase_id, dataset_ids.len());

        for dataset_id in dataset_ids {
            match self.store.create(showcase_id, dataset_id).await {
                Ok(_) => outcome.succeeded.push(dataset_id.clone()),
                Err(e) if e.is_item_failure() => {
                    warn!(
                        showcase_id = %showcase_id,
                        dataset_id = %dataset_id,
                        error = %e,
                        "bulk add item failed"
                    );
                    outcome.failed.push(ItemFailure {
                        dataset_id: dataset_id.clone(),
                        reason: e.reason(),
                        detail: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            showcase_id = %showcase_id,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk add complete"
        );

        Ok(outcome)
    }

    /// Remove every association. Missing pairs count as success.
    pub async fn remove(
        &self,
        showcase_id: &str,
        dataset_ids: &[String],
    ) -> ShowcaseResult<BulkOutcome> {
        let mut outcome = BulkOutcome::new(BulkOperation::Remove, showcase_id, dataset_ids.len());

        for dataset_id in dataset_ids {
            if self.store.delete(showcase_id, dataset_id).await? {
                outcome.removed += 1;
            }
            outcome.succeeded.push(dataset_id.clone());
        }

        info!(
            showcase_id = %showcase_id,
            requested = dataset_ids.len(),
            removed = outcome.removed,
            "bulk remove complete"
        );

        Ok(outcome)
    }
}
