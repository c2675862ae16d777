//! Exclusion of already-associated datasets from discovery searches.

use super::expression::ExclusionClause;
use crate::association::AssociationStore;
use crate::error::ShowcaseResult;

/// Builds the "already in this showcase" clause from the association store.
#[derive(Debug, Clone)]
pub struct ExclusionFilterBuilder {
    store: AssociationStore,
}

impl ExclusionFilterBuilder {
    pub fn new(store: AssociationStore) -> Self {
        Self { store }
    }

    /// Clause excluding every dataset currently associated with the showcase.
    ///
    /// Read fresh on every call; `None` when the showcase has no datasets.
    pub async fn for_showcase(&self, showcase_id: &str) -> ShowcaseResult<Option<ExclusionClause>> {
        let ids = self.store.list_by_showcase(showcase_id).await?;
        Ok(ExclusionClause::ids(ids))
    }
}
