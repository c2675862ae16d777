//! Record store backends for associations.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::PgPool;

use crate::models::ShowcaseAssociation;

/// Persistence contract for the association relation.
///
/// `insert` must be atomic per pair: of two concurrent inserts of the same
/// pair exactly one returns `Some`.
#[async_trait]
pub trait AssociationRecords: Send + Sync {
    /// Insert the pair; `None` if it already exists.
    async fn insert(&self, showcase_id: &str, dataset_id: &str)
    -> Result<Option<ShowcaseAssociation>>;

    /// Remove the pair; `false` if it did not exist.
    async fn remove(&self, showcase_id: &str, dataset_id: &str) -> Result<bool>;

    /// Dataset ids of a showcase, in creation order.
    async fn dataset_ids(&self, showcase_id: &str) -> Result<Vec<String>>;

    /// Showcase ids of a dataset, in creation order.
    async fn showcase_ids(&self, dataset_id: &str) -> Result<Vec<String>>;

    /// Remove every pair referencing `item_id`; returns the number removed.
    async fn remove_item(&self, item_id: &str) -> Result<u64>;
}

/// PostgreSQL record store.
#[derive(Clone)]
pub struct PgAssociationRecords {
    pool: PgPool,
}

impl PgAssociationRecords {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl std::fmt::Debug for PgAssociationRecords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgAssociationRecords").finish()
    }
}

#[async_trait]
impl AssociationRecords for PgAssociationRecords {
    async fn insert(
        &self,
        showcase_id: &str,
        dataset_id: &str,
    ) -> Result<Option<ShowcaseAssociation>> {
        ShowcaseAssociation::insert(&self.pool, showcase_id, dataset_id).await
    }

    async fn remove(&self, showcase_id: &str, dataset_id: &str) -> Result<bool> {
        ShowcaseAssociation::delete(&self.pool, showcase_id, dataset_id).await
    }

    async fn dataset_ids(&self, showcase_id: &str) -> Result<Vec<String>> {
        ShowcaseAssociation::dataset_ids_for_showcase(&self.pool, showcase_id).await
    }

    async fn showcase_ids(&self, dataset_id: &str) -> Result<Vec<String>> {
        ShowcaseAssociation::showcase_ids_for_dataset(&self.pool, dataset_id).await
    }

    async fn remove_item(&self, item_id: &str) -> Result<u64> {
        ShowcaseAssociation::delete_for_item(&self.pool, item_id).await
    }
}

/// In-memory record store.
///
/// A single mutex serializes all operations, which gives the same per-pair
/// atomicity as the primary key in Postgres. Vector order is creation order.
#[derive(Debug, Default)]
pub struct MemoryAssociationRecords {
    rows: Mutex<Vec<ShowcaseAssociation>>,
}

impl MemoryAssociationRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait]
impl AssociationRecords for MemoryAssociationRecords {
    async fn insert(
        &self,
        showcase_id: &str,
        dataset_id: &str,
    ) -> Result<Option<ShowcaseAssociation>> {
        let mut rows = self.rows.lock();
        if rows
            .iter()
            .any(|r| r.showcase_id == showcase_id && r.dataset_id == dataset_id)
        {
            return Ok(None);
        }

        let association = ShowcaseAssociation {
            showcase_id: showcase_id.to_string(),
            dataset_id: dataset_id.to_string(),
            created: chrono::Utc::now().timestamp(),
        };
        rows.push(association.clone());
        Ok(Some(association))
    }

    async fn remove(&self, showcase_id: &str, dataset_id: &str) -> Result<bool> {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|r| !(r.showcase_id == showcase_id && r.dataset_id == dataset_id));
        Ok(rows.len() < before)
    }

    async fn dataset_ids(&self, showcase_id: &str) -> Result<Vec<String>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| r.showcase_id == showcase_id)
            .map(|r| r.dataset_id.clone())
            .collect())
    }

    async fn showcase_ids(&self, dataset_id: &str) -> Result<Vec<String>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| r.dataset_id == dataset_id)
            .map(|r| r.showcase_id.clone())
            .collect())
    }

    async fn remove_item(&self, item_id: &str) -> Result<u64> {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|r| r.showcase_id != item_id && r.dataset_id != item_id);
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn insert_is_unique_per_pair() {
        let records = MemoryAssociationRecords::new();
        assert!(records.insert("s1", "d1").await.unwrap().is_some());
        assert!(records.insert("s1", "d1").await.unwrap().is_none());
        assert!(records.insert("s2", "d1").await.unwrap().is_some());
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn lists_keep_creation_order() {
        let records = MemoryAssociationRecords::new();
        for id in ["d3", "d1", "d2"] {
            records.insert("s1", id).await.unwrap();
        }
        records.insert("s2", "d1").await.unwrap();

        assert_eq!(records.dataset_ids("s1").await.unwrap(), vec!["d3", "d1", "d2"]);
        assert_eq!(records.showcase_ids("d1").await.unwrap(), vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn remove_item_cascades_both_sides() {
        let records = MemoryAssociationRecords::new();
        records.insert("s1", "d1").await.unwrap();
        records.insert("s1", "d2").await.unwrap();
        records.insert("s2", "d1").await.unwrap();

        assert_eq!(records.remove_item("d1").await.unwrap(), 2);
        assert_eq!(records.dataset_ids("s1").await.unwrap(), vec!["d2"]);

        assert_eq!(records.remove_item("s1").await.unwrap(), 1);
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn concurrent_inserts_of_same_pair_have_one_winner() {
        let records = Arc::new(MemoryAssociationRecords::new());
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let records = Arc::clone(&records);
            tasks.push(tokio::spawn(async move {
                records.insert("s1", "d1").await.unwrap().is_some()
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(records.len(), 1);
    }
}
