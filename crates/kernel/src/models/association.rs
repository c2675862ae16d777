//! Showcase/dataset association records.
//!
//! One row per (showcase, dataset) pair. The primary key on the pair makes
//! concurrent inserts of the same pair race-safe: exactly one wins.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A dataset's membership in a showcase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShowcaseAssociation {
    /// Canonical showcase id.
    pub showcase_id: String,

    /// Canonical dataset id.
    #[sqlx(rename = "package_id")]
    pub dataset_id: String,

    /// Unix timestamp when created.
    pub created: i64,
}

impl ShowcaseAssociation {
    /// Insert the pair unless it already exists.
    ///
    /// Returns `None` when the pair was already present.
    pub async fn insert(
        pool: &PgPool,
        showcase_id: &str,
        dataset_id: &str,
    ) -> Result<Option<Self>> {
        let created = chrono::Utc::now().timestamp();

        let association = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO showcase_package_association (showcase_id, package_id, created)
            VALUES ($1, $2, $3)
            ON CONFLICT (showcase_id, package_id) DO NOTHING
            RETURNING showcase_id, package_id, created
            "#,
        )
        .bind(showcase_id)
        .bind(dataset_id)
        .bind(created)
        .fetch_optional(pool)
        .await
        .context("failed to insert showcase association")?;

        Ok(association)
    }

    /// Delete the pair. Returns whether a row was removed.
    pub async fn delete(pool: &PgPool, showcase_id: &str, dataset_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM showcase_package_association WHERE showcase_id = $1 AND package_id = $2",
        )
        .bind(showcase_id)
        .bind(dataset_id)
        .execute(pool)
        .await
        .context("failed to delete showcase association")?;

        Ok(result.rows_affected() > 0)
    }

    /// Dataset ids of a showcase, in creation order.
    pub async fn dataset_ids_for_showcase(pool: &PgPool, showcase_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT package_id FROM showcase_package_association WHERE showcase_id = $1 ORDER BY seq",
        )
        .bind(showcase_id)
        .fetch_all(pool)
        .await
        .context("failed to list showcase datasets")?;

        Ok(ids)
    }

    /// Showcase ids a dataset belongs to, in creation order.
    pub async fn showcase_ids_for_dataset(pool: &PgPool, dataset_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT showcase_id FROM showcase_package_association WHERE package_id = $1 ORDER BY seq",
        )
        .bind(dataset_id)
        .fetch_all(pool)
        .await
        .context("failed to list dataset showcases")?;

        Ok(ids)
    }

    /// Delete every association referencing `item_id` on either side.
    pub async fn delete_for_item(pool: &PgPool, item_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM showcase_package_association WHERE showcase_id = $1 OR package_id = $1",
        )
        .bind(item_id)
        .execute(pool)
        .await
        .context("failed to delete associations for item")?;

        Ok(result.rows_affected())
    }
}
