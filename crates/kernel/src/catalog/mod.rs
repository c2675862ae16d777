//! External catalog: search-and-fetch over datasets and showcases.
//!
//! The kernel never owns catalog records. It reads them through the
//! [`Catalog`] trait, which has two implementations:
//! - [`SolrCatalog`]: the Solr select API of the catalog's search core
//! - [`MemoryCatalog`]: an in-process catalog for tests and local runs

mod memory;
mod solr;

use std::collections::BTreeMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryCatalog;
pub use solr::SolrCatalog;

/// Search backend failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("search backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed search response: {0}")]
    MalformedResponse(String),

    #[error("malformed query: {0}")]
    MalformedQuery(String),

    #[error("search backend unavailable")]
    Unavailable,

    #[error("search timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// A catalog record as seen by the kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Canonical id.
    pub id: String,
    /// URL name (unique, usable in place of the id).
    pub name: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Catalog type (e.g. "dataset", "showcase").
    #[serde(rename = "dataset_type")]
    pub item_type: String,
    /// Facetable/searchable fields; each field carries one or more values.
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<String>>,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            title: String::new(),
            item_type: item_type.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Add a value to a field.
    pub fn with_field(mut self, field: &str, value: impl Into<String>) -> Self {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(value.into());
        self
    }

    /// Values of a field; the core attributes are addressable by name too.
    pub fn field_values(&self, field: &str) -> Vec<&str> {
        match field {
            "id" => vec![self.id.as_str()],
            "name" => vec![self.name.as_str()],
            "title" => vec![self.title.as_str()],
            "dataset_type" => vec![self.item_type.as_str()],
            _ => self
                .fields
                .get(field)
                .map(|values| values.iter().map(String::as_str).collect())
                .unwrap_or_default(),
        }
    }
}

/// One catalog search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogQuery {
    /// Free-text term; empty means "match everything".
    pub q: String,
    /// Filter expression built by `QueryExpressionBuilder`.
    pub fq: String,
    /// Fields to count facet values for, in display order.
    pub facet_fields: Vec<String>,
    /// Sort specification as passed to the backend (`field dir, ...`).
    pub sort: Option<String>,
    /// Zero-based offset of the first result.
    pub start: u64,
    /// Page size.
    pub rows: u32,
    /// Backend-specific pass-through parameters (`ext_*`).
    pub extras: IndexMap<String, String>,
}

/// A single facet value with its count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub name: String,
    pub count: u64,
}

/// Response of a catalog search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogResponse {
    /// Matching items for the requested page.
    pub items: Vec<CatalogItem>,
    /// Total number of matches.
    pub count: u64,
    /// Facet values per requested field, highest count first.
    pub facets: IndexMap<String, Vec<FacetCount>>,
    /// Sort the backend actually applied.
    pub sort: Option<String>,
}

/// Search-and-fetch contract of the catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Run a filtered, faceted, paginated search.
    async fn search(&self, query: &CatalogQuery) -> Result<CatalogResponse, CatalogError>;

    /// Fetch one item by id or name.
    async fn fetch(&self, id_or_name: &str) -> Result<Option<CatalogItem>, CatalogError>;
}
