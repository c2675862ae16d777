//! Discovery result shapes.

use indexmap::IndexMap;
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use crate::catalog::{CatalogItem, FacetCount};

/// One page of discovery results.
///
/// Serializes with the derived `page_count`, `first_item` and `last_item`
/// alongside the stored fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<CatalogItem>,
    /// 1-based page number.
    pub page: u32,
    pub items_per_page: u32,
    /// Total matches across all pages.
    pub item_count: u64,
}

impl Page {
    /// Number of pages; zero when nothing matched.
    pub fn page_count(&self) -> u64 {
        if self.items_per_page == 0 {
            return 0;
        }
        self.item_count.div_ceil(u64::from(self.items_per_page))
    }

    /// 1-based position of the first item on this page, 0 when empty.
    pub fn first_item(&self) -> u64 {
        if self.items.is_empty() {
            return 0;
        }
        u64::from(self.page.saturating_sub(1)) * u64::from(self.items_per_page) + 1
    }

    /// 1-based position of the last item on this page, 0 when empty.
    pub fn last_item(&self) -> u64 {
        if self.items.is_empty() {
            return 0;
        }
        self.first_item() + self.items.len() as u64 - 1
    }
}

impl Serialize for Page {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Page", 7)?;
        state.serialize_field("items", &self.items)?;
        state.serialize_field("page", &self.page)?;
        state.serialize_field("items_per_page", &self.items_per_page)?;
        state.serialize_field("item_count", &self.item_count)?;
        state.serialize_field("page_count", &self.page_count())?;
        state.serialize_field("first_item", &self.first_item())?;
        state.serialize_field("last_item", &self.last_item())?;
        state.end()
    }
}

/// Value counts for one facet field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FacetField {
    pub title: String,
    /// Values, highest count first.
    pub items: Vec<FacetCount>,
}

/// Shaped discovery response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiscoveryResult {
    /// Canonical id of the showcase the search ran for.
    pub showcase_id: String,
    pub q: String,
    pub page: Page,
    /// Total matches.
    pub count: u64,
    /// Resolved facet field -> title, in display order.
    pub facet_titles: IndexMap<String, String>,
    /// Facet field -> value counts, in display order.
    pub search_facets: IndexMap<String, FacetField>,
    /// Effective display limit per resolved facet.
    pub facet_limits: IndexMap<String, u32>,
    /// Active filters in request order.
    pub fields: Vec<(String, String)>,
    /// Active filters grouped by field.
    pub fields_grouped: IndexMap<String, Vec<String>>,
    /// Field names of the requested sort.
    pub sort_by_fields: Vec<String>,
    /// Sort the search service reported back.
    pub sort_by_selected: Option<String>,
    /// Set when the search service failed and the result is degraded.
    pub query_error: bool,
}

impl DiscoveryResult {
    /// Facet values to display for `field`, truncated to its effective limit.
    ///
    /// A limit of 0 shows every value.
    pub fn visible_facet_items(&self, field: &str) -> &[FacetCount] {
        let Some(facet) = self.search_facets.get(field) else {
            return &[];
        };
        match self.facet_limits.get(field) {
            Some(&limit) if limit > 0 => {
                let end = facet.items.len().min(limit as usize);
                &facet.items[..end]
            }
            _ => &facet.items,
        }
    }
}
