//! Facet titles and the facet contributor registry.
//!
//! Contributors are invoked in weight order (lower = earlier); equal weights
//! keep registration order. Each contributor receives the accumulated mapping
//! and returns the updated one, so the last contributor wins on conflicting
//! fields.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

/// Ordered facet field -> display title.
pub type FacetTitles = IndexMap<String, String>;

/// Built-in titles for well-known facet fields.
const DEFAULT_FACET_TITLES: &[(&str, &str)] = &[
    ("organization", "Organizations"),
    ("groups", "Groups"),
    ("tags", "Tags"),
    ("res_format", "Formats"),
    ("license_id", "Licenses"),
];

/// Built-in title for a facet field, if it has one.
pub fn default_facet_title(field: &str) -> Option<&'static str> {
    DEFAULT_FACET_TITLES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, title)| *title)
}

/// Extension point that can add, rename, remove, or reorder facets.
pub trait FacetContributor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Return the updated facet mapping for `item_type` searches.
    fn contribute_facets(&self, facets: FacetTitles, item_type: &str) -> FacetTitles;
}

/// A registered contributor with its priority.
#[derive(Clone)]
pub struct FacetHandler {
    pub contributor: Arc<dyn FacetContributor>,
    /// Weight for ordering (lower = called first).
    pub weight: i32,
}

impl std::fmt::Debug for FacetHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacetHandler")
            .field("contributor", &self.contributor.name())
            .field("weight", &self.weight)
            .finish()
    }
}

/// Ordered list of facet contributors.
#[derive(Debug, Clone, Default)]
pub struct FacetRegistry {
    handlers: Vec<FacetHandler>,
}

impl FacetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contributor.
    ///
    /// Weight takes precedence over registration order: a contributor
    /// registered later with a lower weight runs first. The sort is stable,
    /// so contributors with equal weight run in registration order. Register
    /// everything at one weight to get plain registration order.
    pub fn register(&mut self, contributor: Arc<dyn FacetContributor>, weight: i32) {
        self.handlers.push(FacetHandler {
            contributor,
            weight,
        });
        self.handlers.sort_by_key(|h| h.weight);
    }

    /// Handlers in invocation order.
    pub fn handlers(&self) -> &[FacetHandler] {
        &self.handlers
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Resolves the facet fields and titles to request and display.
#[derive(Debug, Clone)]
pub struct FacetCatalog {
    fields: Vec<String>,
    registry: Arc<FacetRegistry>,
}

impl FacetCatalog {
    /// `fields` is the configured facet list, in display order.
    pub fn new(fields: Vec<String>, registry: Arc<FacetRegistry>) -> Self {
        Self { fields, registry }
    }

    /// Built-in mapping before any contributor runs.
    pub fn builtin(&self) -> FacetTitles {
        self.fields
            .iter()
            .map(|field| {
                let title = default_facet_title(field).unwrap_or(field.as_str());
                (field.clone(), title.to_string())
            })
            .collect()
    }

    /// Final mapping for searches of `item_type`.
    pub fn resolve(&self, item_type: &str) -> FacetTitles {
        let mut facets = self.builtin();
        for handler in self.registry.handlers() {
            facets = handler.contributor.contribute_facets(facets, item_type);
            debug!(
                contributor = %handler.contributor.name(),
                facets = facets.len(),
                "facets contributed"
            );
        }
        facets
    }
}

/// Contributor that adds or renames facets from configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredFacets {
    titles: Vec<(String, String)>,
}

impl ConfiguredFacets {
    pub fn new(titles: Vec<(String, String)>) -> Self {
        Self { titles }
    }
}

impl FacetContributor for ConfiguredFacets {
    fn name(&self) -> &str {
        "configured"
    }

    fn contribute_facets(&self, mut facets: FacetTitles, _item_type: &str) -> FacetTitles {
        for (field, title) in &self.titles {
            // Existing fields keep their position and get the new title
            facets.insert(field.clone(), title.clone());
        }
        facets
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    struct Prepend(&'static str, &'static str);

    impl FacetContributor for Prepend {
        fn name(&self) -> &str {
            "prepend"
        }

        fn contribute_facets(&self, facets: FacetTitles, _item_type: &str) -> FacetTitles {
            let mut out = FacetTitles::new();
            out.insert(self.0.to_string(), self.1.to_string());
            out.extend(facets);
            out
        }
    }

    struct DropField(&'static str);

    impl FacetContributor for DropField {
        fn name(&self) -> &str {
            "drop"
        }

        fn contribute_facets(&self, mut facets: FacetTitles, _item_type: &str) -> FacetTitles {
            facets.shift_remove(self.0);
            facets
        }
    }

    fn fields(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn builtin_titles_and_fallback() {
        let catalog = FacetCatalog::new(
            fields(&["organization", "tags", "frequency"]),
            Arc::new(FacetRegistry::new()),
        );
        let facets = catalog.resolve("dataset");
        let pairs: Vec<_> = facets.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("organization", "Organizations"),
                ("tags", "Tags"),
                ("frequency", "frequency"),
            ]
        );
    }

    #[test]
    fn contributors_run_in_weight_then_registration_order() {
        let mut registry = FacetRegistry::new();
        registry.register(Arc::new(Prepend("b", "B")), 10);
        registry.register(Arc::new(Prepend("a", "A")), 0);
        registry.register(Arc::new(Prepend("c", "C")), 10);

        let names: Vec<_> = registry
            .handlers()
            .iter()
            .map(|h| (h.weight, h.contributor.name().to_string()))
            .collect();
        assert_eq!(names.len(), 3);
        assert_eq!(names[0].0, 0);

        let catalog = FacetCatalog::new(fields(&["tags"]), Arc::new(registry));
        let keys: Vec<_> = catalog.resolve("dataset").keys().cloned().collect();
        // a runs first, then b, then c; each prepends
        assert_eq!(keys, vec!["c", "b", "a", "tags"]);
    }

    #[test]
    fn equal_weights_keep_registration_order() {
        let mut registry = FacetRegistry::new();
        registry.register(Arc::new(Prepend("x", "X")), 0);
        registry.register(Arc::new(Prepend("y", "Y")), 0);
        registry.register(Arc::new(Prepend("z", "Z")), 0);

        let catalog = FacetCatalog::new(fields(&["tags"]), Arc::new(registry));
        let keys: Vec<_> = catalog.resolve("dataset").keys().cloned().collect();
        assert_eq!(keys, vec!["z", "y", "x", "tags"]);
    }

    #[test]
    fn last_contributor_wins_on_conflicts() {
        let mut registry = FacetRegistry::new();
        registry.register(
            Arc::new(ConfiguredFacets::new(vec![("tags".into(), "Keywords".into())])),
            0,
        );
        registry.register(
            Arc::new(ConfiguredFacets::new(vec![("tags".into(), "Topics".into())])),
            0,
        );

        let catalog = FacetCatalog::new(fields(&["organization", "tags"]), Arc::new(registry));
        let facets = catalog.resolve("dataset");
        assert_eq!(facets["tags"], "Topics");
        // Renaming keeps the position
        assert_eq!(facets.get_index(1).unwrap().0, "tags");
    }

    #[test]
    fn contributors_can_remove_fields() {
        let mut registry = FacetRegistry::new();
        registry.register(Arc::new(DropField("groups")), 0);
        let catalog = FacetCatalog::new(fields(&["groups", "tags"]), Arc::new(registry));
        assert_eq!(catalog.resolve("dataset").len(), 1);
    }

    #[test]
    fn resolution_is_deterministic() {
        let mut registry = FacetRegistry::new();
        registry.register(
            Arc::new(ConfiguredFacets::new(vec![
                ("frequency".into(), "Update frequency".into()),
                ("license_id".into(), "Usage rights".into()),
            ])),
            5,
        );
        registry.register(Arc::new(Prepend("featured", "Featured")), 1);

        let catalog = FacetCatalog::new(
            fields(&["organization", "groups", "tags", "res_format", "license_id"]),
            Arc::new(registry),
        );
        let first = catalog.resolve("dataset");
        let second = catalog.resolve("dataset");
        assert_eq!(
            first.iter().collect::<Vec<_>>(),
            second.iter().collect::<Vec<_>>()
        );
    }
}
