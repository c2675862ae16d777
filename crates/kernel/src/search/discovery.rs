//! Faceted dataset discovery for a showcase.
//!
//! Flow: classify and validate parameters, build the filter expression with
//! the exclusion clause for the showcase, resolve facets, run one catalog
//! search, shape the result. Parameter errors abort before any search call;
//! catalog failures produce a degraded result with `query_error` set.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tracing::{debug, error};

use super::exclusion::ExclusionFilterBuilder;
use super::expression::{ExclusionClause, FilterExpression, QueryExpressionBuilder, TYPE_FIELD};
use super::facets::{FacetCatalog, FacetTitles};
use super::params::{DiscoveryParams, SearchParams};
use super::types::{DiscoveryResult, FacetField, Page};
use crate::catalog::{Catalog, CatalogError, CatalogQuery, CatalogResponse};
use crate::config::Config;
use crate::error::ShowcaseResult;

/// Tunables for discovery searches.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub rows: u32,
    pub default_facet_limit: u32,
    pub dataset_type: String,
    pub showcase_type: String,
    pub show_all_types: bool,
    pub timeout: Duration,
}

impl DiscoverySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rows: config.datasets_per_page,
            default_facet_limit: config.facets_default_number,
            dataset_type: config.dataset_type.clone(),
            showcase_type: config.showcase_type.clone(),
            show_all_types: config.show_all_types,
            timeout: config.search_timeout,
        }
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Runs discovery searches that never return datasets already in the showcase.
#[derive(Clone)]
pub struct DiscoveryService {
    catalog: Arc<dyn Catalog>,
    exclusions: ExclusionFilterBuilder,
    facets: FacetCatalog,
    settings: DiscoverySettings,
}

impl DiscoveryService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        exclusions: ExclusionFilterBuilder,
        facets: FacetCatalog,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            catalog,
            exclusions,
            facets,
            settings,
        }
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Search candidate datasets for `showcase_id` (a canonical id).
    pub async fn search(
        &self,
        showcase_id: &str,
        params: &SearchParams,
    ) -> ShowcaseResult<DiscoveryResult> {
        let parsed = DiscoveryParams::parse(params)?;
        let exclusion = self.exclusions.for_showcase(showcase_id).await?;
        let expression = self.build_expression(&parsed, exclusion)?;

        let facet_titles = self.facets.resolve(&self.settings.dataset_type);
        let facet_limits = self.effective_limits(&facet_titles, &parsed.facet_limits);

        let query = CatalogQuery {
            q: expression.q.clone(),
            fq: expression.fq.clone(),
            facet_fields: facet_titles.keys().cloned().collect(),
            sort: parsed.sort.as_ref().map(ToString::to_string),
            start: parsed.offset(self.settings.rows),
            rows: self.settings.rows,
            extras: parsed.extras.clone(),
        };

        debug!(
            showcase_id = %showcase_id,
            q = %query.q,
            fq = %query.fq,
            start = query.start,
            "discovery search"
        );

        let (response, query_error) = match self.run(&query).await {
            Ok(response) => (response, false),
            Err(e) => {
                error!(showcase_id = %showcase_id, error = %e, "discovery search failed");
                (CatalogResponse::default(), true)
            }
        };

        let search_facets = if query_error {
            IndexMap::new()
        } else {
            shape_facets(&facet_titles, response.facets)
        };

        Ok(DiscoveryResult {
            showcase_id: showcase_id.to_string(),
            q: parsed.q,
            page: Page {
                items: response.items,
                page: parsed.page,
                items_per_page: self.settings.rows,
                item_count: response.count,
            },
            count: response.count,
            facet_titles,
            search_facets,
            facet_limits,
            fields: expression.fields,
            fields_grouped: expression.fields_grouped,
            sort_by_fields: parsed
                .sort
                .as_ref()
                .map(|sort| sort.field_names())
                .unwrap_or_default(),
            sort_by_selected: response.sort,
            query_error,
        })
    }

    fn build_expression(
        &self,
        parsed: &DiscoveryParams,
        exclusion: Option<ExclusionClause>,
    ) -> ShowcaseResult<FilterExpression> {
        QueryExpressionBuilder::new()
            .text(parsed.q.clone())
            .filters(parsed.filters.iter().cloned())
            .default_type(
                self.settings.dataset_type.clone(),
                self.settings.show_all_types,
            )
            .exclude(ExclusionClause::new(
                TYPE_FIELD,
                vec![self.settings.showcase_type.clone()],
            ))
            .exclude(exclusion)
            .build()
    }

    fn effective_limits(
        &self,
        facet_titles: &FacetTitles,
        overrides: &IndexMap<String, u32>,
    ) -> IndexMap<String, u32> {
        facet_titles
            .keys()
            .map(|field| {
                let limit = overrides
                    .get(field)
                    .copied()
                    .unwrap_or(self.settings.default_facet_limit);
                (field.clone(), limit)
            })
            .collect()
    }

    async fn run(&self, query: &CatalogQuery) -> Result<CatalogResponse, CatalogError> {
        tokio::time::timeout(self.settings.timeout, self.catalog.search(query))
            .await
            .map_err(|_| CatalogError::Timeout(self.settings.timeout))?
    }
}

impl std::fmt::Debug for DiscoveryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryService")
            .field("facets", &self.facets)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Pair each resolved facet with its counts, in display order.
fn shape_facets(
    titles: &FacetTitles,
    mut counts: IndexMap<String, Vec<crate::catalog::FacetCount>>,
) -> IndexMap<String, FacetField> {
    titles
        .iter()
        .map(|(field, title)| {
            let items = counts.shift_remove(field).unwrap_or_default();
            (
                field.clone(),
                FacetField {
                    title: title.clone(),
                    items,
                },
            )
        })
        .collect()
}
