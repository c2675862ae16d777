//! Faceted discovery search over the catalog.
//!
//! - expression: filter expression builder and value escaping
//! - facets: facet titles and contributor registry
//! - exclusion: "already in this showcase" clause
//! - params: request parameter classification
//! - discovery: the search flow and result shaping

mod discovery;
mod exclusion;
pub mod expression;
pub mod facets;
mod params;
mod types;

pub use discovery::{DiscoveryService, DiscoverySettings};
pub use exclusion::ExclusionFilterBuilder;
pub use expression::{ExclusionClause, FilterExpression, QueryExpressionBuilder, quote_value};
pub use facets::{ConfiguredFacets, FacetCatalog, FacetContributor, FacetRegistry, FacetTitles};
pub use params::{DiscoveryParams, SearchParams, SortDirection, SortField, SortSpec};
pub use types::{DiscoveryResult, FacetField, Page};
