//! Solr-backed catalog.
//!
//! Speaks the plain `select` handler of the catalog's search core and maps
//! documents to [`CatalogItem`]s.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{Catalog, CatalogError, CatalogItem, CatalogQuery, CatalogResponse, FacetCount};
use crate::search::expression::quote_value;

/// Document attributes mapped to dedicated `CatalogItem` members.
const CORE_FIELDS: &[&str] = &["id", "name", "title", "dataset_type"];

/// Catalog client for a Solr core.
#[derive(Clone)]
pub struct SolrCatalog {
    client: reqwest::Client,
    select_url: Url,
}

impl SolrCatalog {
    /// Create a client for the core at `core_url` (e.g. `http://solr:8983/solr/ckan`).
    pub fn new(core_url: &str, timeout: Duration) -> Result<Self> {
        let mut select_url = Url::parse(core_url).context("SEARCH_URL must be a valid URL")?;
        select_url
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("SEARCH_URL cannot be used as a base URL"))?
            .pop_if_empty()
            .push("select");

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build search HTTP client")?;

        Ok(Self { client, select_url })
    }

    /// Query-string parameters for a search request.
    fn params(query: &CatalogQuery) -> Vec<(String, String)> {
        let q = if query.q.trim().is_empty() {
            "*:*".to_string()
        } else {
            query.q.clone()
        };

        let mut params = vec![
            ("wt".to_string(), "json".to_string()),
            ("q".to_string(), q),
            ("start".to_string(), query.start.to_string()),
            ("rows".to_string(), query.rows.to_string()),
        ];

        if !query.q.trim().is_empty() {
            params.push(("defType".to_string(), "edismax".to_string()));
        }
        if !query.fq.is_empty() {
            params.push(("fq".to_string(), query.fq.clone()));
        }
        if let Some(ref sort) = query.sort {
            params.push(("sort".to_string(), sort.clone()));
        }
        if !query.facet_fields.is_empty() {
            params.push(("facet".to_string(), "true".to_string()));
            params.push(("facet.limit".to_string(), "-1".to_string()));
            params.push(("facet.mincount".to_string(), "1".to_string()));
            for field in &query.facet_fields {
                params.push(("facet.field".to_string(), field.clone()));
            }
        }
        for (key, value) in &query.extras {
            params.push((key.clone(), value.clone()));
        }

        params
    }
}

/// Parse a Solr `select` response body.
fn parse_response(body: &Value, requested_sort: Option<&str>) -> Result<CatalogResponse, CatalogError> {
    let response = body
        .get("response")
        .ok_or_else(|| CatalogError::MalformedResponse("missing 'response'".to_string()))?;

    let count = response
        .get("numFound")
        .and_then(Value::as_u64)
        .ok_or_else(|| CatalogError::MalformedResponse("missing 'numFound'".to_string()))?;

    let items = response
        .get("docs")
        .and_then(Value::as_array)
        .map(|docs| docs.iter().filter_map(parse_doc).collect())
        .unwrap_or_default();

    let mut facets = IndexMap::new();
    if let Some(fields) = body
        .pointer("/facet_counts/facet_fields")
        .and_then(Value::as_object)
    {
        for (field, flat) in fields {
            facets.insert(field.clone(), parse_facet_pairs(flat));
        }
    }

    let sort = body
        .pointer("/responseHeader/params/sort")
        .and_then(Value::as_str)
        .or(requested_sort)
        .map(String::from);

    Ok(CatalogResponse {
        items,
        count,
        facets,
        sort,
    })
}

/// Solr returns facet counts as a flat `[value, count, value, count, ...]` list.
fn parse_facet_pairs(flat: &Value) -> Vec<FacetCount> {
    let Some(entries) = flat.as_array() else {
        return Vec::new();
    };

    let mut counts: Vec<FacetCount> = entries
        .chunks(2)
        .filter_map(|pair| match pair {
            [name, count] => Some(FacetCount {
                name: name.as_str()?.to_string(),
                count: count.as_u64()?,
            }),
            _ => None,
        })
        .collect();

    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    counts
}

fn parse_doc(doc: &Value) -> Option<CatalogItem> {
    let obj = doc.as_object()?;
    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(String::from);

    let mut fields = BTreeMap::new();
    for (key, value) in obj {
        if CORE_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let values: Vec<String> = match value {
            Value::String(s) => vec![s.clone()],
            Value::Array(list) => list
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            _ => continue,
        };
        if !values.is_empty() {
            fields.insert(key.clone(), values);
        }
    }

    Some(CatalogItem {
        id: text("id")?,
        name: text("name").unwrap_or_default(),
        title: text("title").unwrap_or_default(),
        item_type: text("dataset_type").unwrap_or_default(),
        fields,
    })
}

#[async_trait]
impl Catalog for SolrCatalog {
    async fn search(&self, query: &CatalogQuery) -> Result<CatalogResponse, CatalogError> {
        let params = Self::params(query);
        debug!(fq = %query.fq, start = query.start, rows = query.rows, "solr select");

        let response = self
            .client
            .get(self.select_url.clone())
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        parse_response(&body, query.sort.as_deref())
    }

    async fn fetch(&self, id_or_name: &str) -> Result<Option<CatalogItem>, CatalogError> {
        let quoted = quote_value(id_or_name);
        let query = CatalogQuery {
            fq: format!("id:{quoted} OR name:{quoted}"),
            rows: 1,
            ..Default::default()
        };
        let mut response = self.search(&query).await?;
        Ok(response.items.pop())
    }
}

impl std::fmt::Debug for SolrCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolrCatalog")
            .field("select_url", &self.select_url.as_str())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_url_appends_handler() {
        let catalog = SolrCatalog::new("http://solr:8983/solr/ckan", Duration::from_secs(1)).unwrap();
        assert_eq!(catalog.select_url.as_str(), "http://solr:8983/solr/ckan/select");

        let catalog = SolrCatalog::new("http://solr:8983/solr/ckan/", Duration::from_secs(1)).unwrap();
        assert_eq!(catalog.select_url.as_str(), "http://solr:8983/solr/ckan/select");
    }

    #[test]
    fn params_request_facets_in_order() {
        let query = CatalogQuery {
            q: String::new(),
            fq: "+dataset_type:\"dataset\"".to_string(),
            facet_fields: vec!["organization".to_string(), "tags".to_string()],
            sort: Some("title_string asc".to_string()),
            start: 20,
            rows: 20,
            extras: IndexMap::from([("ext_bbox".to_string(), "1,2,3,4".to_string())]),
        };

        let params = SolrCatalog::params(&query);
        let get = |k: &str| {
            params
                .iter()
                .filter(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
                .collect::<Vec<_>>()
        };

        assert_eq!(get("q"), vec!["*:*"]);
        assert!(get("defType").is_empty());
        assert_eq!(get("facet.field"), vec!["organization", "tags"]);
        assert_eq!(get("start"), vec!["20"]);
        assert_eq!(get("sort"), vec!["title_string asc"]);
        assert_eq!(get("ext_bbox"), vec!["1,2,3,4"]);
    }

    #[test]
    fn parses_docs_counts_and_facets() {
        let body = json!({
            "responseHeader": {"params": {"sort": "score desc"}},
            "response": {
                "numFound": 42,
                "docs": [
                    {"id": "d1", "name": "air", "title": "Air", "dataset_type": "dataset",
                     "tags": ["air", "health"], "organization": "env", "num_resources": 3},
                    {"name": "no-id"}
                ]
            },
            "facet_counts": {"facet_fields": {
                "tags": ["health", 1, "air", 5],
                "organization": ["env", 7]
            }}
        });

        let response = parse_response(&body, None).unwrap();
        assert_eq!(response.count, 42);
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].field_values("tags"), vec!["air", "health"]);
        assert_eq!(response.items[0].field_values("organization"), vec!["env"]);
        assert!(response.items[0].fields.get("num_resources").is_none());

        let tags = &response.facets["tags"];
        assert_eq!(tags[0], FacetCount { name: "air".into(), count: 5 });
        assert_eq!(response.sort.as_deref(), Some("score desc"));
    }

    #[test]
    fn missing_response_is_malformed() {
        let err = parse_response(&json!({"error": {"msg": "boom"}}), None).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse(_)));
    }
}
