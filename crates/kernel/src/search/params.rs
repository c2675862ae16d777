//! Discovery request parameters.
//!
//! Raw parameters arrive as an ordered, multi-valued list of pairs. They are
//! classified as:
//! - `q`, `page`, `sort`: reserved
//! - `_<facet>_limit`: per-facet display limit overrides (other `_*` keys are ignored)
//! - `ext_*`: pass-through extras for the search service
//! - anything else with a non-empty value: a field filter
//!
//! Parsing is fail-fast: a malformed page, sort token, or limit rejects the
//! whole request.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::expression::is_valid_field_name;
use crate::error::{ShowcaseError, ShowcaseResult};

const RESERVED: &[&str] = &["q", "page", "sort"];
const EXTRA_PREFIX: &str = "ext_";
const LIMIT_SUFFIX: &str = "_limit";

/// Ordered request parameters; keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Builder-style append.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse `a=1&b=2` style query strings (values percent-decoded).
    pub fn from_query_string(query: &str) -> Self {
        url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .into_owned()
            .collect()
    }

    /// Encode back to a query string, preserving order.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }

    /// Copy without any value for `key`.
    pub fn without(&self, key: &str) -> Self {
        self.pairs
            .iter()
            .filter(|(k, _)| k != key)
            .cloned()
            .collect()
    }

    /// Copy without the `key=value` filter (or every `key` filter when
    /// `value` is `None`). Always resets the page.
    pub fn remove_field(&self, key: &str, value: Option<&str>) -> Self {
        self.pairs
            .iter()
            .filter(|(k, v)| k != "page" && !(k == key && value.is_none_or(|value| v == value)))
            .cloned()
            .collect()
    }

    /// Copy with the sort replaced by `fields` (backend default when empty).
    /// Always resets the page.
    pub fn sort_by(&self, fields: &[SortField]) -> Self {
        let mut params = self.without("page").without("sort");
        if !fields.is_empty() {
            let spec = SortSpec {
                fields: fields.to_vec(),
            };
            params.push("sort", spec.to_string());
        }
        params
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One `field direction` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

/// Ordered sort specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub fields: Vec<SortField>,
}

impl SortSpec {
    /// Parse `field dir, field dir`. Blank input means "backend default".
    pub fn parse(raw: &str) -> ShowcaseResult<Option<Self>> {
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let fields = raw
            .split(',')
            .map(|token| parse_sort_token(token.trim()))
            .collect::<ShowcaseResult<Vec<_>>>()?;

        Ok(Some(Self { fields }))
    }

    /// Field names in order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.field.clone()).collect()
    }
}

fn parse_sort_token(token: &str) -> ShowcaseResult<SortField> {
    let invalid = || {
        ShowcaseError::invalid_parameter("sort", format!("cannot parse sort entry '{token}'"))
    };

    let mut parts = token.split_whitespace();
    let (Some(field), Some(direction), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    if !is_valid_field_name(field) {
        return Err(invalid());
    }
    let direction = match direction.to_lowercase().as_str() {
        "asc" => SortDirection::Asc,
        "desc" => SortDirection::Desc,
        _ => return Err(invalid()),
    };

    Ok(SortField {
        field: field.to_string(),
        direction,
    })
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let dir = match entry.direction {
                SortDirection::Asc => "asc",
                SortDirection::Desc => "desc",
            };
            write!(f, "{} {dir}", entry.field)?;
        }
        Ok(())
    }
}

/// Classified, validated discovery parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryParams {
    /// Free-text term.
    pub q: String,
    /// 1-based page.
    pub page: u32,
    pub sort: Option<SortSpec>,
    /// Field filters in request order.
    pub filters: Vec<(String, String)>,
    /// `ext_*` pass-through parameters (last value wins).
    pub extras: IndexMap<String, String>,
    /// Facet field -> display limit override.
    pub facet_limits: IndexMap<String, u32>,
}

impl DiscoveryParams {
    /// Classify and validate raw parameters.
    pub fn parse(params: &SearchParams) -> ShowcaseResult<Self> {
        let q = params.get("q").unwrap_or_default().to_string();
        let page = parse_page(params.get("page"))?;
        let sort = match params.get("sort") {
            Some(raw) => SortSpec::parse(raw)?,
            None => None,
        };

        let mut filters = Vec::new();
        let mut extras = IndexMap::new();
        let mut facet_limits = IndexMap::new();

        for (key, value) in params.iter() {
            if RESERVED.contains(&key) {
                continue;
            }

            if let Some(facet) = limit_param_facet(key) {
                let limit = value.trim().parse::<u32>().map_err(|_| {
                    ShowcaseError::invalid_parameter(key, "is not a non-negative integer")
                })?;
                facet_limits.insert(facet.to_string(), limit);
                continue;
            }

            if value.is_empty() || key.starts_with('_') {
                continue;
            }

            if key.starts_with(EXTRA_PREFIX) {
                extras.insert(key.to_string(), value.to_string());
            } else {
                filters.push((key.to_string(), value.to_string()));
            }
        }

        Ok(Self {
            q,
            page,
            sort,
            filters,
            extras,
            facet_limits,
        })
    }

    /// Zero-based offset of the first result for `rows` per page.
    pub fn offset(&self, rows: u32) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(rows)
    }
}

/// `_tags_limit` -> `tags`.
fn limit_param_facet(key: &str) -> Option<&str> {
    key.strip_prefix('_')?
        .strip_suffix(LIMIT_SUFFIX)
        .filter(|facet| !facet.is_empty())
}

/// Missing or blank page is page 1; integers below 1 clamp to 1.
fn parse_page(raw: Option<&str>) -> ShowcaseResult<u32> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(1);
    };
    let page: i64 = raw
        .parse()
        .map_err(|_| ShowcaseError::invalid_parameter("page", "is not an integer"))?;
    Ok(page.clamp(1, i64::from(u32::MAX)) as u32)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn parameter_of(err: ShowcaseError) -> String {
        match err {
            ShowcaseError::InvalidParameter { parameter, .. } => parameter,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn classifies_parameters() {
        let params = SearchParams::new()
            .with("q", "air")
            .with("tags", "health")
            .with("organization", "")
            .with("_private", "x")
            .with("ext_bbox", "1,2,3,4")
            .with("tags", "air")
            .with("_tags_limit", "0");

        let parsed = DiscoveryParams::parse(&params).unwrap();
        assert_eq!(parsed.q, "air");
        assert_eq!(parsed.page, 1);
        assert_eq!(
            parsed.filters,
            vec![
                ("tags".to_string(), "health".to_string()),
                ("tags".to_string(), "air".to_string()),
            ]
        );
        assert_eq!(parsed.extras["ext_bbox"], "1,2,3,4");
        assert_eq!(parsed.facet_limits["tags"], 0);
    }

    #[test]
    fn non_integer_limit_names_the_parameter() {
        let params = SearchParams::new().with("_tags_limit", "abc");
        let err = DiscoveryParams::parse(&params).unwrap_err();
        assert_eq!(parameter_of(err), "_tags_limit");

        let params = SearchParams::new().with("_res_format_limit", "-3");
        assert_eq!(
            parameter_of(DiscoveryParams::parse(&params).unwrap_err()),
            "_res_format_limit"
        );
    }

    #[test]
    fn page_clamps_and_rejects_garbage() {
        for (raw, expected) in [("0", 1), ("-4", 1), ("1", 1), ("7", 7), (" ", 1)] {
            let params = SearchParams::new().with("page", raw);
            assert_eq!(DiscoveryParams::parse(&params).unwrap().page, expected, "{raw}");
        }

        let params = SearchParams::new().with("page", "two");
        assert_eq!(parameter_of(DiscoveryParams::parse(&params).unwrap_err()), "page");
    }

    #[test]
    fn offset_uses_page_size() {
        let params = SearchParams::new().with("page", "3");
        assert_eq!(DiscoveryParams::parse(&params).unwrap().offset(20), 40);
    }

    #[test]
    fn sort_parses_and_round_trips_to_backend_form() {
        let spec = SortSpec::parse("metadata_modified desc,  name ASC").unwrap().unwrap();
        assert_eq!(spec.field_names(), vec!["metadata_modified", "name"]);
        assert_eq!(spec.to_string(), "metadata_modified desc, name asc");
        assert!(SortSpec::parse("  ").unwrap().is_none());
    }

    #[test]
    fn unparsable_sort_tokens_fail() {
        for raw in ["name", "name up", "name asc extra", "name asc,,title desc", "na:me asc"] {
            let err = SortSpec::parse(raw).unwrap_err();
            assert_eq!(parameter_of(err), "sort", "{raw}");
        }
    }

    #[test]
    fn limit_param_detection() {
        assert_eq!(limit_param_facet("_tags_limit"), Some("tags"));
        assert_eq!(limit_param_facet("_res_format_limit"), Some("res_format"));
        assert_eq!(limit_param_facet("_limit"), None);
        assert_eq!(limit_param_facet("tags_limit"), None);
    }

    #[test]
    fn query_string_parsing_decodes_values() {
        let params = SearchParams::from_query_string("?q=air+quality&tags=a%22b&page=2");
        assert_eq!(params.get("q"), Some("air quality"));
        assert_eq!(params.get("tags"), Some("a\"b"));
        assert_eq!(params.get("page"), Some("2"));
    }

    #[test]
    fn url_helpers_reset_the_page() {
        let params = SearchParams::new()
            .with("q", "air")
            .with("tags", "a")
            .with("tags", "b")
            .with("page", "3");

        assert_eq!(
            params.remove_field("tags", Some("a")).to_query_string(),
            "q=air&tags=b"
        );
        assert_eq!(params.remove_field("tags", None).to_query_string(), "q=air");

        let sorted = params.sort_by(&[SortField {
            field: "name".into(),
            direction: SortDirection::Asc,
        }]);
        assert_eq!(
            sorted.to_query_string(),
            "q=air&tags=a&tags=b&sort=name+asc"
        );
        assert_eq!(params.sort_by(&[]).get("sort"), None);
    }
}
