//! Filter expression builder.
//!
//! Turns request filters into the filter expression understood by the catalog
//! search service:
//!
//! ```text
//! +organization:"env" +tags:("air" OR "health") +dataset_type:"dataset" -id:("d1" OR "d2")
//! ```
//!
//! Values on the same field are OR'd, different fields are AND'd, exclusions
//! are negated OR sets. Every value goes through [`quote_value`], the only
//! place where escaping happens.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{ShowcaseError, ShowcaseResult};

/// Field carrying the catalog type of an item.
pub const TYPE_FIELD: &str = "dataset_type";

/// Field carrying the canonical id of an item.
pub const ID_FIELD: &str = "id";

#[allow(clippy::unwrap_used)]
static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").unwrap());

/// Whether `name` can be used as a field name in an expression.
pub fn is_valid_field_name(name: &str) -> bool {
    name.len() <= 128 && FIELD_NAME.is_match(name)
}

/// Quote a value as a phrase.
///
/// Backslashes and double quotes are escaped, so the phrase always ends at the
/// closing quote added here, whatever the value contains.
pub fn quote_value(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '\\' || c == '"' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Render `field:"v"` or `field:("a" OR "b")`.
fn render_values<'a>(field: &str, values: impl IntoIterator<Item = &'a String>) -> String {
    let quoted: Vec<String> = values.into_iter().map(|v| quote_value(v)).collect();
    if quoted.len() == 1 {
        format!("{field}:{}", quoted[0])
    } else {
        format!("{field}:({})", quoted.join(" OR "))
    }
}

/// A negated value set: matches nothing whose `field` is one of `values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionClause {
    pub field: String,
    pub values: Vec<String>,
}

impl ExclusionClause {
    /// Clause excluding items by value; `None` when there is nothing to exclude.
    pub fn new(field: impl Into<String>, values: Vec<String>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            field: field.into(),
            values,
        })
    }

    /// Clause excluding items by id.
    pub fn ids(ids: Vec<String>) -> Option<Self> {
        Self::new(ID_FIELD, ids)
    }

    pub fn render(&self) -> String {
        format!("-{}", render_values(&self.field, &self.values))
    }
}

/// Built expression plus the filter views used for active-filter display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression {
    /// Free-text term.
    pub q: String,
    /// Filter expression for the search service.
    pub fq: String,
    /// Filters in request order.
    pub fields: Vec<(String, String)>,
    /// Filters grouped by field, distinct values in request order.
    pub fields_grouped: IndexMap<String, Vec<String>>,
}

/// Builder for [`FilterExpression`].
#[derive(Debug, Clone, Default)]
pub struct QueryExpressionBuilder {
    text: String,
    filters: Vec<(String, String)>,
    explicit_type: Option<String>,
    default_type: Option<String>,
    exclusions: Vec<ExclusionClause>,
}

impl QueryExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text term.
    pub fn text(mut self, q: impl Into<String>) -> Self {
        self.text = q.into();
        self
    }

    /// Add an equality filter. Empty values are ignored.
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.filters.push((field.into(), value));
        }
        self
    }

    /// Add several equality filters in order.
    pub fn filters<I, F, V>(self, filters: I) -> Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<String>,
    {
        filters
            .into_iter()
            .fold(self, |builder, (field, value)| builder.filter(field, value))
    }

    /// Restrict results to one catalog type, regardless of configuration.
    pub fn restrict_type(mut self, item_type: impl Into<String>) -> Self {
        self.explicit_type = Some(item_type.into());
        self
    }

    /// Type applied when no explicit type filter is present.
    ///
    /// With `show_all_types` set no default restriction is applied.
    pub fn default_type(mut self, item_type: impl Into<String>, show_all_types: bool) -> Self {
        self.default_type = if show_all_types {
            None
        } else {
            Some(item_type.into())
        };
        self
    }

    /// AND a negated clause into the expression. `None` is a no-op.
    pub fn exclude(mut self, clause: Option<ExclusionClause>) -> Self {
        if let Some(clause) = clause {
            self.exclusions.push(clause);
        }
        self
    }

    /// Build the expression.
    ///
    /// Fails with `InvalidParameter` naming the field when a filter field is
    /// not a plain field name.
    pub fn build(self) -> ShowcaseResult<FilterExpression> {
        let mut fields_grouped: IndexMap<String, Vec<String>> = IndexMap::new();
        for (field, value) in &self.filters {
            if !is_valid_field_name(field) {
                return Err(ShowcaseError::invalid_parameter(
                    field.clone(),
                    "not a valid filter field",
                ));
            }
            let values = fields_grouped.entry(field.clone()).or_default();
            if !values.contains(value) {
                values.push(value.clone());
            }
        }

        let mut clauses: Vec<String> = fields_grouped
            .iter()
            .map(|(field, values)| format!("+{}", render_values(field, values)))
            .collect();

        let type_filtered = fields_grouped.contains_key(TYPE_FIELD);
        let type_clause = match (&self.explicit_type, &self.default_type) {
            (Some(explicit), _) => Some(explicit),
            (None, Some(default)) if !type_filtered => Some(default),
            _ => None,
        };
        if let Some(item_type) = type_clause {
            clauses.push(format!("+{TYPE_FIELD}:{}", quote_value(item_type)));
        }

        clauses.extend(self.exclusions.iter().map(ExclusionClause::render));

        Ok(FilterExpression {
            q: self.text,
            fq: clauses.join(" "),
            fields: self.filters,
            fields_grouped,
        })
    }
}
