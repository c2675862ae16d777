//! In-process catalog.
//!
//! Holds items in insertion order and evaluates the filter expressions built
//! by `QueryExpressionBuilder` (`+field:"v"`, `-field:("a" OR "b")`, bare
//! clauses joined with `OR`). Used by tests and local runs without a search
//! core.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use super::{Catalog, CatalogError, CatalogItem, CatalogQuery, CatalogResponse, FacetCount};
use crate::search::expression::is_valid_field_name;

/// How a clause takes part in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occur {
    Must,
    MustNot,
    Should,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    occur: Occur,
    field: String,
    values: Vec<String>,
}

impl Clause {
    fn matches(&self, item: &CatalogItem) -> bool {
        item.field_values(&self.field)
            .iter()
            .any(|v| self.values.iter().any(|wanted| wanted == v))
    }
}

/// Character cursor over a filter expression.
struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn expect(&mut self, wanted: char) -> Result<(), CatalogError> {
        match self.chars.next() {
            Some(c) if c == wanted => Ok(()),
            other => Err(malformed(format!("expected '{wanted}', found {other:?}"))),
        }
    }

    /// Read a bare word (field name or operator).
    fn word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self
            .chars
            .next_if(|c| !c.is_whitespace() && !matches!(*c, ':' | '(' | ')' | '"'))
        {
            word.push(c);
        }
        word
    }

    /// Read a quoted phrase, honouring backslash escapes.
    fn phrase(&mut self) -> Result<String, CatalogError> {
        self.expect('"')?;
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some('\\') => match self.chars.next() {
                    Some(c) => value.push(c),
                    None => return Err(malformed("dangling escape")),
                },
                Some('"') => return Ok(value),
                Some(c) => value.push(c),
                None => return Err(malformed("unterminated phrase")),
            }
        }
    }
}

fn malformed(message: impl Into<String>) -> CatalogError {
    CatalogError::MalformedQuery(message.into())
}

/// Parse a filter expression into clauses.
fn parse_filter(fq: &str) -> Result<Vec<Clause>, CatalogError> {
    let mut cursor = Cursor::new(fq);
    let mut clauses = Vec::new();

    loop {
        cursor.skip_ws();
        let Some(first) = cursor.peek() else {
            break;
        };

        let occur = match first {
            '+' => Occur::Must,
            '-' => Occur::MustNot,
            _ => Occur::Should,
        };
        if occur != Occur::Should {
            cursor.chars.next();
        }

        let field = cursor.word();
        if occur == Occur::Should && field == "OR" {
            continue;
        }
        if !is_valid_field_name(&field) {
            return Err(malformed(format!("invalid field '{field}'")));
        }
        cursor.expect(':')?;

        let values = match cursor.peek() {
            Some('"') => vec![cursor.phrase()?],
            Some('(') => {
                cursor.chars.next();
                let mut values = Vec::new();
                loop {
                    cursor.skip_ws();
                    values.push(cursor.phrase()?);
                    cursor.skip_ws();
                    if cursor.peek() == Some(')') {
                        cursor.chars.next();
                        break;
                    }
                    let op = cursor.word();
                    if op != "OR" {
                        return Err(malformed(format!("expected OR, found '{op}'")));
                    }
                }
                values
            }
            other => return Err(malformed(format!("expected value, found {other:?}"))),
        };

        clauses.push(Clause {
            occur,
            field,
            values,
        });
    }

    Ok(clauses)
}

fn matches_filter(clauses: &[Clause], item: &CatalogItem) -> bool {
    let mut any_should = false;
    let mut should_hit = false;
    for clause in clauses {
        match clause.occur {
            Occur::Must if !clause.matches(item) => return false,
            Occur::MustNot if clause.matches(item) => return false,
            Occur::Should => {
                any_should = true;
                should_hit |= clause.matches(item);
            }
            _ => {}
        }
    }
    !any_should || should_hit
}

/// Every whitespace-separated term must occur (case-insensitively) in the
/// name, title, or a field value.
fn matches_text(q: &str, item: &CatalogItem) -> bool {
    let terms: Vec<String> = q.split_whitespace().map(str::to_lowercase).collect();
    if terms.is_empty() || q.trim() == "*:*" {
        return true;
    }

    let haystack: Vec<String> = std::iter::once(item.name.as_str())
        .chain(std::iter::once(item.title.as_str()))
        .chain(item.fields.values().flatten().map(String::as_str))
        .map(str::to_lowercase)
        .collect();

    terms
        .iter()
        .all(|term| haystack.iter().any(|text| text.contains(term.as_str())))
}

/// Parse `field dir, field dir` into (field, descending) pairs.
fn parse_sort(sort: &str) -> Result<Vec<(String, bool)>, CatalogError> {
    sort.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            let mut parts = token.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(field), Some(dir), None) => match dir.to_lowercase().as_str() {
                    "asc" => Ok((field.to_string(), false)),
                    "desc" => Ok((field.to_string(), true)),
                    _ => Err(malformed(format!("bad sort direction '{dir}'"))),
                },
                _ => Err(malformed(format!("bad sort token '{token}'"))),
            }
        })
        .collect()
}

fn compare_by(a: &CatalogItem, b: &CatalogItem, keys: &[(String, bool)]) -> Ordering {
    for (field, descending) in keys {
        // Relevance is not modelled; score keeps insertion order
        if field == "score" {
            continue;
        }
        let left = a.field_values(field).first().map(|s| s.to_lowercase());
        let right = b.field_values(field).first().map(|s| s.to_lowercase());
        let ordering = left.cmp(&right);
        let ordering = if *descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// In-memory catalog.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    items: RwLock<IndexMap<String, CatalogItem>>,
    available: AtomicBool,
    search_calls: AtomicUsize,
    last_query: Mutex<Option<CatalogQuery>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            ..Default::default()
        }
    }

    /// Catalog pre-filled with `items`.
    pub fn with_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let catalog = Self::new();
        for item in items {
            catalog.insert(item);
        }
        catalog
    }

    /// Insert or replace an item.
    pub fn insert(&self, item: CatalogItem) {
        self.items.write().insert(item.id.clone(), item);
    }

    /// Remove an item, returning it.
    pub fn remove(&self, id: &str) -> Option<CatalogItem> {
        self.items.write().shift_remove(id)
    }

    /// Toggle backend availability; searches fail with `Unavailable` while off.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::SeqCst);
    }

    /// Number of `search` calls made so far.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(AtomicOrdering::SeqCst)
    }

    /// The most recent search request.
    pub fn last_query(&self) -> Option<CatalogQuery> {
        self.last_query.lock().clone()
    }

    fn facet_counts(matches: &[CatalogItem], fields: &[String]) -> IndexMap<String, Vec<FacetCount>> {
        let mut facets = IndexMap::new();
        for field in fields {
            let mut counts: IndexMap<String, u64> = IndexMap::new();
            for item in matches {
                for value in item.field_values(field) {
                    if !value.is_empty() {
                        *counts.entry(value.to_string()).or_default() += 1;
                    }
                }
            }
            let mut values: Vec<FacetCount> = counts
                .into_iter()
                .map(|(name, count)| FacetCount { name, count })
                .collect();
            values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
            facets.insert(field.clone(), values);
        }
        facets
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn search(&self, query: &CatalogQuery) -> Result<CatalogResponse, CatalogError> {
        self.search_calls.fetch_add(1, AtomicOrdering::SeqCst);
        *self.last_query.lock() = Some(query.clone());

        if !self.available.load(AtomicOrdering::SeqCst) {
            return Err(CatalogError::Unavailable);
        }

        let clauses = parse_filter(&query.fq)?;
        let sort_keys = match query.sort {
            Some(ref sort) => parse_sort(sort)?,
            None => Vec::new(),
        };

        let mut matches: Vec<CatalogItem> = self
            .items
            .read()
            .values()
            .filter(|item| matches_filter(&clauses, item) && matches_text(&query.q, item))
            .cloned()
            .collect();
        matches.sort_by(|a, b| compare_by(a, b, &sort_keys));

        let facets = Self::facet_counts(&matches, &query.facet_fields);
        let count = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(usize::try_from(query.start).unwrap_or(usize::MAX))
            .take(query.rows as usize)
            .collect();

        Ok(CatalogResponse {
            items,
            count,
            facets,
            sort: query.sort.clone(),
        })
    }

    async fn fetch(&self, id_or_name: &str) -> Result<Option<CatalogItem>, CatalogError> {
        let items = self.items.read();
        if let Some(item) = items.get(id_or_name) {
            return Ok(Some(item.clone()));
        }
        Ok(items.values().find(|item| item.name == id_or_name).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn dataset(id: &str, tags: &[&str]) -> CatalogItem {
        tags.iter().fold(
            CatalogItem::new(id, format!("{id}-name"), "dataset").with_title(id.to_uppercase()),
            |item, tag| item.with_field("tags", *tag),
        )
    }

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::with_items([
            dataset("d1", &["air", "health"]),
            dataset("d2", &["air"]),
            dataset("d3", &["water"]),
            CatalogItem::new("s1", "best-of", "showcase"),
        ])
    }

    fn query(fq: &str) -> CatalogQuery {
        CatalogQuery {
            fq: fq.to_string(),
            rows: 10,
            facet_fields: vec!["tags".to_string()],
            ..Default::default()
        }
    }

    fn ids(response: &CatalogResponse) -> Vec<&str> {
        response.items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn parses_grouped_and_negated_clauses() {
        let clauses = parse_filter(r#"+tags:("air" OR "wa\"ter") -id:"d1""#).unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].occur, Occur::Must);
        assert_eq!(clauses[0].values, vec!["air", "wa\"ter"]);
        assert_eq!(clauses[1].occur, Occur::MustNot);
    }

    #[test]
    fn rejects_unterminated_phrase() {
        assert!(matches!(
            parse_filter(r#"+tags:"air"#),
            Err(CatalogError::MalformedQuery(_))
        ));
    }

    #[tokio::test]
    async fn must_and_must_not_clauses() {
        let response = catalog()
            .search(&query(r#"+tags:"air" -id:("d1")"#))
            .await
            .unwrap();
        assert_eq!(ids(&response), vec!["d2"]);
        assert_eq!(response.count, 1);
    }

    #[tokio::test]
    async fn should_clauses_need_one_hit() {
        let response = catalog()
            .search(&query(r#"id:"d3" OR name:"d3""#))
            .await
            .unwrap();
        assert_eq!(ids(&response), vec!["d3"]);
    }

    #[tokio::test]
    async fn facets_count_all_matches_not_just_the_page() {
        let mut q = query(r#"+dataset_type:"dataset""#);
        q.rows = 1;
        let response = catalog().search(&q).await.unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.count, 3);
        assert_eq!(
            response.facets["tags"][0],
            FacetCount {
                name: "air".into(),
                count: 2
            }
        );
    }

    #[tokio::test]
    async fn free_text_and_sort() {
        let mut q = query("");
        q.q = "d".to_string();
        q.sort = Some("name desc".to_string());
        let response = catalog().search(&q).await.unwrap();
        assert_eq!(ids(&response), vec!["d3", "d2", "d1"]);
    }

    #[tokio::test]
    async fn unavailable_backend_fails() {
        let catalog = catalog();
        catalog.set_available(false);
        let err = catalog.search(&query("")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable));
        assert_eq!(catalog.search_calls(), 1);
    }

    #[tokio::test]
    async fn fetch_by_id_or_name() {
        let catalog = catalog();
        assert_eq!(catalog.fetch("d2").await.unwrap().unwrap().id, "d2");
        assert_eq!(catalog.fetch("best-of").await.unwrap().unwrap().id, "s1");
        assert!(catalog.fetch("nope").await.unwrap().is_none());
    }
}
