//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Facet fields shown when `SEARCH_FACETS` is not set.
pub const DEFAULT_FACETS: &[&str] = &["organization", "groups", "tags", "res_format", "license_id"];

/// Kernel configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL. Only needed by commands touching the
    /// association table.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Base URL of the catalog search core (default: http://127.0.0.1:8983/solr/ckan).
    pub search_url: String,

    /// Upper bound for a single catalog search call (default: 10s).
    pub search_timeout: Duration,

    /// Results per discovery page (default: 20).
    pub datasets_per_page: u32,

    /// Facet values displayed when no `_<facet>_limit` override is given (default: 10).
    pub facets_default_number: u32,

    /// Ordered facet fields requested from the catalog.
    pub search_facets: Vec<String>,

    /// Disable the default dataset type restriction (default: false).
    pub show_all_types: bool,

    /// Catalog type of ordinary datasets (default: "dataset").
    pub dataset_type: String,

    /// Catalog type of showcases (default: "showcase").
    pub showcase_type: String,

    /// Extra facet titles contributed by configuration, in declaration order.
    pub extra_facet_titles: Vec<(String, String)>,

    /// Actor names granted every action.
    pub sysadmins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 10,
            search_url: "http://127.0.0.1:8983/solr/ckan".to_string(),
            search_timeout: Duration::from_secs(10),
            datasets_per_page: 20,
            facets_default_number: 10,
            search_facets: DEFAULT_FACETS.iter().map(|s| s.to_string()).collect(),
            show_all_types: false,
            dataset_type: "dataset".to_string(),
            showcase_type: "showcase".to_string(),
            extra_facet_titles: Vec::new(),
            sysadmins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let database_url = env::var("DATABASE_URL").ok();

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let search_url = env::var("SEARCH_URL").unwrap_or(defaults.search_url);

        let search_timeout_secs: u64 = env::var("SEARCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("SEARCH_TIMEOUT_SECS must be a valid u64")?;

        let datasets_per_page: u32 = env::var("DATASETS_PER_PAGE")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .context("DATASETS_PER_PAGE must be a valid u32")?;
        if datasets_per_page == 0 {
            anyhow::bail!("DATASETS_PER_PAGE must be at least 1");
        }

        let facets_default_number = env::var("FACETS_DEFAULT_NUMBER")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("FACETS_DEFAULT_NUMBER must be a valid u32")?;

        let search_facets = env::var("SEARCH_FACETS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.search_facets);

        let show_all_types = env::var("SEARCH_SHOW_ALL_TYPES")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let dataset_type = env::var("DATASET_TYPE").unwrap_or(defaults.dataset_type);
        let showcase_type = env::var("SHOWCASE_TYPE").unwrap_or(defaults.showcase_type);

        let extra_facet_titles = env::var("EXTRA_FACET_TITLES")
            .map(|v| parse_facet_titles(&v))
            .unwrap_or_else(|_| Ok(Vec::new()))
            .context("EXTRA_FACET_TITLES must be a comma-separated list of field=Title")?;

        let sysadmins = env::var("SYSADMINS")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            database_max_connections,
            search_url,
            search_timeout: Duration::from_secs(search_timeout_secs),
            datasets_per_page,
            facets_default_number,
            search_facets,
            show_all_types,
            dataset_type,
            showcase_type,
            extra_facet_titles,
            sysadmins,
        })
    }

    /// The database URL, or an error naming the missing variable.
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL environment variable is required")
    }
}

/// Split a comma- or whitespace-separated list, dropping empty entries.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse `field=Title,field2=Other Title`.
fn parse_facet_titles(value: &str) -> Result<Vec<(String, String)>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (field, title) = entry
                .split_once('=')
                .with_context(|| format!("missing '=' in '{entry}'"))?;
            let field = field.trim();
            if field.is_empty() {
                anyhow::bail!("empty field name in '{entry}'");
            }
            Ok((field.to_string(), title.trim().to_string()))
        })
        .collect()
}
