//! Operator command implementations.
//!
//! Each command prints a short human-readable report; `--json` switches
//! listing and discovery output to JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::PgPool;

use showcase_kernel::batch::BulkOutcome;
use showcase_kernel::catalog::CatalogItem;
use showcase_kernel::search::{DiscoveryResult, SearchParams};
use showcase_kernel::{Actor, RequestContext, ShowcaseService};

/// Showcase association tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Act as this user (sysadmins come from SYSADMINS). Anonymous when omitted.
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply database migrations.
    Migrate,

    /// Add datasets to a showcase.
    Add {
        showcase: String,
        #[arg(required = true)]
        datasets: Vec<String>,
    },

    /// Remove datasets from a showcase.
    Remove {
        showcase: String,
        #[arg(required = true)]
        datasets: Vec<String>,
    },

    /// List the datasets of a showcase.
    Datasets { showcase: String },

    /// List the showcases a dataset belongs to.
    Showcases { dataset: String },

    /// Search datasets that could be added to a showcase.
    Discover {
        showcase: String,
        /// Query string, e.g. `q=air&tags=health&page=2`.
        #[arg(default_value = "")]
        query: String,
    },

    /// Remove every association of a deleted showcase or dataset.
    Purge { item: String },
}

impl Args {
    pub fn context(&self) -> RequestContext {
        match &self.user {
            Some(name) => RequestContext::new(Actor::user(name.clone(), &[])),
            None => RequestContext::new(Actor::anonymous()),
        }
    }
}

pub async fn cmd_migrate(pool: &PgPool) -> Result<()> {
    showcase_kernel::db::run_migrations(pool).await?;
    println!("Migrations applied.");
    Ok(())
}

pub async fn cmd_add(
    service: &ShowcaseService,
    ctx: &RequestContext,
    showcase: &str,
    datasets: &[String],
) -> Result<()> {
    let outcome = service.bulk_add(ctx, showcase, datasets).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn cmd_remove(
    service: &ShowcaseService,
    ctx: &RequestContext,
    showcase: &str,
    datasets: &[String],
) -> Result<()> {
    let outcome = service.bulk_remove(ctx, showcase, datasets).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn cmd_datasets(
    service: &ShowcaseService,
    ctx: &RequestContext,
    showcase: &str,
    json: bool,
) -> Result<()> {
    let items = service.datasets_for_showcase(ctx, showcase).await?;
    print_items(&items, json)
}

pub async fn cmd_showcases(
    service: &ShowcaseService,
    ctx: &RequestContext,
    dataset: &str,
    json: bool,
) -> Result<()> {
    let items = service.showcases_for_dataset(ctx, dataset).await?;
    print_items(&items, json)
}

pub async fn cmd_discover(
    service: &ShowcaseService,
    ctx: &RequestContext,
    showcase: &str,
    query: &str,
    json: bool,
) -> Result<()> {
    let params = SearchParams::from_query_string(query);
    let result = service.discover(ctx, showcase, &params).await?;

    if json {
        let out = serde_json::to_string_pretty(&result).context("failed to encode result")?;
        println!("{out}");
        return Ok(());
    }

    print_discovery(&result);
    Ok(())
}

pub async fn cmd_purge(service: &ShowcaseService, item: &str) -> Result<()> {
    let removed = service.item_deleted(item).await?;
    println!("Removed {removed} association(s) for '{item}'.");
    Ok(())
}

fn print_outcome(outcome: &BulkOutcome) {
    if let Some(flash) = outcome.flash_message() {
        println!("{flash}");
    }
    for message in outcome.messages() {
        println!("  {message}");
    }
}

fn print_items(items: &[CatalogItem], json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(items).context("failed to encode items")?;
        println!("{out}");
        return Ok(());
    }

    if items.is_empty() {
        println!("No items.");
        return Ok(());
    }

    println!("{:<38} {:<30} {}", "ID", "NAME", "TITLE");
    println!("{}", "-".repeat(90));
    for item in items {
        println!("{:<38} {:<30} {}", item.id, item.name, item.title);
    }
    Ok(())
}

fn print_discovery(result: &DiscoveryResult) {
    if result.query_error {
        println!("Search is currently unavailable.");
        return;
    }

    let page = &result.page;
    println!(
        "{} dataset(s) found, showing {}-{} (page {} of {})",
        result.count,
        page.first_item(),
        page.last_item(),
        page.page,
        page.page_count()
    );
    for item in &page.items {
        println!("  {:<38} {}", item.id, item.title);
    }

    for (field, facet) in &result.search_facets {
        let visible = result.visible_facet_items(field);
        if visible.is_empty() {
            continue;
        }
        println!("{}:", facet.title);
        for value in visible {
            println!("  {} ({})", value.name, value.count);
        }
    }
}
