//! Showcase operator tool.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use showcase_kernel::{Config, ShowcaseService, db};

use crate::cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    info!(search_url = %config.search_url, "configuration loaded");

    if let Command::Migrate = args.command {
        let pool = db::create_pool(&config).await?;
        return cli::cmd_migrate(&pool).await;
    }

    let service = ShowcaseService::from_config(&config)
        .await
        .context("failed to initialize showcase service")?;
    let ctx = args.context();

    match &args.command {
        Command::Migrate => Ok(()),
        Command::Add { showcase, datasets } => {
            cli::cmd_add(&service, &ctx, showcase, datasets).await
        }
        Command::Remove { showcase, datasets } => {
            cli::cmd_remove(&service, &ctx, showcase, datasets).await
        }
        Command::Datasets { showcase } => {
            cli::cmd_datasets(&service, &ctx, showcase, args.json).await
        }
        Command::Showcases { dataset } => {
            cli::cmd_showcases(&service, &ctx, dataset, args.json).await
        }
        Command::Discover { showcase, query } => {
            cli::cmd_discover(&service, &ctx, showcase, query, args.json).await
        }
        Command::Purge { item } => cli::cmd_purge(&service, item).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
