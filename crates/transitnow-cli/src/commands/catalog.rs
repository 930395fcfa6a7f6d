use std::path::Path;

use clap::Subcommand;
use transitnow_core::catalog::{download_file, refresh_catalog, RefreshStatus};
use transitnow_core::{data_dir, BoundaryTable, Catalog, Config};

#[derive(Subcommand)]
pub enum CatalogAction {
    /// Download the catalog if missing or stale, and the boundary table if missing
    Refresh {
        /// Download even when the local copies are fresh
        #[arg(long)]
        force: bool,
    },
    /// Parse the local catalog and report what would be scheduled
    Check {
        /// Print skipped rows as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: CatalogAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let dir = data_dir()?;
    match action {
        CatalogAction::Refresh { force } => {
            refresh(&config, &dir, force)?;
        }
        CatalogAction::Check { json } => {
            let catalog = Catalog::load(&config.catalog.catalog_path(&dir))?;
            if json {
                println!("{}", serde_json::to_string_pretty(catalog.skipped())?);
            } else {
                println!(
                    "{} planets, {} schedulable, {} rows skipped",
                    catalog.len(),
                    catalog.schedulable().count(),
                    catalog.skipped().len()
                );
                for row in catalog.skipped() {
                    println!("  line {}: {}", row.line, row.reason);
                }
            }
        }
    }
    Ok(())
}

/// Bring the catalog and boundary table up to date.
pub fn refresh(config: &Config, dir: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let catalog_path = config.catalog.catalog_path(dir);
    let boundaries_path = config.catalog.boundaries_path(dir);
    let max_age = if force { 0 } else { config.catalog.max_age_days };

    let client = reqwest::Client::new();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let status = refresh_catalog(
            &client,
            &config.catalog.url,
            &catalog_path,
            max_age,
            chrono::Utc::now(),
        )
        .await?;
        match status {
            RefreshStatus::Downloaded(bytes) => println!("catalog downloaded ({bytes} bytes)"),
            RefreshStatus::Fresh { age_days } => println!("catalog is fresh ({age_days} days old)"),
        }

        if force || !boundaries_path.exists() {
            let bytes =
                download_file(&client, &config.catalog.boundaries_url, &boundaries_path).await?;
            println!("boundary table downloaded ({bytes} bytes)");
        }
        Ok::<_, transitnow_core::CoreError>(())
    })?;

    // Reject a table we cannot use before the next build depends on it.
    BoundaryTable::load(&boundaries_path)?;
    Ok(())
}
