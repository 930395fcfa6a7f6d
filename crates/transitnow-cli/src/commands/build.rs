use clap::Args;
use transitnow_core::{
    data_dir, publish, seeded_rng, ArtifactStore, BoundaryTable, Catalog, Config, ScheduleBuilder,
};

use super::resolve_now;

#[derive(Args)]
pub struct BuildArgs {
    /// Build as of this time (RFC 3339) instead of now
    #[arg(long)]
    now: Option<String>,
    /// Seed for reproducible variant selection (overrides build.seed)
    #[arg(long)]
    seed: Option<u64>,
    /// Use local catalog and boundary files without checking for updates
    #[arg(long)]
    offline: bool,
    /// Print the build summary as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: BuildArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let dir = data_dir()?;
    let now = resolve_now(args.now.as_deref())?;
    tracing::debug!(data_dir = %dir.display(), %now, "starting build");

    let catalog_path = config.catalog.catalog_path(&dir);
    let boundaries_path = config.catalog.boundaries_path(&dir);
    if !args.offline {
        if let Err(e) = super::catalog::refresh(&config, &dir, false) {
            if !(catalog_path.exists() && boundaries_path.exists()) {
                return Err(e);
            }
            tracing::warn!(error = %e, "refresh failed, building from local copies");
        }
    }
    let catalog = Catalog::load(&catalog_path)?;
    let table = BoundaryTable::load(&boundaries_path)?;

    let mut rng = seeded_rng(args.seed.or(config.build.seed));
    let outcome =
        ScheduleBuilder::from_config(&config.build).build(&catalog, now, &table, &mut rng)?;
    let store = ArtifactStore::open(&dir)?;
    publish(&outcome, &store)?;

    if args.json {
        let summary = serde_json::json!({
            "built_at": outcome.built_at,
            "planets": outcome.planets,
            "minutes": outcome.schedule.len(),
            "messages": outcome.audit.len(),
            "dropped": outcome.dropped,
            "skipped_rows": catalog.skipped().len(),
            "failures": outcome.failures,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Scheduled {} messages in {} minutes from {} planets \
             ({} dropped, {} failed, {} rows skipped)",
            outcome.audit.len(),
            outcome.schedule.len(),
            outcome.planets,
            outcome.dropped,
            outcome.failures.len(),
            catalog.skipped().len()
        );
        for failure in &outcome.failures {
            println!("  {}: {}", failure.planet, failure.reason);
        }
    }
    Ok(())
}
