use std::time::Duration;

use clap::Args;
use transitnow_core::{data_dir, transport, ArtifactStore, Config, Consumer, Pacer, RealPacer};

use super::resolve_now;

#[derive(Args)]
pub struct EmitArgs {
    /// Emit for the minute containing this time (RFC 3339) instead of now
    #[arg(long)]
    now: Option<String>,
    /// Post back to back instead of spreading over the minute
    #[arg(long)]
    no_wait: bool,
}

/// Pacer that never blocks.
struct Immediate(RealPacer);

impl Pacer for Immediate {
    fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }

    fn sleep(&mut self, _duration: Duration) {}
}

pub fn run(args: EmitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let dir = data_dir()?;
    let now = resolve_now(args.now.as_deref())?;

    let store = ArtifactStore::open(&dir)?;
    let mut transport = transport::from_config(&config.emit, &dir)?;
    let consumer = Consumer::from_config(&config.emit);

    let report = if args.no_wait {
        consumer.run(&store, now, &mut transport, &mut Immediate(RealPacer::start()))?
    } else {
        consumer.run(&store, now, &mut transport, &mut RealPacer::start())?
    };

    if !report.failed.is_empty() {
        return Err(format!(
            "{} of {} messages for {} could not be posted",
            report.failed.len(),
            report.due,
            report.minute
        )
        .into());
    }
    Ok(())
}
