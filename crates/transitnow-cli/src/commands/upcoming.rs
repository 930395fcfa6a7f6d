use clap::Args;
use transitnow_core::lookahead::DEFAULT_LOOKAHEAD_MINUTES;
use transitnow_core::{data_dir, upcoming, ArtifactStore};

use super::resolve_now;

#[derive(Args)]
pub struct UpcomingArgs {
    /// Minutes to look ahead
    #[arg(default_value_t = DEFAULT_LOOKAHEAD_MINUTES)]
    minutes: u32,
    /// Look ahead from this time (RFC 3339) instead of now
    #[arg(long)]
    now: Option<String>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: UpcomingArgs) -> Result<(), Box<dyn std::error::Error>> {
    let now = resolve_now(args.now.as_deref())?;
    let store = ArtifactStore::open(data_dir()?)?;
    let schedule = store.load_schedule()?.unwrap_or_default();
    let messages = upcoming(&schedule, now, args.minutes);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }
    if messages.is_empty() {
        println!("Nothing scheduled in the next {} minutes.", args.minutes);
    }
    for message in &messages {
        println!("{}  {}", message.minute, message.text);
    }
    Ok(())
}
