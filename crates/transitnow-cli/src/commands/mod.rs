pub mod build;
pub mod catalog;
pub mod config;
pub mod emit;
pub mod upcoming;

use chrono::{DateTime, Utc};

/// `--now` override (RFC 3339), or the current time.
pub fn resolve_now(now: Option<&str>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match now {
        Some(text) => Ok(DateTime::parse_from_rfc3339(text)
            .map_err(|e| format!("invalid --now '{text}': {e}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}
