//! Local catalog freshness and download.
//!
//! The catalog is re-downloaded when the local copy is missing or older than
//! `max_age_days`. Downloads are written atomically so a half-finished
//! transfer never replaces a good file.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;

use crate::error::{CatalogError, Result};
use crate::storage::write_atomic;

/// Outcome of [`refresh_catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    /// A new copy was downloaded (bytes written).
    Downloaded(usize),
    /// The local copy is younger than the threshold and was kept.
    Fresh { age_days: i64 },
}

/// True when a file modified at `modified` is older than `max_age_days` at `now`.
pub fn is_stale(modified: DateTime<Utc>, now: DateTime<Utc>, max_age_days: u32) -> bool {
    now - modified > Duration::days(i64::from(max_age_days))
}

/// Download `url` into `path`, replacing it atomically.
pub async fn download_file(client: &Client, url: &str, path: &Path) -> Result<usize> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(CatalogError::Download {
            url: url.to_string(),
            status: status.as_u16(),
        }
        .into());
    }
    let body = resp.bytes().await?;
    write_atomic(path, &body)?;
    tracing::info!(url, path = %path.display(), bytes = body.len(), "downloaded");
    Ok(body.len())
}

/// Ensure `path` holds a catalog no older than `max_age_days`.
pub async fn refresh_catalog(
    client: &Client,
    url: &str,
    path: &Path,
    max_age_days: u32,
    now: DateTime<Utc>,
) -> Result<RefreshStatus> {
    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => {
            let modified = DateTime::<Utc>::from(modified);
            if !is_stale(modified, now, max_age_days) {
                let age_days = (now - modified).num_days();
                tracing::info!(
                    age_days,
                    max_age_days,
                    "local catalog is less than {max_age_days} days old, keeping it"
                );
                return Ok(RefreshStatus::Fresh { age_days });
            }
            tracing::info!(
                max_age_days,
                "local catalog is more than {max_age_days} days old, downloading a fresh copy"
            );
        }
        Err(_) => tracing::info!(path = %path.display(), "no local catalog, downloading one"),
    }
    let bytes = download_file(client, url, path).await?;
    Ok(RefreshStatus::Downloaded(bytes))
}
