//! Append-only JSONL outbox, one record per posted message.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Transport;
use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub posted_at: DateTime<Utc>,
    pub text: String,
}

pub struct OutboxTransport {
    path: PathBuf,
}

impl OutboxTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every record; a missing file is an empty outbox.
    pub fn read_all(path: &Path) -> std::io::Result<Vec<OutboxRecord>> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect())
    }

    fn append(&self, record: &OutboxRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

impl Transport for OutboxTransport {
    fn name(&self) -> &str {
        "outbox"
    }

    fn post(&mut self, text: &str) -> Result<(), TransportError> {
        let record = OutboxRecord {
            posted_at: Utc::now(),
            text: text.to_string(),
        };
        self.append(&record)
            .map_err(|e| TransportError::retriable("outbox", e.to_string()))
    }
}
