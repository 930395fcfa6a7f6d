//! Files shared between the daily build and the per-minute consumer.
//!
//! - `schedule.json`: the published [`Schedule`], replaced atomically
//! - `events.txt`: flat audit list of every message from the last build
//! - `last_build.txt`, `last_checked.txt`, `last_posted.txt`: timestamps

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::composer::Announcement;
use crate::error::Result;
use crate::schedule::Schedule;

use super::write_atomic;

const SCHEDULE_FILE: &str = "schedule.json";
const AUDIT_FILE: &str = "events.txt";

/// Timestamp records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    /// Written after a schedule is published.
    Build,
    /// Written on every consumer invocation.
    Checked,
    /// Written when at least one message was posted.
    Posted,
}

impl Stamp {
    fn file_name(&self) -> &'static str {
        match self {
            Stamp::Build => "last_build.txt",
            Stamp::Checked => "last_checked.txt",
            Stamp::Posted => "last_posted.txt",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Stamp::Build => "Last updated event list",
            Stamp::Checked => "Last checked",
            Stamp::Posted => "Last posted",
        }
    }
}

/// Directory holding the build and consumer artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open (and create) the artifact directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn schedule_path(&self) -> PathBuf {
        self.dir.join(SCHEDULE_FILE)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.dir.join(AUDIT_FILE)
    }

    pub fn stamp_path(&self, stamp: Stamp) -> PathBuf {
        self.dir.join(stamp.file_name())
    }

    /// Publish `schedule`, replacing the previous one atomically.
    pub fn save_schedule(&self, schedule: &Schedule) -> Result<()> {
        let json = serde_json::to_vec_pretty(schedule)?;
        write_atomic(&self.schedule_path(), &json)?;
        Ok(())
    }

    /// Load the published schedule; `Ok(None)` if nothing was published yet.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load_schedule(&self) -> Result<Option<Schedule>> {
        let path = self.schedule_path();
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    /// Rewrite the audit list, one message per line.
    pub fn write_audit(&self, messages: &[Announcement]) -> Result<()> {
        let mut text = String::new();
        for message in messages {
            text.push_str(message.as_str());
            text.push('\n');
        }
        write_atomic(&self.audit_path(), text.as_bytes())?;
        Ok(())
    }

    pub fn write_stamp(&self, stamp: Stamp, at: DateTime<Utc>) -> Result<()> {
        let line = format!("{}: {}\n", stamp.label(), at.to_rfc3339());
        write_atomic(&self.stamp_path(stamp), line.as_bytes())?;
        Ok(())
    }

    /// Read a timestamp record; `None` if absent or unreadable.
    pub fn read_stamp(&self, stamp: Stamp) -> Option<DateTime<Utc>> {
        let text = std::fs::read_to_string(self.stamp_path(stamp)).ok()?;
        let (_, value) = text.trim().split_once(": ")?;
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
