//! Minute-indexed schedule of announcements.
//!
//! The builder fills a [`Schedule`] once per run; the consumer and the
//! lookahead query only read it. A bucket exists only while it holds at
//! least one announcement, and messages keep their discovery order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::composer::Announcement;
use crate::time::MinuteKey;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScheduleFile")]
pub struct Schedule {
    built_at: Option<DateTime<Utc>>,
    entries: BTreeMap<MinuteKey, Vec<Announcement>>,
}

/// On-disk shape; empty buckets are dropped when converting.
#[derive(Deserialize)]
struct ScheduleFile {
    #[serde(default)]
    built_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: BTreeMap<MinuteKey, Vec<Announcement>>,
}

impl From<ScheduleFile> for Schedule {
    fn from(file: ScheduleFile) -> Self {
        let mut entries = file.entries;
        entries.retain(|_, messages| !messages.is_empty());
        Self {
            built_at: file.built_at,
            entries,
        }
    }
}

impl Schedule {
    pub fn new(built_at: DateTime<Utc>) -> Self {
        Self {
            built_at: Some(built_at),
            entries: BTreeMap::new(),
        }
    }

    /// Append to the bucket for `minute`, creating it if needed.
    pub fn push(&mut self, minute: MinuteKey, message: Announcement) {
        self.entries.entry(minute).or_default().push(message);
    }

    /// Messages scheduled for `minute`, or `None` when nothing is due.
    pub fn lookup(&self, minute: &MinuteKey) -> Option<&[Announcement]> {
        self.entries.get(minute).map(Vec::as_slice)
    }

    /// Buckets with `from <= key < to`, chronological.
    pub fn range<'a>(
        &'a self,
        from: &MinuteKey,
        to: &MinuteKey,
    ) -> impl Iterator<Item = (&'a MinuteKey, &'a [Announcement])> + 'a {
        let bounds = if from < to {
            Some((from.clone(), to.clone()))
        } else {
            None
        };
        bounds
            .into_iter()
            .flat_map(move |(from, to)| self.entries.range(from..to))
            .map(|(k, v)| (k, v.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MinuteKey, &[Announcement])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    /// Number of minute buckets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn message_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key(h: u32, m: u32) -> MinuteKey {
        MinuteKey::from_datetime(Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap())
    }

    fn msg(text: &str) -> Announcement {
        Announcement::new(text).unwrap()
    }

    #[test]
    fn push_keeps_discovery_order_within_bucket() {
        let mut schedule = Schedule::default();
        schedule.push(key(3, 10), msg("b"));
        schedule.push(key(3, 10), msg("a"));
        schedule.push(key(1, 0), msg("c"));

        assert_eq!(schedule.lookup(&key(3, 10)).unwrap(), &[msg("b"), msg("a")]);
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.message_count(), 3);
        let keys: Vec<_> = schedule.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![key(1, 0), key(3, 10)]);
    }

    #[test]
    fn lookup_of_missing_minute_is_none() {
        let schedule = Schedule::default();
        assert!(schedule.lookup(&key(0, 0)).is_none());
    }

    #[test]
    fn range_is_half_open() {
        let mut schedule = Schedule::default();
        for m in [0, 5, 10] {
            schedule.push(key(2, m), msg(&format!("m{m}")));
        }
        let hits: Vec<_> = schedule
            .range(&key(2, 0), &key(2, 10))
            .map(|(k, _)| k.clone())
            .collect();
        assert_eq!(hits, vec![key(2, 0), key(2, 5)]);
        assert_eq!(schedule.range(&key(2, 10), &key(2, 0)).count(), 0);
    }

    #[test]
    fn deserialize_drops_empty_buckets() {
        let json = r#"{"built_at":null,"entries":{"2024-05-01 02:00":[],"2024-05-01 02:01":["x"]}}"#;
        let schedule: Schedule = serde_json::from_str(json).unwrap();
        assert_eq!(schedule.len(), 1);
        assert!(schedule.lookup(&key(2, 0)).is_none());
    }

    #[test]
    fn json_roundtrip_preserves_contents() {
        let mut schedule = Schedule::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        schedule.push(key(4, 4), msg("hello"));
        let json = serde_json::to_string(&schedule).unwrap();
        let back: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schedule);
    }
}
