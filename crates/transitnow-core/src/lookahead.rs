//! Upcoming-message query over a published schedule.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::schedule::Schedule;
use crate::time::MinuteKey;

pub const DEFAULT_LOOKAHEAD_MINUTES: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingMessage {
    pub minute: MinuteKey,
    pub text: String,
}

/// Messages due in `[now, now + minutes)`, chronological, bucket order kept.
pub fn upcoming(schedule: &Schedule, now: DateTime<Utc>, minutes: u32) -> Vec<UpcomingMessage> {
    let from = MinuteKey::from_datetime(now);
    let to = MinuteKey::from_datetime(now + Duration::minutes(i64::from(minutes)));
    schedule
        .range(&from, &to)
        .flat_map(|(minute, messages)| {
            messages.iter().map(move |m| UpcomingMessage {
                minute: minute.clone(),
                text: m.as_str().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::Announcement;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
    }

    fn schedule() -> Schedule {
        let mut s = Schedule::new(at(0, 0));
        for (h, m, text) in [
            (10, 20, "late"),
            (10, 0, "first"),
            (10, 0, "second"),
            (10, 14, "edge"),
            (10, 15, "out"),
        ] {
            s.push(MinuteKey::from_datetime(at(h, m)), Announcement::new(text).unwrap());
        }
        s
    }

    #[test]
    fn returns_window_in_order() {
        let now = at(10, 0) + Duration::seconds(30);
        let texts: Vec<_> = upcoming(&schedule(), now, 15)
            .into_iter()
            .map(|u| u.text)
            .collect();
        assert_eq!(texts, vec!["first", "second", "edge"]);
    }

    #[test]
    fn zero_minutes_is_empty() {
        assert!(upcoming(&schedule(), at(10, 0), 0).is_empty());
    }

    #[test]
    fn past_minutes_are_excluded() {
        let hits = upcoming(&schedule(), at(10, 1), 30);
        let minutes: Vec<_> = hits.iter().map(|u| u.minute.as_str().to_string()).collect();
        assert_eq!(minutes, vec!["2024-05-01 10:14", "2024-05-01 10:15", "2024-05-01 10:20"]);
    }
}
