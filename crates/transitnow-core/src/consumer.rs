//! Per-minute emission of scheduled announcements.
//!
//! Invoked once a minute. Looks up the current minute's bucket and posts its
//! messages spread evenly over the first `spread` seconds, retrying transient
//! failures with exponential backoff while staying inside the minute budget.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::schedule::Schedule;
use crate::storage::{ArtifactStore, EmitConfig, Stamp};
use crate::time::MinuteKey;
use crate::transport::Transport;

/// Source of elapsed time and the only way the consumer blocks.
pub trait Pacer {
    /// Time since the run started.
    fn elapsed(&self) -> Duration;
    fn sleep(&mut self, duration: Duration);
}

/// Wall-clock pacer.
#[derive(Debug)]
pub struct RealPacer {
    started: Instant,
}

impl RealPacer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Pacer for RealPacer {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Offsets `i · spread / k` for `i = 0..k`.
pub fn emission_offsets(count: usize, spread: Duration) -> Vec<Duration> {
    if count == 0 {
        return Vec::new();
    }
    let step = spread.as_secs_f64() / count as f64;
    (0..count)
        .map(|i| Duration::from_secs_f64(step * i as f64))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPost {
    pub text: String,
    pub error: String,
    pub attempts: u32,
}

/// What one consumer run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmissionReport {
    pub minute: MinuteKey,
    pub due: usize,
    pub posted: usize,
    pub failed: Vec<FailedPost>,
    /// Elapsed time at which each message's first attempt started.
    pub offsets: Vec<Duration>,
}

#[derive(Debug, Clone, Copy)]
pub struct Consumer {
    spread: Duration,
    budget: Duration,
    max_attempts: u32,
    backoff: Duration,
}

impl Default for Consumer {
    fn default() -> Self {
        Self::from_config(&EmitConfig::default())
    }
}

impl Consumer {
    pub fn from_config(config: &EmitConfig) -> Self {
        Self {
            spread: Duration::from_secs(config.spread_secs),
            budget: Duration::from_secs(config.budget_secs),
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    /// Emit whatever is scheduled for the minute containing `now`.
    ///
    /// A missing or unreadable schedule is treated as empty. Transport
    /// failures are reported in the [`EmissionReport`], not returned.
    ///
    /// # Errors
    ///
    /// Fails only when a stamp file cannot be written.
    pub fn run<T, P>(
        &self,
        store: &ArtifactStore,
        now: DateTime<Utc>,
        transport: &mut T,
        pacer: &mut P,
    ) -> Result<EmissionReport>
    where
        T: Transport + ?Sized,
        P: Pacer + ?Sized,
    {
        store.write_stamp(Stamp::Checked, now)?;

        let schedule = match store.load_schedule() {
            Ok(Some(schedule)) => schedule,
            Ok(None) => {
                tracing::info!(
                    path = %store.schedule_path().display(),
                    "no schedule published yet"
                );
                Schedule::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "schedule unreadable, treating as empty");
                Schedule::default()
            }
        };

        let minute = MinuteKey::from_datetime(now);
        let mut report = EmissionReport {
            minute: minute.clone(),
            due: 0,
            posted: 0,
            failed: Vec::new(),
            offsets: Vec::new(),
        };

        let Some(messages) = schedule.lookup(&minute) else {
            tracing::debug!(%minute, "nothing scheduled");
            return Ok(report);
        };
        report.due = messages.len();
        tracing::info!(%minute, due = report.due, transport = transport.name(), "emitting");

        for (message, offset) in messages
            .iter()
            .zip(emission_offsets(messages.len(), self.spread))
        {
            let elapsed = pacer.elapsed();
            if elapsed < offset {
                pacer.sleep(offset - elapsed);
            }
            report.offsets.push(pacer.elapsed());
            match self.post_with_retry(message.as_str(), transport, pacer) {
                Ok(()) => report.posted += 1,
                Err(failed) => {
                    tracing::warn!(
                        minute = %report.minute,
                        attempts = failed.attempts,
                        error = %failed.error,
                        "giving up on message"
                    );
                    report.failed.push(failed);
                }
            }
        }

        if report.posted > 0 {
            store.write_stamp(Stamp::Posted, now)?;
        }
        tracing::info!(
            minute = %report.minute,
            posted = report.posted,
            failed = report.failed.len(),
            "emission finished"
        );
        Ok(report)
    }

    fn post_with_retry<T, P>(
        &self,
        text: &str,
        transport: &mut T,
        pacer: &mut P,
    ) -> std::result::Result<(), FailedPost>
    where
        T: Transport + ?Sized,
        P: Pacer + ?Sized,
    {
        let failed = |error: String, attempts: u32| FailedPost {
            text: text.to_string(),
            error,
            attempts,
        };
        let mut attempt = 1;
        loop {
            let remaining = self.budget.saturating_sub(pacer.elapsed());
            if remaining.is_zero() {
                return Err(failed("minute budget exhausted".into(), attempt - 1));
            }
            // The post itself may not outlive the budget either.
            let err = match transport.post_within(text, remaining) {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            if !err.retriable || attempt >= self.max_attempts {
                return Err(failed(err.to_string(), attempt));
            }
            let delay = self.backoff.saturating_mul(2u32.saturating_pow(attempt - 1));
            if pacer.elapsed() + delay >= self.budget {
                return Err(failed(format!("{err} (no time left to retry)"), attempt));
            }
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
            pacer.sleep(delay);
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::Announcement;
    use crate::error::TransportError;
    use chrono::TimeZone;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Clock(Rc<Cell<Duration>>);

    struct ManualPacer {
        clock: Clock,
        sleeps: Vec<Duration>,
    }

    impl ManualPacer {
        fn new(clock: &Clock) -> Self {
            Self {
                clock: clock.clone(),
                sleeps: Vec::new(),
            }
        }
    }

    impl Pacer for ManualPacer {
        fn elapsed(&self) -> Duration {
            self.clock.0.get()
        }

        fn sleep(&mut self, duration: Duration) {
            self.sleeps.push(duration);
            self.clock.0.set(self.clock.0.get() + duration);
        }
    }

    /// Records when each post happened; pops scripted failures first.
    struct Scripted {
        clock: Clock,
        failures: VecDeque<TransportError>,
        posts: Vec<(Duration, String)>,
        /// How long each post takes, cut short by the caller's limit.
        cost: Duration,
    }

    impl Scripted {
        fn new(clock: &Clock, failures: Vec<TransportError>) -> Self {
            Self {
                clock: clock.clone(),
                failures: failures.into(),
                posts: Vec::new(),
                cost: Duration::ZERO,
            }
        }
    }

    impl Transport for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn post(&mut self, text: &str) -> std::result::Result<(), TransportError> {
            self.posts.push((self.clock.0.get(), text.to_string()));
            match self.failures.pop_front() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        fn post_within(
            &mut self,
            text: &str,
            limit: Duration,
        ) -> std::result::Result<(), TransportError> {
            let result = self.post(text);
            self.clock.0.set(self.clock.0.get() + self.cost.min(limit));
            result
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn store_with(messages: &[&str]) -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let mut schedule = Schedule::new(now());
        for text in messages {
            schedule.push(
                MinuteKey::from_datetime(now()),
                Announcement::new(*text).unwrap(),
            );
        }
        store.save_schedule(&schedule).unwrap();
        (dir, store)
    }

    #[test]
    fn offsets_spread_evenly_from_zero() {
        let offsets = emission_offsets(3, Duration::from_secs(50));
        assert_eq!(offsets[0], Duration::ZERO);
        assert!((offsets[1].as_secs_f64() - 16.6667).abs() < 1e-3);
        assert!((offsets[2].as_secs_f64() - 33.3333).abs() < 1e-3);
        assert!(emission_offsets(0, Duration::from_secs(50)).is_empty());
        assert_eq!(emission_offsets(1, Duration::from_secs(50)), vec![Duration::ZERO]);
    }

    #[test]
    fn three_messages_post_at_expected_offsets() {
        let (_dir, store) = store_with(&["a", "b", "c"]);
        let clock = Clock::default();
        let mut pacer = ManualPacer::new(&clock);
        let mut transport = Scripted::new(&clock, vec![]);

        let report = Consumer::default()
            .run(&store, now() + chrono::Duration::seconds(7), &mut transport, &mut pacer)
            .unwrap();

        assert_eq!(report.due, 3);
        assert_eq!(report.posted, 3);
        let times: Vec<f64> = transport.posts.iter().map(|(t, _)| t.as_secs_f64()).collect();
        assert_eq!(times[0], 0.0);
        assert!((times[1] - 50.0 / 3.0).abs() < 1e-6);
        assert!((times[2] - 100.0 / 3.0).abs() < 1e-6);
        let texts: Vec<_> = transport.posts.iter().map(|(_, s)| s.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(
            report.offsets,
            transport.posts.iter().map(|(t, _)| *t).collect::<Vec<_>>()
        );
        assert!(store.read_stamp(Stamp::Posted).is_some());
    }

    #[test]
    fn empty_minute_is_a_noop_but_stamps_checked() {
        let (_dir, store) = store_with(&["a"]);
        let clock = Clock::default();
        let mut transport = Scripted::new(&clock, vec![]);
        let later = now() + chrono::Duration::minutes(1);

        let report = Consumer::default()
            .run(&store, later, &mut transport, &mut ManualPacer::new(&clock))
            .unwrap();

        assert_eq!(report.due, 0);
        assert!(transport.posts.is_empty());
        assert_eq!(store.read_stamp(Stamp::Checked), Some(later));
        assert!(store.read_stamp(Stamp::Posted).is_none());
    }

    #[test]
    fn missing_or_corrupt_schedule_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let clock = Clock::default();
        let mut transport = Scripted::new(&clock, vec![]);

        let report = Consumer::default()
            .run(&store, now(), &mut transport, &mut ManualPacer::new(&clock))
            .unwrap();
        assert_eq!(report.due, 0);

        std::fs::write(store.schedule_path(), "garbage").unwrap();
        let report = Consumer::default()
            .run(&store, now(), &mut transport, &mut ManualPacer::new(&clock))
            .unwrap();
        assert_eq!(report.due, 0);
        assert!(transport.posts.is_empty());
    }

    #[test]
    fn transient_failures_retry_with_backoff() {
        let (_dir, store) = store_with(&["a"]);
        let clock = Clock::default();
        let mut pacer = ManualPacer::new(&clock);
        let mut transport = Scripted::new(
            &clock,
            vec![
                TransportError::retriable("scripted", "busy"),
                TransportError::retriable("scripted", "busy"),
            ],
        );

        let report = Consumer::default()
            .run(&store, now(), &mut transport, &mut pacer)
            .unwrap();

        assert_eq!(report.posted, 1);
        let times: Vec<_> = transport.posts.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            times,
            vec![Duration::ZERO, Duration::from_secs(1), Duration::from_secs(3)]
        );
    }

    #[test]
    fn one_failure_does_not_block_the_rest() {
        let (_dir, store) = store_with(&["a", "b"]);
        let clock = Clock::default();
        let mut transport = Scripted::new(
            &clock,
            vec![TransportError::permanent("scripted", "rejected")],
        );

        let report = Consumer::default()
            .run(&store, now(), &mut transport, &mut ManualPacer::new(&clock))
            .unwrap();

        assert_eq!(report.posted, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].text, "a");
        assert_eq!(report.failed[0].attempts, 1);
        assert_eq!(transport.posts.len(), 2);
        assert!(store.read_stamp(Stamp::Posted).is_some());
    }

    #[test]
    fn retries_give_up_after_max_attempts() {
        let (_dir, store) = store_with(&["a"]);
        let clock = Clock::default();
        let failures = (0..5)
            .map(|_| TransportError::retriable("scripted", "down"))
            .collect();
        let mut transport = Scripted::new(&clock, failures);

        let report = Consumer::default()
            .run(&store, now(), &mut transport, &mut ManualPacer::new(&clock))
            .unwrap();

        assert_eq!(report.posted, 0);
        assert_eq!(report.failed[0].attempts, 3);
        assert_eq!(transport.posts.len(), 3);
        assert!(store.read_stamp(Stamp::Posted).is_none());
    }

    #[test]
    fn retry_never_crosses_the_budget() {
        let (_dir, store) = store_with(&["a"]);
        let clock = Clock::default();
        clock.0.set(Duration::from_millis(57_500));
        let mut pacer = ManualPacer::new(&clock);
        let mut transport = Scripted::new(
            &clock,
            vec![TransportError::retriable("scripted", "busy")],
        );

        let report = Consumer::default()
            .run(&store, now(), &mut transport, &mut pacer)
            .unwrap();

        assert_eq!(transport.posts.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert!(pacer.sleeps.is_empty());
    }

    #[test]
    fn slow_posts_stay_inside_the_budget() {
        let (_dir, store) = store_with(&["a", "b", "c"]);
        let clock = Clock::default();
        let failures = (0..9)
            .map(|_| TransportError::retriable("scripted", "timed out"))
            .collect();
        let mut transport = Scripted::new(&clock, failures);
        transport.cost = Duration::from_secs(10);

        let report = Consumer::default()
            .run(&store, now(), &mut transport, &mut ManualPacer::new(&clock))
            .unwrap();

        assert_eq!(clock.0.get(), Duration::from_secs(58));
        let starts: Vec<u64> = transport.posts.iter().map(|(t, _)| t.as_secs()).collect();
        assert_eq!(starts, vec![0, 11, 23, 33, 44, 56]);
        assert_eq!(report.posted, 0);
        assert_eq!(report.failed.len(), 3);
        assert_eq!(report.failed[1].attempts, 3);
        assert_eq!(report.failed[2].text, "c");
        assert_eq!(report.failed[2].attempts, 0);
    }
}
