//! Daily schedule build: catalog → transits → announcements → minute buckets.
//!
//! A build never aborts because of one planet. Planets with unusable data are
//! reported as [`PlanetFailure`]s and events whose announcement cannot fit
//! the length bound are counted as dropped.

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, PlanetRecord};
use crate::composer::{Announcement, Composer, EventDetails};
use crate::constellation::{ConstellationResolver, Equatorial};
use crate::error::{CoreError, Result};
use crate::predictor::{TransitPredictor, TransitWindow};
use crate::schedule::Schedule;
use crate::storage::{ArtifactStore, BuildConfig, Stamp};
use crate::time::{JulianDate, MinuteKey};

/// A planet that contributed nothing because its data was unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetFailure {
    pub planet: String,
    pub reason: String,
}

/// Result of one build, ready to publish.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub built_at: DateTime<Utc>,
    pub schedule: Schedule,
    /// Every message in discovery order.
    pub audit: Vec<Announcement>,
    pub failures: Vec<PlanetFailure>,
    /// Events whose announcement exceeded the length bound.
    pub dropped: usize,
    /// Planets considered (transiting with a known epoch).
    pub planets: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduleBuilder {
    predictor: TransitPredictor,
    composer: Composer,
    lookahead_days: f64,
}

impl Default for ScheduleBuilder {
    fn default() -> Self {
        Self::from_config(&BuildConfig::default())
    }
}

impl ScheduleBuilder {
    pub fn new(predictor: TransitPredictor, lookahead_days: f64) -> Self {
        Self {
            predictor,
            composer: Composer::new(),
            lookahead_days,
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(
            TransitPredictor::with_max_epochs(config.max_epochs),
            config.lookahead_days,
        )
    }

    pub fn lookahead_days(&self) -> f64 {
        self.lookahead_days
    }

    /// Build the schedule for `(now, now + lookahead_days)`.
    ///
    /// # Errors
    ///
    /// Fails only when the window itself is invalid (non-positive lookahead).
    pub fn build<C, R>(
        &self,
        catalog: &Catalog,
        now: DateTime<Utc>,
        resolver: &C,
        rng: &mut R,
    ) -> Result<BuildOutcome>
    where
        C: ConstellationResolver + ?Sized,
        R: Rng + ?Sized,
    {
        let window =
            TransitWindow::from_start(JulianDate::from_datetime(now), self.lookahead_days)?;
        let mut outcome = BuildOutcome {
            built_at: now,
            schedule: Schedule::new(now),
            audit: Vec::new(),
            failures: Vec::new(),
            dropped: 0,
            planets: 0,
        };

        for planet in catalog.schedulable() {
            outcome.planets += 1;
            if let Err(e) = self.schedule_planet(planet, &window, resolver, rng, &mut outcome) {
                tracing::warn!(planet = %planet.name, error = %e, "skipping planet");
                outcome.failures.push(PlanetFailure {
                    planet: planet.name.clone(),
                    reason: e.to_string(),
                });
            }
        }

        tracing::info!(
            planets = outcome.planets,
            minutes = outcome.schedule.len(),
            messages = outcome.audit.len(),
            failures = outcome.failures.len(),
            dropped = outcome.dropped,
            "schedule built"
        );
        Ok(outcome)
    }

    fn schedule_planet<C, R>(
        &self,
        planet: &PlanetRecord,
        window: &TransitWindow,
        resolver: &C,
        rng: &mut R,
        outcome: &mut BuildOutcome,
    ) -> Result<()>
    where
        C: ConstellationResolver + ?Sized,
        R: Rng + ?Sized,
    {
        let epoch = planet
            .epoch
            .ok_or_else(|| CoreError::Custom("missing transit epoch".into()))?;
        let period = planet
            .period
            .ok_or_else(|| CoreError::Custom("missing orbital period".into()))?;

        let transits = self
            .predictor
            .mid_transits(JulianDate::new(epoch), period, window)?;
        if transits.is_empty() {
            return Ok(());
        }

        let (ra, dec) = planet
            .ra
            .as_deref()
            .zip(planet.dec.as_deref())
            .ok_or_else(|| CoreError::Custom("missing coordinates".into()))?;
        let constellation = resolver.resolve(&Equatorial::parse(ra, dec)?)?;

        let details = EventDetails {
            planet: &planet.name,
            constellation: &constellation,
            radius: planet.radius,
            period,
            distance: planet.distance,
            effective_temperature: planet.effective_temperature,
            semimajor_axis: planet.semimajor_axis,
        };

        for transit in transits {
            let minute = MinuteKey::from_julian(transit)?;
            match self.composer.compose(&details, rng)? {
                Some(message) => {
                    tracing::debug!(planet = %planet.name, %minute, "scheduled");
                    outcome.schedule.push(minute, message.clone());
                    outcome.audit.push(message);
                }
                None => {
                    tracing::debug!(
                        planet = %planet.name,
                        %minute,
                        "announcement too long, dropped"
                    );
                    outcome.dropped += 1;
                }
            }
        }
        Ok(())
    }
}

/// RNG for variant selection: seeded for reproducible builds, else entropy.
pub fn seeded_rng(seed: Option<u64>) -> Mcg128Xsl64 {
    match seed {
        Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
        None => Mcg128Xsl64::from_entropy(),
    }
}

/// Publish a build: the schedule (atomically), the audit list and the
/// last-build stamp.
pub fn publish(outcome: &BuildOutcome, store: &ArtifactStore) -> Result<()> {
    store.save_schedule(&outcome.schedule)?;
    store.write_audit(&outcome.audit)?;
    store.write_stamp(Stamp::Build, outcome.built_at)?;
    tracing::info!(
        path = %store.schedule_path().display(),
        minutes = outcome.schedule.len(),
        "schedule published"
    );
    Ok(())
}
