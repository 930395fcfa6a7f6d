//! Announcement composer.
//!
//! Turns one transit event plus its enrichment fields into a single message of
//! at most [`MAX_ANNOUNCEMENT_CHARS`] characters. Five template variants are
//! rendered from the available clauses and a tiered cascade picks one,
//! randomising among equally acceptable variants with an injected RNG.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Hard upper bound on the length of an announcement, in characters.
pub const MAX_ANNOUNCEMENT_CHARS: usize = 140;

/// Earth equatorial radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;
/// Jupiter equatorial radius in meters.
pub const JUPITER_RADIUS_M: f64 = 69_911_000.0;
pub const LIGHT_YEARS_PER_PARSEC: f64 = 3.262;
/// Effective temperature of the Sun in Kelvin.
pub const SUN_TEFF_K: f64 = 5780.0;
pub const MERCURY_AXIS_AU: f64 = 0.387;
pub const EARTH_AXIS_AU: f64 = 1.0;

/// A finalized message, guaranteed to fit the length bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Announcement(String);

impl Announcement {
    /// Wrap `text`, or `None` when it exceeds the bound.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (text.chars().count() <= MAX_ANNOUNCEMENT_CHARS).then_some(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl TryFrom<String> for Announcement {
    type Error = ValidationError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        let len = text.chars().count();
        Self::new(text).ok_or_else(|| {
            ValidationError::invalid(
                "announcement",
                format!("{len} characters exceeds the {MAX_ANNOUNCEMENT_CHARS} character bound"),
            )
        })
    }
}

impl From<Announcement> for String {
    fn from(a: Announcement) -> Self {
        a.0
    }
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the composer needs to know about one transit.
#[derive(Debug, Clone)]
pub struct EventDetails<'a> {
    pub planet: &'a str,
    pub constellation: &'a str,
    /// Radius in Jupiter radii.
    pub radius: Option<f64>,
    /// Orbital period in days.
    pub period: f64,
    /// Distance in parsecs.
    pub distance: Option<f64>,
    /// Host star effective temperature in Kelvin.
    pub effective_temperature: Option<f64>,
    /// Semimajor axis in AU.
    pub semimajor_axis: Option<f64>,
}

/// Optional enrichment a variant draws on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalField {
    Distance,
    Temperature,
    Axis,
}

/// Template variants, from plain to richest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Constellation, size and period.
    Base,
    /// Base plus distance.
    Distance,
    /// Distance, size and host star temperature.
    DistanceTemperature,
    /// Distance, size and orbit comparison.
    DistanceAxis,
    /// Constellation, size and orbit comparison.
    Axis,
}

impl Variant {
    pub fn fields(&self) -> &'static [OptionalField] {
        match self {
            Variant::Base => &[],
            Variant::Distance => &[OptionalField::Distance],
            Variant::DistanceTemperature => &[OptionalField::Distance, OptionalField::Temperature],
            Variant::DistanceAxis => &[OptionalField::Distance, OptionalField::Axis],
            Variant::Axis => &[OptionalField::Axis],
        }
    }

    /// Render this variant, or `None` if a clause it needs is unavailable.
    fn render(&self, c: &Clauses) -> Option<String> {
        let text = match self {
            Variant::Base => format!(
                "{} {}. It's {} and {}.",
                c.planet, c.constellation, c.size, c.period
            ),
            Variant::Distance => format!(
                "{} {} {}. It's {} and {}.",
                c.planet,
                c.distance.as_deref()?,
                c.constellation,
                c.size,
                c.period
            ),
            Variant::DistanceTemperature => format!(
                "{} {} {}. It's {} and its {}.",
                c.planet,
                c.distance.as_deref()?,
                c.constellation,
                c.size,
                c.temperature.as_deref()?
            ),
            Variant::DistanceAxis => format!(
                "{} {} {}. It's {} and {}.",
                c.planet,
                c.distance.as_deref()?,
                c.constellation,
                c.size,
                c.axis.as_deref()?
            ),
            Variant::Axis => format!(
                "{} {}. It's {} and {}.",
                c.planet,
                c.constellation,
                c.size,
                c.axis.as_deref()?
            ),
        };
        Some(text)
    }
}

/// One rendered variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub variant: Variant,
    /// Optional fields the text draws on.
    pub fields: &'static [OptionalField],
    pub text: String,
    pub len: usize,
}

impl Candidate {
    fn new(variant: Variant, text: String) -> Self {
        let len = text.chars().count();
        Self {
            variant,
            fields: variant.fields(),
            text,
            len,
        }
    }

    pub fn fits(&self) -> bool {
        self.len <= MAX_ANNOUNCEMENT_CHARS
    }
}

/// Sentence fragments derived from [`EventDetails`].
#[derive(Debug, Clone)]
struct Clauses {
    planet: String,
    constellation: String,
    size: String,
    period: String,
    distance: Option<String>,
    temperature: Option<String>,
    axis: Option<String>,
}

impl Clauses {
    fn derive(details: &EventDetails<'_>) -> Result<Self, ValidationError> {
        let radius = details
            .radius
            .ok_or_else(|| ValidationError::invalid("radius", "missing"))?;
        let radius = positive("radius", radius)?;
        let period = positive("period", details.period)?;

        Ok(Self {
            planet: format!("{} is transiting now", details.planet),
            constellation: format!("in {}", details.constellation),
            size: size_clause(radius),
            period: format!("transits again in {period:.1} days"),
            distance: details
                .distance
                .map(|d| positive("distance", d))
                .transpose()?
                .map(|d| format!("{} ly away", (d * LIGHT_YEARS_PER_PARSEC) as i64)),
            temperature: details
                .effective_temperature
                .map(|t| positive("effective_temperature", t))
                .transpose()?
                .and_then(temperature_clause),
            axis: details
                .semimajor_axis
                .map(|a| positive("semimajor_axis", a))
                .transpose()?
                .and_then(axis_clause),
        })
    }
}

fn positive(field: &str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::invalid(
            field,
            format!("expected a positive number, got {value}"),
        ))
    }
}

fn size_clause(radius_jupiter: f64) -> String {
    let earth_ratio = EARTH_RADIUS_M / JUPITER_RADIUS_M;
    let in_earth_radii = radius_jupiter * JUPITER_RADIUS_M / EARTH_RADIUS_M;
    if radius_jupiter > 1.0 {
        format!("{radius_jupiter:.1}x larger than Jupiter")
    } else if radius_jupiter > earth_ratio {
        format!("{in_earth_radii:.1}x larger than Earth")
    } else {
        format!("{in_earth_radii:.1}x the size of Earth")
    }
}

fn temperature_clause(teff: f64) -> Option<String> {
    if teff < SUN_TEFF_K {
        Some(format!(
            "star is {} degrees C cooler than the Sun",
            (SUN_TEFF_K - teff) as i64
        ))
    } else if teff > SUN_TEFF_K {
        Some(format!(
            "star is {} degrees C hotter than the Sun",
            (teff - SUN_TEFF_K) as i64
        ))
    } else {
        None
    }
}

// Orbits at or beyond Earth's get no comparison.
fn axis_clause(axis_au: f64) -> Option<String> {
    if axis_au < MERCURY_AXIS_AU {
        Some(format!(
            "orbits its star {:.1}x closer than Mercury orbits the Sun",
            MERCURY_AXIS_AU / axis_au
        ))
    } else if axis_au < EARTH_AXIS_AU {
        Some(format!(
            "orbits its star {:.1}x closer than Earth orbits the Sun",
            EARTH_AXIS_AU / axis_au
        ))
    } else {
        None
    }
}

/// Stateless composer; randomness comes from the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct Composer;

impl Composer {
    pub fn new() -> Self {
        Self
    }

    /// Render every variant whose clauses are available.
    pub fn candidates(
        &self,
        details: &EventDetails<'_>,
    ) -> Result<Vec<Candidate>, ValidationError> {
        let clauses = Clauses::derive(details)?;
        Ok([
            Variant::Base,
            Variant::Distance,
            Variant::DistanceTemperature,
            Variant::DistanceAxis,
            Variant::Axis,
        ]
        .into_iter()
        .filter_map(|v| v.render(&clauses).map(|text| Candidate::new(v, text)))
        .collect())
    }

    /// Run the selection cascade. `Ok(None)` means even the chosen variant
    /// exceeds the bound and the event is dropped.
    pub fn select<R: Rng + ?Sized>(
        &self,
        details: &EventDetails<'_>,
        rng: &mut R,
    ) -> Result<Option<Candidate>, ValidationError> {
        let candidates = self.candidates(details)?;
        let fitting = |v: Variant| candidates.iter().find(|c| c.variant == v && c.fits());
        let all_fit = |vs: &[Variant]| -> Option<Vec<&Candidate>> {
            vs.iter().map(|v| fitting(*v)).collect()
        };

        let chosen = if let Some(pool) = all_fit(&[
            Variant::Distance,
            Variant::DistanceTemperature,
            Variant::DistanceAxis,
        ]) {
            pool.choose(rng).copied()
        } else if let Some(pool) = all_fit(&[
            Variant::Distance,
            Variant::Base,
            Variant::DistanceTemperature,
        ]) {
            pool.choose(rng).copied()
        } else if let Some(distance) = fitting(Variant::Distance) {
            Some(distance)
        } else if let Some(pool) = all_fit(&[Variant::Base, Variant::Axis]) {
            pool.choose(rng).copied()
        } else {
            candidates.iter().find(|c| c.variant == Variant::Base)
        };

        Ok(chosen.filter(|c| c.fits()).cloned())
    }

    /// Compose the finalized announcement for one event.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        details: &EventDetails<'_>,
        rng: &mut R,
    ) -> Result<Option<Announcement>, ValidationError> {
        Ok(self
            .select(details, rng)?
            .and_then(|candidate| Announcement::new(candidate.text)))
    }
}
