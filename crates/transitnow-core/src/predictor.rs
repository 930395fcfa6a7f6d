//! Mid-transit prediction from a reference epoch and orbital period.
//!
//! Candidate epochs are `Tc + n·P` for `n = 0..max_epochs`; only those
//! strictly inside the open window `(start, end)` are kept. With `P > 0` the
//! result is already in ascending order.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::JulianDate;

/// Default epoch-count bound. At a 2 day period this covers ~14 years.
pub const DEFAULT_MAX_EPOCHS: u32 = 2500;

/// Open interval of Julian dates over which transits are predicted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitWindow {
    start: JulianDate,
    end: JulianDate,
}

impl TransitWindow {
    /// Create a window. `start` must be strictly before `end`.
    pub fn new(start: JulianDate, end: JulianDate) -> Result<Self, ValidationError> {
        if !start.value().is_finite() || !end.value().is_finite() || start >= end {
            return Err(ValidationError::InvalidTimeRange {
                start: start.value(),
                end: end.value(),
            });
        }
        Ok(Self { start, end })
    }

    /// Window starting at `start` and lasting `days`.
    pub fn from_start(start: JulianDate, days: f64) -> Result<Self, ValidationError> {
        Self::new(start, start.add_days(days))
    }

    pub fn start(&self) -> JulianDate {
        self.start
    }

    pub fn end(&self) -> JulianDate {
        self.end
    }

    /// True when `jd` lies strictly inside the window.
    pub fn contains(&self, jd: JulianDate) -> bool {
        self.start < jd && jd < self.end
    }
}

/// Enumerates mid-transit times inside a window.
#[derive(Debug, Clone, Copy)]
pub struct TransitPredictor {
    max_epochs: u32,
}

impl Default for TransitPredictor {
    fn default() -> Self {
        Self {
            max_epochs: DEFAULT_MAX_EPOCHS,
        }
    }
}

impl TransitPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_epochs(max_epochs: u32) -> Self {
        Self { max_epochs }
    }

    pub fn max_epochs(&self) -> u32 {
        self.max_epochs
    }

    /// All mid-transit times `Tc + n·P` inside `window`, ascending.
    ///
    /// # Errors
    ///
    /// Fails when the period is not a positive finite number or the epoch is
    /// not finite.
    pub fn mid_transits(
        &self,
        epoch: JulianDate,
        period_days: f64,
        window: &TransitWindow,
    ) -> Result<Vec<JulianDate>, ValidationError> {
        if !period_days.is_finite() || period_days <= 0.0 {
            return Err(ValidationError::invalid(
                "period",
                format!("must be a positive number of days, got {period_days}"),
            ));
        }
        if !epoch.value().is_finite() {
            return Err(ValidationError::invalid("epoch", "must be finite"));
        }

        let transits: Vec<JulianDate> = (0..self.max_epochs)
            .map(|n| epoch.add_days(f64::from(n) * period_days))
            .filter(|t| window.contains(*t))
            .collect();

        if self.max_epochs > 0 {
            let last = epoch.add_days(f64::from(self.max_epochs - 1) * period_days);
            if last < window.end() {
                tracing::debug!(
                    epoch = epoch.value(),
                    period_days,
                    max_epochs = self.max_epochs,
                    "epoch bound ends before the window; transits may be under-reported"
                );
            }
        }

        Ok(transits)
    }
}
