//! Planet catalog ingestion.
//!
//! Parses the exoplanets.org CSV export into an immutable [`Catalog`]. The
//! header row names the columns; rows that cannot be read are skipped
//! individually and reported in [`Catalog::skipped`] so a single bad line
//! never stops a build.

pub mod refresh;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

pub use refresh::{download_file, is_stale, refresh_catalog, RefreshStatus};

/// One planet as read from the catalog. Absent values are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetRecord {
    pub name: String,
    pub transiting: bool,
    /// Reference mid-transit epoch (JD).
    pub epoch: Option<f64>,
    /// Orbital period in days.
    pub period: Option<f64>,
    /// Right ascension, sexagesimal hours.
    pub ra: Option<String>,
    /// Declination, sexagesimal degrees.
    pub dec: Option<String>,
    /// Radius in Jupiter radii.
    pub radius: Option<f64>,
    /// Distance in parsecs.
    pub distance: Option<f64>,
    /// Host star effective temperature in Kelvin.
    pub effective_temperature: Option<f64>,
    /// Semimajor axis in AU.
    pub semimajor_axis: Option<f64>,
}

impl PlanetRecord {
    /// Planets the schedule builder considers: flagged as transiting with a
    /// known reference epoch.
    pub fn is_schedulable(&self) -> bool {
        self.transiting && self.epoch.is_some()
    }
}

/// A catalog row that was not ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    /// 1-based line number in the source text.
    pub line: usize,
    pub reason: String,
}

/// Parsed catalog in file order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    planets: Vec<PlanetRecord>,
    skipped: Vec<SkippedRow>,
}

const NAME: &str = "NAME";
const TRANSIT: &str = "TRANSIT";

impl Catalog {
    pub fn from_records(planets: Vec<PlanetRecord>) -> Self {
        Self {
            planets,
            skipped: Vec::new(),
        }
    }

    /// Read and parse a catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::parse(&text)?;
        tracing::info!(
            path = %path.display(),
            planets = catalog.planets.len(),
            skipped = catalog.skipped.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    /// Parse CSV text.
    ///
    /// # Errors
    ///
    /// Fails only when the header is missing or lacks `NAME` / `TRANSIT`;
    /// bad data rows are skipped instead.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let mut lines = text.lines().enumerate();
        let header = loop {
            match lines.next() {
                Some((_, line)) if line.trim().is_empty() => continue,
                Some((_, line)) => break split_fields(line),
                None => return Err(CatalogError::Empty),
            }
        };
        let columns: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_uppercase(), i))
            .collect();
        for required in [NAME, TRANSIT] {
            if !columns.contains_key(required) {
                return Err(CatalogError::MissingColumn(required.to_string()));
            }
        }

        let mut catalog = Catalog::default();
        let mut seen = HashSet::new();
        for (index, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let line_no = index + 1;
            let fields = split_fields(line);
            if fields.len() != header.len() {
                catalog.skip(
                    line_no,
                    format!("expected {} fields, found {}", header.len(), fields.len()),
                );
                continue;
            }
            let row = Row {
                fields: &fields,
                columns: &columns,
            };
            match row.to_record() {
                Ok(record) if !seen.insert(record.name.clone()) => {
                    catalog.skip(line_no, format!("duplicate planet name '{}'", record.name));
                }
                Ok(record) => catalog.planets.push(record),
                Err(reason) => catalog.skip(line_no, reason),
            }
        }
        Ok(catalog)
    }

    fn skip(&mut self, line: usize, reason: String) {
        tracing::debug!(line, %reason, "skipping catalog row");
        self.skipped.push(SkippedRow { line, reason });
    }

    pub fn planets(&self) -> &[PlanetRecord] {
        &self.planets
    }

    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    pub fn get(&self, name: &str) -> Option<&PlanetRecord> {
        self.planets.iter().find(|p| p.name == name)
    }

    /// Planets flagged as transiting with a reference epoch, in catalog order.
    pub fn schedulable(&self) -> impl Iterator<Item = &PlanetRecord> {
        self.planets.iter().filter(|p| p.is_schedulable())
    }

    pub fn len(&self) -> usize {
        self.planets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planets.is_empty()
    }
}

struct Row<'a> {
    fields: &'a [String],
    columns: &'a HashMap<String, usize>,
}

impl Row<'_> {
    /// Raw text of the first present column among `names`, `None` if empty.
    fn text(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .find_map(|n| self.columns.get(*n))
            .map(|&i| self.fields[i].trim())
            .filter(|v| !v.is_empty())
    }

    fn number(&self, name: &str) -> Result<Option<f64>, String> {
        match self.text(&[name]) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| format!("column {name}: '{raw}' is not a number")),
        }
    }

    fn to_record(&self) -> Result<PlanetRecord, String> {
        let name = self
            .text(&[NAME])
            .ok_or_else(|| "missing planet name".to_string())?
            .to_string();
        Ok(PlanetRecord {
            transiting: self.text(&[TRANSIT]) == Some("1"),
            epoch: self.number("TT")?,
            period: self.number("PER")?,
            ra: self.text(&["RA_STRING", "RA"]).map(str::to_string),
            dec: self.text(&["DEC_STRING", "DEC"]).map(str::to_string),
            radius: self.number("R")?,
            distance: self.number("DIST")?,
            effective_temperature: self.number("TEFF")?,
            semimajor_axis: self.number("A")?,
            name,
        })
    }
}

/// Split one CSV line, honouring double-quoted fields and `""` escapes.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
