//! Constellation lookup from equatorial coordinates.
//!
//! Boundaries come from Roman (1987), "Identification of a Constellation
//! From a Position": rows of `RA_low RA_high Dec_low Abbr` defined at the
//! B1875 equinox. A J2000 position is precessed to B1875 and the first row
//! with `RA_low <= ra < RA_high` and `Dec_low <= dec` names the constellation.

use std::f64::consts::PI;
use std::path::Path;

use crate::error::{CatalogError, Result, ValidationError};

/// JD of the B1875.0 equinox.
pub const B1875_JD: f64 = 2_405_889.258_550_475;
/// JD of the J2000.0 equinox.
pub const J2000_JD: f64 = 2_451_545.0;

const ARCSEC: f64 = PI / (180.0 * 3600.0);

/// Equatorial position: right ascension in hours, declination in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equatorial {
    pub ra_hours: f64,
    pub dec_deg: f64,
}

impl Equatorial {
    pub fn new(ra_hours: f64, dec_deg: f64) -> std::result::Result<Self, ValidationError> {
        if !ra_hours.is_finite() || !(0.0..24.0).contains(&ra_hours) {
            return Err(ValidationError::invalid(
                "ra",
                format!("{ra_hours} is outside [0, 24) hours"),
            ));
        }
        if !dec_deg.is_finite() || !(-90.0..=90.0).contains(&dec_deg) {
            return Err(ValidationError::invalid(
                "dec",
                format!("{dec_deg} is outside [-90, 90] degrees"),
            ));
        }
        Ok(Self { ra_hours, dec_deg })
    }

    /// Parse sexagesimal strings such as `"19:07:14.03"` / `"+49:18:59.0"`,
    /// `"19h07m14s"` / `"-00d30m"`, or plain decimal values.
    pub fn parse(ra: &str, dec: &str) -> std::result::Result<Self, ValidationError> {
        let ra_hours = parse_sexagesimal("ra", ra)?;
        let dec_deg = parse_sexagesimal("dec", dec)?;
        Self::new(ra_hours, dec_deg)
    }

    /// Precess a J2000 position to the B1875 equinox (IAU 1976).
    pub fn to_b1875(&self) -> Self {
        let t = (B1875_JD - J2000_JD) / 36525.0;
        let zeta = (2306.2181 * t + 0.30188 * t * t + 0.017998 * t * t * t) * ARCSEC;
        let z = (2306.2181 * t + 1.09468 * t * t + 0.018203 * t * t * t) * ARCSEC;
        let theta = (2004.3109 * t - 0.42665 * t * t - 0.041833 * t * t * t) * ARCSEC;

        let ra0 = self.ra_hours * 15.0_f64.to_radians();
        let dec0 = self.dec_deg.to_radians();

        let a = dec0.cos() * (ra0 + zeta).sin();
        let b = theta.cos() * dec0.cos() * (ra0 + zeta).cos() - theta.sin() * dec0.sin();
        let c = theta.sin() * dec0.cos() * (ra0 + zeta).cos() + theta.cos() * dec0.sin();

        let ra = (a.atan2(b) + z).rem_euclid(2.0 * PI);
        let dec = c.clamp(-1.0, 1.0).asin();
        Self {
            ra_hours: (ra.to_degrees() / 15.0).rem_euclid(24.0),
            dec_deg: dec.to_degrees(),
        }
    }
}

fn parse_sexagesimal(field: &str, text: &str) -> std::result::Result<f64, ValidationError> {
    let trimmed = text.trim();
    let negative = trimmed.starts_with('-');
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    let normalized: String = unsigned
        .chars()
        .map(|c| match c {
            ':' | 'h' | 'm' | 's' | 'd' | '°' | '\'' | '"' => ' ',
            other => other,
        })
        .collect();

    let parts: Vec<&str> = normalized.split_whitespace().collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(ValidationError::invalid(
            field,
            format!("cannot parse '{text}' as sexagesimal"),
        ));
    }

    let mut value = 0.0;
    let mut scale = 1.0;
    for part in parts {
        let component: f64 = part.parse().map_err(|_| {
            ValidationError::invalid(field, format!("cannot parse '{text}' as sexagesimal"))
        })?;
        if component < 0.0 || (scale < 1.0 && component >= 60.0) {
            return Err(ValidationError::invalid(
                field,
                format!("component '{part}' out of range in '{text}'"),
            ));
        }
        value += component * scale;
        scale /= 60.0;
    }
    Ok(if negative { -value } else { value })
}

/// Maps a J2000 position to a constellation name.
pub trait ConstellationResolver {
    fn resolve(&self, position: &Equatorial) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
struct Boundary {
    ra_low: f64,
    ra_high: f64,
    dec_low: f64,
    abbr: String,
}

/// Parsed boundary table, in file order.
#[derive(Debug, Clone, Default)]
pub struct BoundaryTable {
    rows: Vec<Boundary>,
}

impl BoundaryTable {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let table = Self::parse(&text)?;
        tracing::debug!(path = %path.display(), rows = table.len(), "loaded boundary table");
        Ok(table)
    }

    pub fn parse(text: &str) -> std::result::Result<Self, CatalogError> {
        let mut rows = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            let [ra_low, ra_high, dec_low, abbr] = fields[..] else {
                return Err(CatalogError::BoundaryParse {
                    line: line_no,
                    message: format!("expected 4 fields, found {}", fields.len()),
                });
            };
            let number = |s: &str| {
                s.parse::<f64>().map_err(|_| CatalogError::BoundaryParse {
                    line: line_no,
                    message: format!("'{s}' is not a number"),
                })
            };
            if full_name(abbr).is_none() {
                return Err(CatalogError::BoundaryParse {
                    line: line_no,
                    message: format!("unknown constellation abbreviation '{abbr}'"),
                });
            }
            rows.push(Boundary {
                ra_low: number(ra_low)?,
                ra_high: number(ra_high)?,
                dec_low: number(dec_low)?,
                abbr: abbr.to_string(),
            });
        }
        if rows.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Abbreviation of the constellation containing a B1875 position.
    pub fn abbreviation_b1875(&self, position: &Equatorial) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| {
                row.ra_low <= position.ra_hours
                    && position.ra_hours < row.ra_high
                    && row.dec_low <= position.dec_deg
            })
            .map(|row| row.abbr.as_str())
    }
}

impl ConstellationResolver for BoundaryTable {
    fn resolve(&self, position: &Equatorial) -> Result<String> {
        let b1875 = position.to_b1875();
        let describe = || format!("RA {:.4}h Dec {:.4}°", position.ra_hours, position.dec_deg);
        let abbr = self
            .abbreviation_b1875(&b1875)
            .ok_or_else(|| CatalogError::Unresolved(describe()))?;
        full_name(abbr)
            .map(str::to_string)
            .ok_or_else(|| CatalogError::Unresolved(describe()).into())
    }
}

/// Full IAU name for a three-letter abbreviation (case-insensitive).
pub fn full_name(abbr: &str) -> Option<&'static str> {
    CONSTELLATIONS
        .iter()
        .find(|(a, _)| a.eq_ignore_ascii_case(abbr))
        .map(|(_, name)| *name)
}

const CONSTELLATIONS: [(&str, &str); 88] = [
    ("And", "Andromeda"),
    ("Ant", "Antlia"),
    ("Aps", "Apus"),
    ("Aqr", "Aquarius"),
    ("Aql", "Aquila"),
    ("Ara", "Ara"),
    ("Ari", "Aries"),
    ("Aur", "Auriga"),
    ("Boo", "Bootes"),
    ("Cae", "Caelum"),
    ("Cam", "Camelopardalis"),
    ("Cnc", "Cancer"),
    ("CVn", "Canes Venatici"),
    ("CMa", "Canis Major"),
    ("CMi", "Canis Minor"),
    ("Cap", "Capricornus"),
    ("Car", "Carina"),
    ("Cas", "Cassiopeia"),
    ("Cen", "Centaurus"),
    ("Cep", "Cepheus"),
    ("Cet", "Cetus"),
    ("Cha", "Chamaeleon"),
    ("Cir", "Circinus"),
    ("Col", "Columba"),
    ("Com", "Coma Berenices"),
    ("CrA", "Corona Australis"),
    ("CrB", "Corona Borealis"),
    ("Crv", "Corvus"),
    ("Crt", "Crater"),
    ("Cru", "Crux"),
    ("Cyg", "Cygnus"),
    ("Del", "Delphinus"),
    ("Dor", "Dorado"),
    ("Dra", "Draco"),
    ("Equ", "Equuleus"),
    ("Eri", "Eridanus"),
    ("For", "Fornax"),
    ("Gem", "Gemini"),
    ("Gru", "Grus"),
    ("Her", "Hercules"),
    ("Hor", "Horologium"),
    ("Hya", "Hydra"),
    ("Hyi", "Hydrus"),
    ("Ind", "Indus"),
    ("Lac", "Lacerta"),
    ("Leo", "Leo"),
    ("LMi", "Leo Minor"),
    ("Lep", "Lepus"),
    ("Lib", "Libra"),
    ("Lup", "Lupus"),
    ("Lyn", "Lynx"),
    ("Lyr", "Lyra"),
    ("Men", "Mensa"),
    ("Mic", "Microscopium"),
    ("Mon", "Monoceros"),
    ("Mus", "Musca"),
    ("Nor", "Norma"),
    ("Oct", "Octans"),
    ("Oph", "Ophiuchus"),
    ("Ori", "Orion"),
    ("Pav", "Pavo"),
    ("Peg", "Pegasus"),
    ("Per", "Perseus"),
    ("Phe", "Phoenix"),
    ("Pic", "Pictor"),
    ("Psc", "Pisces"),
    ("PsA", "Piscis Austrinus"),
    ("Pup", "Puppis"),
    ("Pyx", "Pyxis"),
    ("Ret", "Reticulum"),
    ("Sge", "Sagitta"),
    ("Sgr", "Sagittarius"),
    ("Sco", "Scorpius"),
    ("Scl", "Sculptor"),
    ("Sct", "Scutum"),
    ("Ser", "Serpens"),
    ("Sex", "Sextans"),
    ("Tau", "Taurus"),
    ("Tel", "Telescopium"),
    ("Tri", "Triangulum"),
    ("TrA", "Triangulum Australe"),
    ("Tuc", "Tucana"),
    ("UMa", "Ursa Major"),
    ("UMi", "Ursa Minor"),
    ("Vel", "Vela"),
    ("Vir", "Virgo"),
    ("Vol", "Volans"),
    ("Vul", "Vulpecula"),
];
