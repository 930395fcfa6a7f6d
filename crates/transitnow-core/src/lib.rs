//! # transitnow Core Library
//!
//! Predicts exoplanet transits from a catalog, composes a short public
//! announcement for each one, and serves them minute by minute. The
//! `transitnow` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Build** (daily): [`Catalog`] → [`TransitPredictor`] → [`Composer`] →
//!   minute-bucketed [`Schedule`], published atomically by [`builder::publish`]
//! - **Emit** (every minute): [`Consumer`] posts the current minute's bucket
//!   through a [`Transport`], paced and retried within the minute
//! - **Storage**: TOML configuration and the artifact directory shared by
//!   both phases
//!
//! ## Key Components
//!
//! - [`ScheduleBuilder`]: catalog to schedule
//! - [`Consumer`]: schedule to transport
//! - [`BoundaryTable`]: constellation lookup from RA/Dec
//! - [`Config`]: application configuration management

pub mod builder;
pub mod catalog;
pub mod composer;
pub mod constellation;
pub mod consumer;
pub mod error;
pub mod lookahead;
pub mod predictor;
pub mod schedule;
pub mod storage;
pub mod time;
pub mod transport;

pub use builder::{publish, seeded_rng, BuildOutcome, PlanetFailure, ScheduleBuilder};
pub use catalog::{Catalog, PlanetRecord, RefreshStatus, SkippedRow};
pub use composer::{Announcement, Composer, EventDetails, Variant, MAX_ANNOUNCEMENT_CHARS};
pub use constellation::{BoundaryTable, ConstellationResolver, Equatorial};
pub use consumer::{emission_offsets, Consumer, EmissionReport, Pacer, RealPacer};
pub use error::{CatalogError, ConfigError, CoreError, Result, TransportError, ValidationError};
pub use lookahead::{upcoming, UpcomingMessage};
pub use predictor::{TransitPredictor, TransitWindow};
pub use schedule::Schedule;
pub use storage::{data_dir, ArtifactStore, Config, Stamp};
pub use time::{to_gregorian, to_julian_date, JulianDate, MinuteKey};
pub use transport::{ConsoleTransport, OutboxTransport, Transport, WebhookTransport};
