//! # acisfp-core
//!
//! The deterministic observation classifier behind the ACIS focal-plane check.
//!
//! Data flows strictly left to right:
//!
//! ```text
//! commanded states ──► ObsidIntervalExtractor ──► enrich (CatalogSource) ──► ObservationFilter
//!                          │                                                    │
//!                    focal_plane::classify                       (acis_i, acis_s, acis_hot, cold_ecs)
//! ```
//!
//! The crate has no I/O of its own. The commanded-state batch is handed in as a
//! slice, and the observation catalog is reached through the [`CatalogSource`]
//! trait, whose implementations live in the application layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod catalog;
pub mod extractor;
pub mod filter;
pub mod focal_plane;
pub mod pipeline;

pub use catalog::{
    CatalogData, CatalogError, CatalogRow, CatalogSource, EnrichmentReport, OfflineCatalog,
    StaticCatalog, enrich,
};
pub use extractor::ObsidIntervalExtractor;
pub use filter::{
    ClassificationError, ThermalBuckets, ThermalClass, acis_filter, hrc_science_obs_filter,
    is_hot, thermal_class,
};
pub use pipeline::{Extraction, PipelineOutput, classify_observations, find_obsid_intervals, run};

// =============================================================================
// OBSID
// =============================================================================

/// First obsid of the maneuver range. Maneuver obsids are `[38001, 60000)`.
pub const MANEUVER_OBSID_START: u32 = 38_001;

/// Obsids at or above this value are engineering (ECS) observations.
///
/// It is also the exclusive end of the maneuver range and the inclusive upper
/// bound for catalog eligibility.
pub const ECS_OBSID_THRESHOLD: u32 = 60_000;

/// Numeric identifier of a single scheduled observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Obsid(pub u32);

impl Obsid {
    /// True for obsids in the maneuver range `[38001, 60000)`.
    #[must_use]
    pub fn is_maneuver(self) -> bool {
        (MANEUVER_OBSID_START..ECS_OBSID_THRESHOLD).contains(&self.0)
    }

    /// True for ECS observations (obsid >= 60000).
    #[must_use]
    pub fn is_ecs(self) -> bool {
        self.0 >= ECS_OBSID_THRESHOLD
    }

    /// True if the observation catalog may be asked about this obsid (obsid <= 60000).
    #[must_use]
    pub fn is_catalog_eligible(self) -> bool {
        self.0 <= ECS_OBSID_THRESHOLD
    }
}

impl fmt::Display for Obsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Obsid {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// =============================================================================
// INSTRUMENT
// =============================================================================

/// Label of whatever sits in the focal plane for a given sim position.
///
/// `LaunchLock` is not an error. It marks a sim position outside every expected
/// hardware band and is propagated like any other label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Instrument {
    #[serde(rename = "ACIS-I")]
    AcisI,
    #[serde(rename = "ACIS-S")]
    AcisS,
    #[serde(rename = "HRC-I")]
    HrcI,
    #[serde(rename = "HRC-S")]
    HrcS,
    #[serde(rename = "launchlock")]
    LaunchLock,
}

impl Instrument {
    /// All labels, in table order.
    pub const ALL: [Instrument; 5] = [
        Instrument::AcisI,
        Instrument::AcisS,
        Instrument::HrcI,
        Instrument::HrcS,
        Instrument::LaunchLock,
    ];

    /// The label as printed in loads and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AcisI => "ACIS-I",
            Self::AcisS => "ACIS-S",
            Self::HrcI => "HRC-I",
            Self::HrcS => "HRC-S",
            Self::LaunchLock => "launchlock",
        }
    }

    /// True for both ACIS configurations (the label starts with `ACIS-`).
    #[must_use]
    pub fn is_acis(self) -> bool {
        matches!(self, Self::AcisI | Self::AcisS)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the known instrument labels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown instrument label: {0:?}")]
pub struct UnknownInstrument(pub String);

impl FromStr for Instrument {
    type Err = UnknownInstrument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|instrument| instrument.as_str() == s)
            .ok_or_else(|| UnknownInstrument(s.to_string()))
    }
}

// =============================================================================
// POWER COMMAND
// =============================================================================

/// The power/science command tokens the interval extractor reacts to.
///
/// Every other token of the command vocabulary is kept verbatim in `Other`
/// and never changes extractor state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PowerCommand {
    /// `WSPOW00000`: power down all FEPs and video boards.
    Wspow00000,
    /// `WSVIDALLDN`: video boards down.
    Wsvidalldn,
    /// `XTZ0000005`: start science, timed exposure.
    Xtz0000005,
    /// `XCZ0000005`: start science, continuous clocking.
    Xcz0000005,
    /// `AA00000000`: stop science.
    Aa00000000,
    /// Any other token.
    Other(String),
}

impl PowerCommand {
    /// The raw command token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Wspow00000 => "WSPOW00000",
            Self::Wsvidalldn => "WSVIDALLDN",
            Self::Xtz0000005 => "XTZ0000005",
            Self::Xcz0000005 => "XCZ0000005",
            Self::Aa00000000 => "AA00000000",
            Self::Other(token) => token,
        }
    }

    /// Marker that opens an obsid interval.
    #[must_use]
    pub fn is_power_marker(&self) -> bool {
        matches!(self, Self::Wspow00000 | Self::Wsvidalldn)
    }

    /// Marker for the start of science.
    #[must_use]
    pub fn is_science_start(&self) -> bool {
        matches!(self, Self::Xtz0000005 | Self::Xcz0000005)
    }

    /// Marker for the stop of science, which closes an interval.
    #[must_use]
    pub fn is_science_stop(&self) -> bool {
        matches!(self, Self::Aa00000000)
    }
}

impl From<&str> for PowerCommand {
    fn from(token: &str) -> Self {
        match token {
            "WSPOW00000" => Self::Wspow00000,
            "WSVIDALLDN" => Self::Wsvidalldn,
            "XTZ0000005" => Self::Xtz0000005,
            "XCZ0000005" => Self::Xcz0000005,
            "AA00000000" => Self::Aa00000000,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for PowerCommand {
    fn from(token: String) -> Self {
        match Self::from(token.as_str()) {
            Self::Other(_) => Self::Other(token),
            known => known,
        }
    }
}

impl From<PowerCommand> for String {
    fn from(command: PowerCommand) -> Self {
        match command {
            PowerCommand::Other(token) => token,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PowerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerCommand {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

// =============================================================================
// COMMANDED STATE
// =============================================================================

/// One record of the commanded-state archive.
///
/// Records are read once, in stream order, and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandedState {
    pub obsid: Obsid,
    pub power_cmd: PowerCommand,
    /// Science instrument mechanism position.
    pub simpos: i64,
    pub datestart: String,
    pub datestop: String,
    /// Start time, in CXC seconds.
    pub tstart: f64,
    /// Stop time, in CXC seconds.
    pub tstop: f64,
}

// =============================================================================
// OBSID INTERVAL
// =============================================================================

/// Attributes merged in from the observation catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogAttributes {
    /// Grating in the beam (`HETG`, `LETG` or `NONE`).
    pub grating: String,
    /// Number of CCDs clocked, after dropped chips.
    pub ccd_count: u32,
    /// S3 chip status flag (`Y`, `N`, or an optional-chip code).
    #[serde(rename = "S3")]
    pub s3: String,
    /// Expected number of counts over the whole sequence.
    pub num_counts: f64,
}

/// A single observation, from the power marker that opened it to the stop of
/// science that closed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsidInterval {
    pub obsid: Obsid,
    pub datestart: String,
    pub datestop: String,
    pub tstart: f64,
    pub tstop: f64,
    /// `tstart` of the start-science command.
    pub start_science: f64,
    pub instrument: Instrument,
    /// Present only when the catalog was reached and knew this obsid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogAttributes>,
}

impl ObsidInterval {
    /// True if catalog attributes were merged into this interval.
    #[must_use]
    pub fn is_enriched(&self) -> bool {
        self.catalog.is_some()
    }
}

// =============================================================================
// TESTS
// =============================================================================
