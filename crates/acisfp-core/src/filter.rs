//! # Observation Filter
//!
//! Two independent passes over enriched intervals:
//!
//! 1. [`hrc_science_obs_filter`] drops HRC science observations (HRC below
//!    the ECS obsid threshold).
//! 2. [`acis_filter`] sorts what is left into the four thermal-limit buckets.
//!
//! An interval that fits no bucket is a [`ClassificationError`]. It is
//! returned to the caller, never dropped.

use crate::{Instrument, Obsid, ObsidInterval};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Grating that always makes an observation hot.
pub const HOT_GRATING: &str = "HETG";

/// S3-only observations below this many expected counts are hot.
pub const HOT_COUNT_LIMIT: f64 = 300.0;

// =============================================================================
// ERRORS
// =============================================================================

/// An observation that matches none of the thermal-limit buckets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    #[error("cannot determine what kind of thermal limit obsid {obsid} ({instrument}) should have")]
    Unclassifiable { obsid: Obsid, instrument: Instrument },
}

impl ClassificationError {
    /// The offending obsid.
    #[must_use]
    pub fn obsid(&self) -> Obsid {
        match self {
            Self::Unclassifiable { obsid, .. } => *obsid,
        }
    }
}

// =============================================================================
// THERMAL CLASS
// =============================================================================

/// Thermal-limit bucket of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermalClass {
    AcisI,
    AcisS,
    AcisHot,
    ColdEcs,
}

impl ThermalClass {
    /// Bucket name as used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AcisI => "acis_i",
            Self::AcisS => "acis_s",
            Self::AcisHot => "acis_hot",
            Self::ColdEcs => "cold_ecs",
        }
    }
}

impl fmt::Display for ThermalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thermal-risk test on the catalog group.
///
/// Hot means an HETG observation, or an S3-only observation with fewer than
/// 300 expected counts. Without a catalog group nothing is hot.
#[must_use]
pub fn is_hot(interval: &ObsidInterval) -> bool {
    interval.catalog.as_ref().is_some_and(|catalog| {
        let s3_only = catalog.s3 == "Y" && catalog.ccd_count == 1;
        catalog.grating == HOT_GRATING || (catalog.num_counts < HOT_COUNT_LIMIT && s3_only)
    })
}

/// Bucket a single interval.
///
/// Rules are tried in order: hot, ACIS-S, ACIS-I, HRC-S ECS.
pub fn thermal_class(interval: &ObsidInterval) -> Result<ThermalClass, ClassificationError> {
    if is_hot(interval) {
        return Ok(ThermalClass::AcisHot);
    }
    match interval.instrument {
        Instrument::AcisS => Ok(ThermalClass::AcisS),
        Instrument::AcisI => Ok(ThermalClass::AcisI),
        Instrument::HrcS if interval.obsid.is_ecs() => Ok(ThermalClass::ColdEcs),
        instrument => Err(ClassificationError::Unclassifiable {
            obsid: interval.obsid,
            instrument,
        }),
    }
}

// =============================================================================
// BUCKETS
// =============================================================================

/// The four thermal-limit buckets, each in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThermalBuckets {
    pub acis_i: Vec<ObsidInterval>,
    pub acis_s: Vec<ObsidInterval>,
    pub acis_hot: Vec<ObsidInterval>,
    pub cold_ecs: Vec<ObsidInterval>,
}

impl ThermalBuckets {
    /// Create empty buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The bucket for `class`.
    #[must_use]
    pub fn bucket(&self, class: ThermalClass) -> &[ObsidInterval] {
        match class {
            ThermalClass::AcisI => &self.acis_i,
            ThermalClass::AcisS => &self.acis_s,
            ThermalClass::AcisHot => &self.acis_hot,
            ThermalClass::ColdEcs => &self.cold_ecs,
        }
    }

    fn push(&mut self, class: ThermalClass, interval: ObsidInterval) {
        match class {
            ThermalClass::AcisI => self.acis_i.push(interval),
            ThermalClass::AcisS => self.acis_s.push(interval),
            ThermalClass::AcisHot => self.acis_hot.push(interval),
            ThermalClass::ColdEcs => self.cold_ecs.push(interval),
        }
    }

    /// Total number of bucketed intervals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.acis_i.len() + self.acis_s.len() + self.acis_hot.len() + self.cold_ecs.len()
    }

    /// Check if every bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Buckets in `(acis_i, acis_s, acis_hot, cold_ecs)` order.
pub type BucketTuple = (
    Vec<ObsidInterval>,
    Vec<ObsidInterval>,
    Vec<ObsidInterval>,
    Vec<ObsidInterval>,
);

impl From<ThermalBuckets> for BucketTuple {
    fn from(buckets: ThermalBuckets) -> Self {
        (
            buckets.acis_i,
            buckets.acis_s,
            buckets.acis_hot,
            buckets.cold_ecs,
        )
    }
}

// =============================================================================
// PASSES
// =============================================================================

/// Keep ACIS observations and ECS observations (obsid >= 60000).
#[must_use]
pub fn hrc_science_obs_filter(intervals: Vec<ObsidInterval>) -> Vec<ObsidInterval> {
    intervals
        .into_iter()
        .filter(|interval| interval.instrument.is_acis() || interval.obsid.is_ecs())
        .collect()
}

/// Sort intervals into the thermal-limit buckets.
///
/// Stops at the first interval that fits no bucket.
pub fn acis_filter(intervals: Vec<ObsidInterval>) -> Result<ThermalBuckets, ClassificationError> {
    let mut buckets = ThermalBuckets::new();
    for interval in intervals {
        let class = thermal_class(&interval)?;
        buckets.push(class, interval);
    }
    Ok(buckets)
}

// =============================================================================
// TESTS
// =============================================================================
