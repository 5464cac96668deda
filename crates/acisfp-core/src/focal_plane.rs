//! # Focal Plane
//!
//! Maps a sim (science instrument mechanism) position to the instrument in
//! the focal plane.
//!
//! Band edges are the max and min hard stops of each detector, split halfway
//! between the I and S arrays of each instrument. All bands are inclusive.
//! Anything outside them, including the gaps between bands, is reported as
//! [`Instrument::LaunchLock`]: a position the sim is never expected to sit at.

use crate::Instrument;
use std::ops::RangeInclusive;

/// ACIS-I band.
pub const ACIS_I_SIMPOS: RangeInclusive<i64> = 82_109..=104_839;
/// ACIS-S band.
pub const ACIS_S_SIMPOS: RangeInclusive<i64> = 70_736..=82_108;
/// HRC-I band.
pub const HRC_I_SIMPOS: RangeInclusive<i64> = -86_147..=-20_000;
/// HRC-S band.
pub const HRC_S_SIMPOS: RangeInclusive<i64> = -104_362..=-86_148;

/// Return the instrument in the focal plane for `simpos`.
#[must_use]
pub fn classify(simpos: i64) -> Instrument {
    if ACIS_I_SIMPOS.contains(&simpos) {
        Instrument::AcisI
    } else if ACIS_S_SIMPOS.contains(&simpos) {
        Instrument::AcisS
    } else if HRC_I_SIMPOS.contains(&simpos) {
        Instrument::HrcI
    } else if HRC_S_SIMPOS.contains(&simpos) {
        Instrument::HrcS
    } else {
        Instrument::LaunchLock
    }
}

// =============================================================================
// TESTS
// =============================================================================
