//! # Pipeline
//!
//! Composition of the stages:
//! extraction, catalog enrichment, HRC science filter, thermal bucketing.
//!
//! Ordering contract of [`find_obsid_intervals`]: intervals are sorted by
//! obsid while the catalog is consulted and by `tstart` on return. Both sorts
//! are stable.

use crate::catalog::{CatalogSource, EnrichmentReport, enrich};
use crate::extractor::ObsidIntervalExtractor;
use crate::filter::{ClassificationError, ThermalBuckets, acis_filter, hrc_science_obs_filter};
use crate::{CommandedState, ObsidInterval};

/// Enriched intervals plus what happened on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Intervals sorted by `tstart`.
    pub intervals: Vec<ObsidInterval>,
    /// Outcome of the catalog step.
    pub enrichment: EnrichmentReport,
    /// `datestart` of an interval left open at the end of the stream, if any.
    pub unterminated: Option<String>,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub buckets: ThermalBuckets,
    pub enrichment: EnrichmentReport,
    pub unterminated: Option<String>,
    /// Number of HRC science observations removed before bucketing.
    pub hrc_science_dropped: usize,
}

/// Extract obsid intervals from `states` and merge catalog attributes into them.
pub fn find_obsid_intervals<S>(states: &[CommandedState], source: &S) -> Extraction
where
    S: CatalogSource + ?Sized,
{
    let (mut intervals, unterminated) = ObsidIntervalExtractor::extract_with_tail(states);

    intervals.sort_by_key(|interval| interval.obsid);
    let enrichment = enrich(&mut intervals, source);
    intervals.sort_by(|a, b| a.tstart.total_cmp(&b.tstart));

    Extraction {
        intervals,
        enrichment,
        unterminated,
    }
}

/// Run both filter passes over already-enriched intervals.
pub fn classify_observations(
    intervals: Vec<ObsidInterval>,
) -> Result<ThermalBuckets, ClassificationError> {
    acis_filter(hrc_science_obs_filter(intervals))
}

/// Run the whole pipeline on a commanded-state batch.
pub fn run<S>(states: &[CommandedState], source: &S) -> Result<PipelineOutput, ClassificationError>
where
    S: CatalogSource + ?Sized,
{
    let Extraction {
        intervals,
        enrichment,
        unterminated,
    } = find_obsid_intervals(states, source);

    let total = intervals.len();
    let kept = hrc_science_obs_filter(intervals);
    let hrc_science_dropped = total - kept.len();
    let buckets = acis_filter(kept)?;

    Ok(PipelineOutput {
        buckets,
        enrichment,
        unterminated,
        hrc_science_dropped,
    })
}

// =============================================================================
// TESTS
// =============================================================================
