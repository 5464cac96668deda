//! # Catalog Module
//!
//! Observation-catalog enrichment of obsid intervals.
//!
//! The catalog itself is an external collaborator behind [`CatalogSource`].
//! A source is asked once per batch and either answers with [`CatalogData`]
//! or fails with a [`CatalogError`]. A failure is never fatal here: the
//! intervals are left without a catalog group and the outcome is handed back
//! to the caller as an [`EnrichmentReport`].

use crate::{CatalogAttributes, Obsid, ObsidInterval};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

// =============================================================================
// CATALOG DATA
// =============================================================================

/// Catalog attributes keyed by obsid.
///
/// Lookup is by obsid value only. Rows may arrive in any order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogData {
    rows: BTreeMap<Obsid, CatalogAttributes>,
}

impl CatalogData {
    /// Create an empty catalog answer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the row for `obsid`.
    pub fn insert(&mut self, obsid: Obsid, attributes: CatalogAttributes) {
        self.rows.insert(obsid, attributes);
    }

    /// Attributes for `obsid`, if the catalog returned a row for it.
    #[must_use]
    pub fn get(&self, obsid: Obsid) -> Option<&CatalogAttributes> {
        self.rows.get(&obsid)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if no rows were returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep only the rows whose obsid is in `obsids`.
    #[must_use]
    pub fn subset(&self, obsids: &[Obsid]) -> Self {
        obsids
            .iter()
            .filter_map(|obsid| self.rows.get_key_value(obsid))
            .map(|(obsid, attributes)| (*obsid, attributes.clone()))
            .collect()
    }
}

impl FromIterator<(Obsid, CatalogAttributes)> for CatalogData {
    fn from_iter<I: IntoIterator<Item = (Obsid, CatalogAttributes)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<CatalogRow> for CatalogData {
    fn from_iter<I: IntoIterator<Item = CatalogRow>>(iter: I) -> Self {
        iter.into_iter()
            .map(|row| (row.obsid, row.attributes))
            .collect()
    }
}

/// One flat catalog row, as stored in a pre-fetched catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub obsid: Obsid,
    #[serde(flatten)]
    pub attributes: CatalogAttributes,
}

// =============================================================================
// CATALOG SOURCE
// =============================================================================

/// Why a catalog fetch produced no data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog could not be reached.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    /// The catalog answered with a non-success status.
    #[error("catalog returned HTTP status {0}")]
    Status(u16),

    /// The catalog answered, but the answer could not be read.
    #[error("malformed catalog response: {0}")]
    Malformed(String),

    /// Catalog access is switched off.
    #[error("catalog access disabled")]
    Offline,
}

/// The observation-catalog collaborator.
///
/// Implementations own any retrying. A call always returns; persistent
/// failure is reported as `Err`, never by panicking.
pub trait CatalogSource {
    /// Fetch catalog attributes for `obsids`.
    fn fetch_catalog(&self, obsids: &[Obsid]) -> Result<CatalogData, CatalogError>;
}

impl<T: CatalogSource + ?Sized> CatalogSource for &T {
    fn fetch_catalog(&self, obsids: &[Obsid]) -> Result<CatalogData, CatalogError> {
        (**self).fetch_catalog(obsids)
    }
}

impl<T: CatalogSource + ?Sized> CatalogSource for Box<T> {
    fn fetch_catalog(&self, obsids: &[Obsid]) -> Result<CatalogData, CatalogError> {
        (**self).fetch_catalog(obsids)
    }
}

/// In-memory catalog, answering from a fixed set of rows.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    data: CatalogData,
}

impl StaticCatalog {
    /// Serve answers from `data`.
    #[must_use]
    pub fn new(data: CatalogData) -> Self {
        Self { data }
    }
}

impl CatalogSource for StaticCatalog {
    fn fetch_catalog(&self, obsids: &[Obsid]) -> Result<CatalogData, CatalogError> {
        Ok(self.data.subset(obsids))
    }
}

/// Catalog that is never reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineCatalog;

impl CatalogSource for OfflineCatalog {
    fn fetch_catalog(&self, _obsids: &[Obsid]) -> Result<CatalogData, CatalogError> {
        Err(CatalogError::Offline)
    }
}

// =============================================================================
// ENRICHMENT
// =============================================================================

/// What enrichment did, for the caller's diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentReport {
    /// No interval was catalog-eligible; the source was not called.
    NothingToFetch,
    /// The catalog answered. `matched` of the requested obsids were found.
    Enriched { requested: usize, matched: usize },
    /// The catalog failed. No interval received a catalog group.
    Skipped { requested: usize, reason: CatalogError },
}

impl EnrichmentReport {
    /// True if some eligible interval was left without catalog attributes.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        match self {
            Self::NothingToFetch => false,
            Self::Enriched { requested, matched } => matched < requested,
            Self::Skipped { .. } => true,
        }
    }
}

/// Merge catalog attributes into `intervals`.
///
/// Only obsids <= 60000 are requested and only those intervals are touched.
/// The source is called at most once, with each eligible obsid once in
/// ascending order.
pub fn enrich<S>(intervals: &mut [ObsidInterval], source: &S) -> EnrichmentReport
where
    S: CatalogSource + ?Sized,
{
    let obsids: Vec<Obsid> = intervals
        .iter()
        .map(|interval| interval.obsid)
        .filter(|obsid| obsid.is_catalog_eligible())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if obsids.is_empty() {
        return EnrichmentReport::NothingToFetch;
    }

    let data = match source.fetch_catalog(&obsids) {
        Ok(data) => data,
        Err(reason) => {
            return EnrichmentReport::Skipped {
                requested: obsids.len(),
                reason,
            };
        }
    };

    for interval in intervals
        .iter_mut()
        .filter(|interval| interval.obsid.is_catalog_eligible())
    {
        interval.catalog = data.get(interval.obsid).cloned();
    }
    let matched = obsids.iter().filter(|&&obsid| data.get(obsid).is_some()).count();

    EnrichmentReport::Enriched {
        requested: obsids.len(),
        matched,
    }
}

// =============================================================================
// TESTS
// =============================================================================
