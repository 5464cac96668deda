//! # CLI Commands
//!
//! Loading of input files, selection of the catalog source, and the three
//! commands. Every command returns its rendered output so that callers (and
//! tests) decide where it goes.

use crate::config::{CatalogArgs, CatalogChoice, Cli, Command};
use crate::error::AppError;
use crate::ocat::{BlockingOcat, OcatClient};
use acisfp_core::focal_plane;
use acisfp_core::{
    CatalogData, CatalogRow, CatalogSource, CommandedState, EnrichmentReport, Instrument,
    ObsidInterval, OfflineCatalog, StaticCatalog, ThermalBuckets, ThermalClass,
    find_obsid_intervals,
};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

// =============================================================================
// INPUT
// =============================================================================

/// Read a JSON array of commanded states, in stream order.
pub fn load_states(path: &Path) -> Result<Vec<CommandedState>, AppError> {
    let text = std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let states: Vec<CommandedState> =
        serde_json::from_str(&text).map_err(|source| AppError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), records = states.len(), "Loaded commanded states");
    Ok(states)
}

/// Read a JSON array of catalog rows.
pub fn load_catalog_file(path: &Path) -> Result<CatalogData, AppError> {
    let text = std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rows: Vec<CatalogRow> = serde_json::from_str(&text).map_err(|source| AppError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), rows = rows.len(), "Loaded catalog file");
    Ok(rows.into_iter().collect())
}

/// Build the catalog source selected by `args`.
pub fn build_source(args: &CatalogArgs) -> Result<Box<dyn CatalogSource>, AppError> {
    match args.choice() {
        CatalogChoice::Offline => {
            info!("Offline mode, catalog enrichment disabled");
            Ok(Box::new(OfflineCatalog))
        }
        CatalogChoice::File(path) => Ok(Box::new(StaticCatalog::new(load_catalog_file(&path)?))),
        CatalogChoice::Ocat(config) => {
            debug!(url = %config.base_url, attempts = config.attempts, "Using Ocat");
            let client = OcatClient::new(config)?;
            let blocking = BlockingOcat::new(client).map_err(AppError::Runtime)?;
            Ok(Box::new(blocking))
        }
    }
}

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// Log the outcome of the catalog step.
pub fn report_enrichment(report: &EnrichmentReport) {
    match report {
        EnrichmentReport::NothingToFetch => {
            debug!("No catalog-eligible intervals");
        }
        EnrichmentReport::Enriched { requested, matched } if matched < requested => {
            warn!(requested, matched, "Catalog did not return every requested obsid");
        }
        EnrichmentReport::Enriched { requested, matched } => {
            info!(requested, matched, "Catalog enrichment complete");
        }
        EnrichmentReport::Skipped { requested, reason } => {
            warn!(requested, %reason, "Catalog unavailable, intervals left unenriched");
        }
    }
}

fn report_unterminated(unterminated: Option<&str>) {
    if let Some(datestart) = unterminated {
        warn!(datestart, "Discarding interval still open at the end of the stream");
    }
}

// =============================================================================
// RENDERING
// =============================================================================

/// One line per interval.
#[must_use]
pub fn render_intervals(intervals: &[ObsidInterval]) -> String {
    let mut out = String::new();
    for interval in intervals {
        out.push_str(&format!(
            "{:>6}  {}  {}  {:<7}",
            interval.obsid.0,
            interval.datestart,
            interval.datestop,
            interval.instrument.as_str()
        ));
        if let Some(catalog) = &interval.catalog {
            out.push_str(&format!(
                "  grating={} ccds={} S3={} counts={:.0}",
                catalog.grating, catalog.ccd_count, catalog.s3, catalog.num_counts
            ));
        }
        out.push('\n');
    }
    out
}

/// One section per bucket, in `(acis_i, acis_s, acis_hot, cold_ecs)` order.
#[must_use]
pub fn render_buckets(buckets: &ThermalBuckets) -> String {
    let mut out = String::new();
    for class in [
        ThermalClass::AcisI,
        ThermalClass::AcisS,
        ThermalClass::AcisHot,
        ThermalClass::ColdEcs,
    ] {
        let bucket = buckets.bucket(class);
        out.push_str(&format!("{class} ({})\n", bucket.len()));
        for line in render_intervals(bucket).lines() {
            out.push_str(&format!("  {line}\n"));
        }
    }
    out
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

// =============================================================================
// COMMANDS
// =============================================================================

#[derive(Serialize)]
struct FocalPlaneOutput {
    simpos: i64,
    instrument: Instrument,
}

/// Report the instrument in the focal plane at `simpos`.
pub fn cmd_focal_plane(simpos: i64, json: bool) -> Result<String, AppError> {
    let instrument = focal_plane::classify(simpos);
    if json {
        to_json(&FocalPlaneOutput { simpos, instrument })
    } else {
        Ok(format!("{instrument}\n"))
    }
}

/// Extract and enrich the obsid intervals of a commanded-state file.
pub fn cmd_intervals<S>(states: &Path, source: &S, json: bool) -> Result<String, AppError>
where
    S: CatalogSource + ?Sized,
{
    let states = load_states(states)?;
    let extraction = find_obsid_intervals(&states, source);
    report_enrichment(&extraction.enrichment);
    report_unterminated(extraction.unterminated.as_deref());
    info!(intervals = extraction.intervals.len(), "Extracted obsid intervals");

    if json {
        to_json(&extraction.intervals)
    } else {
        Ok(render_intervals(&extraction.intervals))
    }
}

/// Run the whole pipeline on a commanded-state file.
pub fn cmd_classify<S>(states: &Path, source: &S, json: bool) -> Result<String, AppError>
where
    S: CatalogSource + ?Sized,
{
    let states = load_states(states)?;
    let output = acisfp_core::run(&states, source)?;
    report_enrichment(&output.enrichment);
    report_unterminated(output.unterminated.as_deref());
    info!(
        acis_i = output.buckets.acis_i.len(),
        acis_s = output.buckets.acis_s.len(),
        acis_hot = output.buckets.acis_hot.len(),
        cold_ecs = output.buckets.cold_ecs.len(),
        hrc_science_dropped = output.hrc_science_dropped,
        "Classified observations"
    );

    if json {
        to_json(&output.buckets)
    } else {
        Ok(render_buckets(&output.buckets))
    }
}

/// Dispatch a parsed command line.
pub fn run(cli: &Cli) -> Result<String, AppError> {
    match &cli.command {
        Command::FocalPlane { simpos } => cmd_focal_plane(*simpos, cli.json),
        Command::Intervals { states } => {
            let source = build_source(&cli.catalog)?;
            cmd_intervals(states, source.as_ref(), cli.json)
        }
        Command::Classify { states } => {
            let source = build_source(&cli.catalog)?;
            cmd_classify(states, source.as_ref(), cli.json)
        }
    }
}
