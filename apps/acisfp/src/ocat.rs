//! # Ocat Client
//!
//! HTTP client for the Chandra observation catalog (Ocat) details service.
//!
//! One catalog fetch is two requests against the same endpoint:
//!
//! 1. `?format=text&obsid=<obsids>` for grating, chip setup and count rate.
//! 2. `?format=text&seqNum=<sequences>` for the approved exposure of every
//!    observation in the same sequences.
//!
//! Expected counts are the count rate times the total approved exposure of
//! the sequence. The client retries a failed fetch a fixed number of times
//! with a fixed delay and then reports [`CatalogError`]; it never aborts the
//! caller.

use acisfp_core::{CatalogAttributes, CatalogData, CatalogError, CatalogSource, Obsid};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, warn};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Default Ocat details endpoint.
pub const DEFAULT_OCAT_URL: &str = "https://cda.harvard.edu/srservices/ocatDetails.do";

/// Default number of fetch attempts.
pub const DEFAULT_ATTEMPTS: u32 = 4;

/// Default delay between fetch attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// ACIS chip columns of the obsid table.
const CHIP_COLUMNS: [&str; 10] = ["I0", "I1", "I2", "I3", "S0", "S1", "S2", "S3", "S4", "S5"];

/// Connection settings for [`OcatClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcatConfig {
    pub base_url: String,
    /// Total number of attempts, at least 1.
    pub attempts: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for OcatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OCAT_URL.to_string(),
            attempts: DEFAULT_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// =============================================================================
// TEXT TABLE
// =============================================================================

/// A tab-separated Ocat text table.
///
/// The first non-comment line is the header, the line after it is a
/// separator, and every following non-blank line is a row. Cells are
/// trimmed; short rows are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcatTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl OcatTable {
    /// Parse the body of a `format=text` response.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .comment(Some(b'#'))
            .quoting(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader
            .headers()
            .map_err(malformed)?
            .iter()
            .map(str::to_string)
            .collect();
        if columns.iter().all(String::is_empty) {
            return Err(CatalogError::Malformed("empty response".to_string()));
        }
        if columns.len() < 2 {
            return Err(CatalogError::Malformed(format!(
                "header is not tab-separated: {:?}",
                columns.join(" ")
            )));
        }

        let mut rows = Vec::new();
        // The first record is the separator line under the header.
        for record in reader.records().skip(1) {
            let record = record.map_err(malformed)?;
            if record.iter().any(|cell| !cell.is_empty()) {
                rows.push(record.iter().map(str::to_string).collect());
            }
        }

        Ok(Self { columns, rows })
    }

    /// Position of `name` in the header.
    pub fn column(&self, name: &str) -> Result<usize, CatalogError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| CatalogError::Malformed(format!("missing column {name}")))
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell `column` of row `row`. Short rows read as empty cells.
    fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map_or("", String::as_str)
    }
}

fn malformed(error: csv::Error) -> CatalogError {
    CatalogError::Malformed(error.to_string())
}

/// Parse a numeric cell. Empty cells read as `empty`.
fn parse_number<T: std::str::FromStr>(
    value: &str,
    column: &str,
    empty: T,
) -> Result<T, CatalogError> {
    if value.is_empty() {
        return Ok(empty);
    }
    value
        .parse()
        .map_err(|_| CatalogError::Malformed(format!("bad {column} value {value:?}")))
}

/// Chips that are on (`Y`) or optional (`O1`, `O2`, ...) count as clocked.
fn chip_is_clocked(value: &str) -> bool {
    value == "Y" || value.starts_with('O')
}

/// Sequence numbers referenced by an obsid table, blank ones skipped.
pub fn sequence_numbers(obsid_table: &OcatTable) -> Result<Vec<String>, CatalogError> {
    let seq = obsid_table.column("SEQ_NUM")?;
    let unique: BTreeSet<&str> = (0..obsid_table.len())
        .map(|row| obsid_table.cell(row, seq))
        .filter(|value| !value.is_empty())
        .collect();
    Ok(unique.into_iter().map(str::to_string).collect())
}

/// Combine the obsid table and the sequence table into catalog attributes.
pub fn catalog_from_tables(
    obsid_table: &OcatTable,
    seq_table: &OcatTable,
) -> Result<CatalogData, CatalogError> {
    // Approved exposure per sequence, in seconds.
    let mut exposure: BTreeMap<&str, f64> = BTreeMap::new();
    if !seq_table.is_empty() {
        let seq = seq_table.column("SEQ_NUM")?;
        let app_exp = seq_table.column("APP_EXP")?;
        for row in 0..seq_table.len() {
            let ks: f64 = parse_number(seq_table.cell(row, app_exp), "APP_EXP", 0.0)?;
            *exposure.entry(seq_table.cell(row, seq)).or_default() += ks * 1000.0;
        }
    }

    let obsid = obsid_table.column("OBSID")?;
    let seq = obsid_table.column("SEQ_NUM")?;
    let grat = obsid_table.column("GRAT")?;
    // The S3 status flag is the S3 chip column itself.
    let s3 = obsid_table.column("S3")?;
    let dropped = obsid_table.column("DROPPED_CHIP_CNT")?;
    let cnt_rate = obsid_table.column("EST_CNT_RATE")?;
    let chips = CHIP_COLUMNS
        .iter()
        .map(|name| obsid_table.column(name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut data = CatalogData::new();
    for row in 0..obsid_table.len() {
        let id = obsid_table.cell(row, obsid);
        let id: u32 = id
            .parse()
            .map_err(|_| CatalogError::Malformed(format!("bad OBSID value {id:?}")))?;
        let clocked = chips
            .iter()
            .filter(|&&chip| chip_is_clocked(obsid_table.cell(row, chip)))
            .count() as u32;
        let dropped_chips: u32 =
            parse_number(obsid_table.cell(row, dropped), "DROPPED_CHIP_CNT", 0)?;
        let rate: f64 = parse_number(obsid_table.cell(row, cnt_rate), "EST_CNT_RATE", 0.0)?;
        let seq_exposure = exposure
            .get(obsid_table.cell(row, seq))
            .copied()
            .unwrap_or(0.0);

        data.insert(
            Obsid(id),
            CatalogAttributes {
                grating: obsid_table.cell(row, grat).to_string(),
                ccd_count: clocked.saturating_sub(dropped_chips),
                s3: obsid_table.cell(row, s3).to_string(),
                num_counts: rate * seq_exposure,
            },
        );
    }
    Ok(data)
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

// =============================================================================
// CLIENT
// =============================================================================

/// Async Ocat client with retry.
#[derive(Debug, Clone)]
pub struct OcatClient {
    http: reqwest::Client,
    config: OcatConfig,
}

impl OcatClient {
    /// Create a client for `config`.
    pub fn new(config: OcatConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Fetch catalog attributes for `obsids`, retrying on failure.
    pub async fn fetch(&self, obsids: &[Obsid]) -> Result<CatalogData, CatalogError> {
        let attempts = self.config.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.fetch_once(obsids).await {
                Ok(data) => {
                    debug!(attempt, rows = data.len(), "Ocat fetch succeeded");
                    return Ok(data);
                }
                Err(error) if attempt < attempts => {
                    warn!(attempt, attempts, %error, "Ocat fetch failed, retrying");
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    warn!(attempts, %error, "Ocat fetch failed, giving up");
                    return Err(error);
                }
            }
        }
    }

    /// One attempt: the obsid request, then the sequence request.
    pub async fn fetch_once(&self, obsids: &[Obsid]) -> Result<CatalogData, CatalogError> {
        let obsid_table = self.get_table("obsid", &join(obsids)).await?;
        let sequences = sequence_numbers(&obsid_table)?;
        let seq_table = if sequences.is_empty() {
            OcatTable::default()
        } else {
            self.get_table("seqNum", &join(&sequences)).await?
        };
        catalog_from_tables(&obsid_table, &seq_table)
    }

    async fn get_table(&self, key: &str, values: &str) -> Result<OcatTable, CatalogError> {
        let response = self
            .http
            .get(&self.config.base_url)
            .query(&[("format", "text"), (key, values)])
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        OcatTable::parse(&body)
    }
}

/// [`OcatClient`] behind the synchronous [`CatalogSource`] trait.
///
/// Owns a current-thread runtime. Must not be called from inside another
/// tokio runtime.
#[derive(Debug)]
pub struct BlockingOcat {
    client: OcatClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingOcat {
    /// Wrap `client` with its own runtime.
    pub fn new(client: OcatClient) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { client, runtime })
    }
}

impl CatalogSource for BlockingOcat {
    fn fetch_catalog(&self, obsids: &[Obsid]) -> Result<CatalogData, CatalogError> {
        self.runtime.block_on(self.client.fetch(obsids))
    }
}

// =============================================================================
// TESTS
// =============================================================================
