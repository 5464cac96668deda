//! # Configuration
//!
//! Command-line arguments, with environment-variable fallbacks for the
//! catalog connection.

use crate::ocat::{DEFAULT_ATTEMPTS, DEFAULT_OCAT_URL, OcatConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Extract obsid intervals from commanded states and sort them into ACIS
/// focal-plane thermal-limit buckets.
#[derive(Debug, Parser)]
#[command(name = "acisfp", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Emit JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the instrument in the focal plane for a sim position.
    FocalPlane {
        #[arg(allow_negative_numbers = true)]
        simpos: i64,
    },
    /// Extract and enrich obsid intervals from a commanded-state JSON file.
    Intervals {
        /// JSON array of commanded states.
        states: PathBuf,
    },
    /// Run the full pipeline and print the thermal-limit buckets.
    Classify {
        /// JSON array of commanded states.
        states: PathBuf,
    },
}

/// Where catalog attributes come from.
#[derive(Debug, Clone, Args)]
pub struct CatalogArgs {
    /// Ocat details endpoint.
    #[arg(long, env = "ACISFP_OCAT_URL", default_value = DEFAULT_OCAT_URL, global = true)]
    pub ocat_url: String,

    /// Fetch attempts before giving up on the catalog.
    #[arg(
        long,
        env = "ACISFP_OCAT_ATTEMPTS",
        default_value_t = DEFAULT_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..),
        global = true
    )]
    pub ocat_attempts: u32,

    /// Delay between catalog attempts, in milliseconds.
    #[arg(long, env = "ACISFP_OCAT_RETRY_DELAY_MS", default_value_t = 5_000, global = true)]
    pub ocat_retry_delay_ms: u64,

    /// Per-request catalog timeout, in seconds.
    #[arg(long, env = "ACISFP_OCAT_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub ocat_timeout_secs: u64,

    /// Do not contact the catalog; intervals stay unenriched.
    #[arg(long, conflicts_with = "catalog", global = true)]
    pub offline: bool,

    /// Read catalog rows from a JSON file instead of the network.
    #[arg(long, value_name = "FILE", global = true)]
    pub catalog: Option<PathBuf>,
}

/// Resolved catalog choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogChoice {
    Offline,
    File(PathBuf),
    Ocat(OcatConfig),
}

impl CatalogArgs {
    /// Ocat connection settings from these arguments.
    #[must_use]
    pub fn ocat_config(&self) -> OcatConfig {
        OcatConfig {
            base_url: self.ocat_url.clone(),
            attempts: self.ocat_attempts,
            retry_delay: Duration::from_millis(self.ocat_retry_delay_ms),
            timeout: Duration::from_secs(self.ocat_timeout_secs),
        }
    }

    /// Which catalog source the arguments select.
    #[must_use]
    pub fn choice(&self) -> CatalogChoice {
        if self.offline {
            CatalogChoice::Offline
        } else if let Some(path) = &self.catalog {
            CatalogChoice::File(path.clone())
        } else {
            CatalogChoice::Ocat(self.ocat_config())
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
