//! Command-line interface

pub mod driver;

pub use driver::{run_with_args, DriverError};

use crate::console::{OutputMode, Verbosity};
use clap::Parser;
use std::ffi::OsString;

/// Runs one of the pipelines a build program defines
#[derive(Debug, Parser, Clone)]
#[command(name = "stagehand")]
#[command(version)]
#[command(about = "Run build and task pipelines", long_about = None)]
pub struct Cli {
    /// Pipeline to run; the default pipeline when omitted
    pub pipeline: Option<String>,

    /// How much console output to produce
    #[arg(long, value_enum, default_value_t = Verbosity::Normal)]
    pub verbosity: Verbosity,

    /// Console rendering mode
    #[arg(long, value_enum, default_value_t = OutputMode::Standard)]
    pub output: OutputMode,

    /// Don't print the logo
    #[arg(long)]
    pub no_logo: bool,

    /// Arguments after `--`, handed to every step
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

impl Cli {
    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
