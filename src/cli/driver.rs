//! Driver - from command-line arguments to a process exit code

use crate::cli::Cli;
use crate::console::{ConsoleSink, Message, Style, TerminalConsole, Verbosity};
use crate::core::{Pipeline, Pipelines};
use crate::execution::ExecutionEngine;
use std::ffi::OsString;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOGO: &[&str] = &[
    "     _                    _                     _ ",
    " ___| |_ __ _  __ _  ___ | |__   __ _ _ __   __| |",
    "/ __| __/ _` |/ _` |/ _ \\| '_ \\ / _` | '_ \\ / _` |",
    "\\__ \\ || (_| | (_| |  __/| | | | (_| | | | | (_| |",
    "|___/\\__\\__,_|\\__, |\\___||_| |_|\\__,_|_| |_|\\__,_|",
    "              |___/                               ",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Unknown pipeline '{name}'. Available pipelines: {available}")]
    UnknownPipeline { name: String, available: String },

    #[error("No pipeline given and no default pipeline is set. Available pipelines: {available}")]
    NoDefaultPipeline { available: String },
}

/// Pick the pipeline named on the command line, or the default one
pub fn resolve<'a>(pipelines: &'a Pipelines, name: Option<&str>) -> Result<&'a Pipeline, DriverError> {
    let available = || {
        let names = pipelines.names();
        if names.is_empty() {
            "(none)".to_string()
        } else {
            names.join(", ")
        }
    };

    match name {
        Some(name) => pipelines.find(name).ok_or_else(|| DriverError::UnknownPipeline {
            name: name.to_string(),
            available: available(),
        }),
        None => pipelines
            .default_target()
            .ok_or_else(|| DriverError::NoDefaultPipeline {
                available: available(),
            }),
    }
}

/// Parse `args`, run the selected pipeline and return the exit code
///
/// `args` includes the program name, as with [`std::env::args_os`].
pub async fn run_with_args<I, T>(pipelines: &Pipelines, args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return e.exit_code();
        }
    };

    init_tracing(cli.verbosity);
    let console: Arc<dyn ConsoleSink> = Arc::new(TerminalConsole::new(cli.verbosity, cli.output));

    let pipeline = match resolve(pipelines, cli.pipeline.as_deref()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            warn!("{}", e);
            console.write(&[Message::error(e.to_string())]);
            return 1;
        }
    };

    if !cli.no_logo {
        print_logo(console.as_ref());
    }

    let cancellation = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancellation = cancellation.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, cancelling run");
                cancellation.cancel();
            }
        }
    });

    let report = ExecutionEngine::new(console)
        .run(pipeline, cancellation, cli.extra_args)
        .await;
    interrupt.abort();

    report.exit_code()
}

fn print_logo(console: &dyn ConsoleSink) {
    let style = Style::new().cyan().bold();
    let lines: Vec<Message> = LOGO
        .iter()
        .map(|line| Message::info("").styled(*line, style.clone()))
        .collect();
    console.write(&lines);
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the verbosity-derived default. Tracing output goes
/// to stderr so it never mixes with step output.
fn init_tracing(verbosity: Verbosity) {
    let default = if verbosity == Verbosity::All { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed by the host program or a test.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

impl Pipelines {
    /// Run with the process's own command-line arguments
    pub async fn run(&self) -> i32 {
        run_with_args(self, std::env::args_os()).await
    }

    /// Run with explicit command-line arguments, program name first
    pub async fn run_with_args<I, T>(&self, args: I) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        run_with_args(self, args).await
    }
}
