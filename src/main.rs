//! hoptrace - sequential UDP traceroute.
//!
//! This is the command-line interface for the hoptrace library.

use anyhow::{Context, Result};
use clap::Parser;
use hoptrace::{
    resolve_target, trace, JsonReporter, TextReporter, TraceOutcome, TraceSummary,
    TracerouteConfig, TracerouteError, DEFAULT_PROBE_PORT, MAX_HOP_CEILING,
};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit status when the hop ceiling is hit without reaching the destination
const EXIT_INCOMPLETE: u8 = 3;

/// Get the version string for hoptrace
fn get_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(env!("CARGO_PKG_VERSION"), "-UNRELEASED")
    } else {
        env!("CARGO_PKG_VERSION")
    }
}

/// Command-line arguments for the traceroute tool.
#[derive(Parser, Debug)]
#[clap(version = get_version(), about = "Sequential UDP traceroute using ICMP replies", long_about = None)]
struct Args {
    /// Target hostname or IPv4 address
    host: String,

    /// Maximum number of hops (at most 30)
    #[clap(short = 'm', long, default_value_t = MAX_HOP_CEILING,
           value_parser = clap::value_parser!(u8).range(1..=i64::from(MAX_HOP_CEILING)))]
    max_hops: u8,

    /// How long to wait for each hop's reply, in milliseconds
    #[clap(short = 'w', long, default_value_t = 2000,
           value_parser = clap::value_parser!(u64).range(1..))]
    probe_timeout_ms: u64,

    /// Destination UDP port for probes
    #[clap(short, long, default_value_t = DEFAULT_PROBE_PORT,
           value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Output newline-delimited JSON records
    #[clap(long)]
    json: bool,

    /// Enable verbose logging to stderr (use -vv for packet-level detail)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(summary) => {
            if let TraceOutcome::Incomplete { max_hops } = summary.outcome {
                eprintln!(
                    "no conclusive route to {} ({}) after {} hops",
                    summary.target, summary.target_ip, max_hops
                );
            }
            ExitCode::from(exit_status(&summary))
        }
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Set up stderr logging; `RUST_LOG` takes precedence over `-v`
fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "hoptrace=debug,warn",
        _ => "hoptrace=trace,info",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<TraceSummary> {
    // Only name resolution is async
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;
    let target_ip = runtime.block_on(resolve_target(&args.host))?;
    drop(runtime);

    let config = TracerouteConfig::builder()
        .target(&args.host)
        .target_ip(target_ip)
        .max_hops(args.max_hops)
        .probe_timeout(Duration::from_millis(args.probe_timeout_ms))
        .port(args.port)
        .build()
        .map_err(TracerouteError::ConfigError)?;

    let summary = if args.json {
        trace(config, &mut JsonReporter::new(std::io::stdout()))?
    } else {
        trace(config, &mut TextReporter::new(std::io::stdout()))?
    };
    Ok(summary)
}

/// Process exit status for a finished run
fn exit_status(summary: &TraceSummary) -> u8 {
    match summary.outcome {
        TraceOutcome::Reached { .. } => 0,
        TraceOutcome::Incomplete { .. } => EXIT_INCOMPLETE,
    }
}

/// Print a single diagnostic for a fatal error
fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<TracerouteError>() {
        Some(TracerouteError::InsufficientPermissions {
            required,
            suggestion,
        }) => {
            eprintln!("Error: Insufficient permissions");
            eprintln!("Required: {}", required);
            eprintln!("Suggestion: {}", suggestion);
        }
        Some(e @ TracerouteError::ResolutionError { .. }) => {
            eprintln!("Error: {}", e);
            eprintln!("Please check the hostname and your network connection.");
        }
        Some(TracerouteError::Ipv6NotSupported) => {
            eprintln!("Error: IPv6 targets are not supported");
            eprintln!("Please use an IPv4 address or a hostname with an A record.");
        }
        Some(TracerouteError::ConfigError(msg)) => {
            eprintln!("Error: Invalid configuration - {}", msg);
            eprintln!("Run 'hoptrace --help' for usage information.");
        }
        Some(e) => eprintln!("Error: {}", e),
        None => eprintln!("Error: {:#}", err),
    }
}
