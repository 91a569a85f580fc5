//! canbus-query - List CAN nodes that are waiting for a node id
//!
//! Broadcasts an admin query on each interface and prints the uuid and
//! running application of every node that answers.

mod config;
mod report;

use anyhow::Result;
use canquery_discovery::{list_can_interfaces, DriverError, Reporter, RunSummary};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::OutputFormat;
use crate::report::{JsonReporter, TextReporter};

#[derive(Parser, Debug)]
#[command(name = "canbus-query")]
#[command(about = "Query CAN buses for nodes without an assigned node id")]
#[command(version)]
struct Args {
    /// CAN interfaces to query (default: every canN interface on the host)
    interfaces: Vec<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "canbus-query.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Print one JSON object per interface instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for the report
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    debug!("canbus-query v{}", env!("CARGO_PKG_VERSION"));

    let config = config::load_config(&args.config)?;

    let interfaces = if !args.interfaces.is_empty() {
        args.interfaces
    } else if !config.discovery.interfaces.is_empty() {
        config.discovery.interfaces.clone()
    } else {
        list_can_interfaces(&config.discovery.sysfs_net, &config.discovery.interface_prefix)
    };

    info!(interfaces = ?interfaces, "Starting discovery");

    let format = if args.json {
        OutputFormat::Json
    } else {
        config.output.format
    };
    let mut reporter: Box<dyn Reporter> = match format {
        OutputFormat::Text => Box::new(TextReporter::new(io::stdout(), io::stderr())),
        OutputFormat::Json => Box::new(JsonReporter::new(io::stdout())),
    };

    let summary = match query(&interfaces, reporter.as_mut()) {
        Ok(summary) => summary,
        Err(e) => match e.downcast_ref::<DriverError>() {
            Some(DriverError::NoInterfaces) => {
                eprintln!("{}!", e);
                return Ok(ExitCode::FAILURE);
            }
            None => return Err(e),
        },
    };

    info!(
        attempted = summary.attempted,
        failed = summary.failed,
        devices = summary.devices,
        "Discovery finished"
    );

    Ok(if summary.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(all(target_os = "linux", feature = "socketcan"))]
fn query(interfaces: &[String], reporter: &mut dyn Reporter) -> Result<RunSummary> {
    use canquery_discovery::{run_interfaces, SocketCanTransport, SystemClock};

    Ok(run_interfaces(&SocketCanTransport, &SystemClock, interfaces, reporter)?)
}

#[cfg(not(all(target_os = "linux", feature = "socketcan")))]
fn query(_interfaces: &[String], _reporter: &mut dyn Reporter) -> Result<RunSummary> {
    anyhow::bail!("SocketCAN support is not available in this build")
}
