//! Command-line bridge between an intersection counting controller and MySQL.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use kruisteller_core::bridge::{Bridge, SystemSerial};
use kruisteller_core::config::DEFAULT_CONFIG_FILE;
use kruisteller_core::db::MySqlGateway;
use kruisteller_core::protocol::list_ports;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "kruisteller=info,kruisteller_core=info";
const VERBOSE_LOG_FILTER: &str = "kruisteller=debug,kruisteller_core=debug";

/// Forward vehicle counts from a serial controller to the database.
#[derive(Parser, Debug)]
#[command(name = "kruisteller")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML config file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Serial device to open instead of the first one found.
    #[arg(short, long)]
    port: Option<String>,

    /// Print the detected serial ports and exit.
    #[arg(long)]
    list_ports: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    // Serial echo owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list_ports {
        let ports = list_ports()?;
        if ports.is_empty() {
            println!("No serial ports found!");
        }
        for port in ports {
            println!("{}", port);
        }
        return Ok(());
    }

    let mut bridge = Bridge::new(SystemSerial, std::io::stdout()).with_port_override(args.port);
    let mut gateway = None;
    let result = bridge
        .run(&args.config, |config| {
            let pool = MySqlGateway::connect_lazy(&config.mysql);
            gateway = Some(pool.clone());
            pool
        })
        .await;

    match result {
        Ok(summary) => {
            info!(
                lines = summary.lines,
                events = summary.events,
                malformed = summary.malformed,
                write_warnings = summary.write_warnings,
                "Serial stream ended"
            );
            if let Some(gateway) = gateway {
                gateway.close().await;
            }
        }
        Err(e) if e.is_fatal_in_stream() => {
            error!("{}", e);
            std::process::exit(1);
        }
        Err(e) => error!("{}", e),
    }

    Ok(())
}
