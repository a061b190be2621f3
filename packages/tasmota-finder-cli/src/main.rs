//! Tasmota Finder CLI - find Tasmota devices on the local network
//!
//! Probes every address of the local /24 subnet with the Tasmota `STATUS`
//! web command and reports the devices that answer, either as an aligned
//! table or as a MAC-keyed JSON file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tasmota_finder_core::{config, report, scanner};

#[derive(Parser)]
#[command(name = "tasmota-finder")]
#[command(author = "Tasmota Finder Contributors")]
#[command(version)]
#[command(about = "Find Tasmota devices on the local network")]
#[command(long_about = "
Tasmota Finder probes every host of the local /24 subnet (derived from the
default gateway) with the Tasmota STATUS command and lists the devices that
answer. Nothing on the devices is changed.

Examples:
  Print a table:             tasmota-finder
  Write devices.json:        tasmota-finder --json
  Scan another subnet:       tasmota-finder --prefix 10.0.7
  Show configuration:        tasmota-finder config
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Write the MAC-keyed JSON report instead of printing a table
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// File written in JSON mode
    #[arg(short, long, global = true, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Seconds to wait for each HTTP request
    #[arg(
        short,
        long,
        global = true,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: Option<u64>,

    /// Scan this /24 (e.g. 192.168.1) instead of the default gateway's
    #[arg(short, long, global = true, value_name = "A.B.C")]
    pub prefix: Option<scanner::NetworkPrefix>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the local subnet (default)
    Scan,

    /// Show configuration paths and settings
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for JSON
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("tasmota_finder={},tasmota_finder_core={}", log_level, log_level).into()
            }),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        None | Some(Commands::Scan) => cmd_scan(&cli).await,
        Some(Commands::Config) => cmd_config(&cli),
    };

    if let Err(e) = outcome {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn effective_config(cli: &Cli) -> config::ScanConfig {
    config::load_scan_config()
        .with_timeout_secs(cli.timeout)
        .with_output_file(cli.output.clone())
}

async fn cmd_scan(cli: &Cli) -> Result<()> {
    let config = effective_config(cli);

    let prober = scanner::Prober::new(
        config.timeout(),
        config.port.value,
        config.partial_records.value,
    )
    .context("Failed to build HTTP client")?;

    let progress_callback: Option<scanner::ProgressCallback> = if cli.json {
        None
    } else {
        eprintln!("Please wait, this might take a while.");
        Some(Box::new(|progress: scanner::ScanProgress| {
            let show = match progress.stage {
                scanner::ScanStage::Probing => progress.probed % 51 == 0,
                _ => true,
            };
            if show {
                let pct = progress.probed * 100 / progress.total.max(1);
                eprintln!("  [{:>3}%] {}", pct, progress.message);
            }
        }))
    };

    let source: Box<dyn scanner::PrefixSource> = match cli.prefix {
        Some(prefix) => Box::new(scanner::FixedPrefix(prefix)),
        None => Box::new(scanner::SystemGateway),
    };

    let scan_result = scanner::scan_network(source.as_ref(), &prober, progress_callback)
        .await
        .context("Could not determine the local network")?;

    if cli.json {
        let path = &config.output_file.value;
        let json = report::write_json_report(path, &scan_result.devices)
            .with_context(|| format!("Could not write report to {}", path.display()))?;
        println!("{}", json);
    } else {
        println!();
        print!("{}", report::render_table(&scan_result.devices));
    }

    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let config = effective_config(cli);
    let config_path = config::get_config_file_path_string();
    let prefix = cli
        .prefix
        .map(|p| p.to_string())
        .unwrap_or_else(|| "default gateway".to_string());

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "config_file": config_path,
                "timeout_secs": config.timeout_secs.value,
                "port": config.port.value,
                "output_file": config.output_file.value.display().to_string(),
                "partial_records": config.partial_records.value.to_string(),
                "prefix": prefix,
            })
        );
        return Ok(());
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file:     {}", config_path);
    println!(
        "Timeout:         {}s (from {})",
        config.timeout_secs.value, config.timeout_secs.source
    );
    println!("Port:            {} (from {})", config.port.value, config.port.source);
    println!(
        "Output file:     {} (from {})",
        config.output_file.value.display(),
        config.output_file.source
    );
    println!(
        "Partial records: {} (from {})",
        config.partial_records.value, config.partial_records.source
    );
    println!("Network prefix:  {}", prefix);
    println!();
    println!("Environment variables:");
    println!("  TASMOTA_FINDER_TIMEOUT_SECS - Override request timeout");
    println!("  TASMOTA_FINDER_PORT         - Override HTTP port");
    println!("  TASMOTA_FINDER_OUTPUT       - Override JSON report path");
    println!("  TASMOTA_FINDER_PARTIAL      - keep | drop");
    println!();
    println!("Example config.toml:");
    println!();
    println!("{}", config::generate_example_config());

    Ok(())
}
