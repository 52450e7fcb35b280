//! hwprobe - CPU and GPU capability probe
//!
//! Reports go to stdout as JSON; logs go to stderr.

mod cli;

use std::io::Write;

use clap::Parser;
use tracing::info;

use hwprobe::config::{self, ProbeConfig};
use hwprobe::cpu::CpuProbe;
use hwprobe::error::Result;
use hwprobe::format::to_json;
use hwprobe::gpu::detect_gpu_with;
use hwprobe::{logging, version, HardwareReport};

use crate::cli::{Cli, Commands, ConfigSubcommand};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Version => {
            print!("{}", version::build_info());
            return Ok(());
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(subcommand.clone(), cli.config.as_deref());
        }
        _ => {}
    }

    let config = ProbeConfig::load(cli.config.as_deref())?;

    // Guards must outlive the probe so file logs are flushed
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    info!(
        version = %build.full_version(),
        target = %build.target,
        features = %build.features,
        "Starting hwprobe"
    );

    let json = match cli.command {
        Commands::Cpu { output } => {
            let report = CpuProbe::from_settings(&config.cpu).probe();
            to_json(&report, output.pretty || config.output.pretty)?
        }
        Commands::Gpu { output } => {
            let report = detect_gpu_with(&config.gpu);
            to_json(&report, output.pretty || config.output.pretty)?
        }
        Commands::All { output } => {
            let report = HardwareReport::collect(&config);
            to_json(&report, output.pretty || config.output.pretty)?
        }
        Commands::Version | Commands::Config { .. } => unreachable!("handled above"),
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    stdout.flush()?;

    Ok(())
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand, config_path: Option<&str>) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            let cfg = ProbeConfig::load(config_path)?;
            print!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate => {
            ProbeConfig::load(config_path)?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
