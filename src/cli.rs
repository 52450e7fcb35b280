//! CLI argument parsing using clap v4

use clap::{Args, Parser, Subcommand};

/// hwprobe - CPU and GPU capability probe
///
/// Prints JSON capability reports on stdout. Diagnostics go to stderr.
#[derive(Parser, Debug)]
#[command(name = "hwprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long = "config", id = "config_path", env = "HWPROBE_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Report output options shared by probe commands
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct OutputArgs {
    /// Pretty-print the JSON report
    #[arg(short, long)]
    pub pretty: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe the CPU and print its report
    Cpu {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Probe the GPU and print its report
    Gpu {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Probe both and print {"cpu": ..., "gpu": ...}
    All {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration
    Show,

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration
    Validate,
}
