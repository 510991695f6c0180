use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kongfig")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative configuration for the Kong admin API", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Delete everything on the gateway, then rebuild services and routes
    Apply(ApplyArgs),

    /// Create the declared plugins only
    Plugins(TargetArgs),

    /// Check a config file for broken references without contacting the gateway
    Validate {
        /// Path to the YAML config file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared Arguments
// ============================================================================

/// Config file plus connection overrides
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Path to the YAML config file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Admin API host, overriding `host` in the config file
    #[arg(long, env = "KONGFIG_HOST")]
    pub host: Option<String>,

    /// Per-request timeout in seconds
    #[arg(
        long,
        default_value = "5",
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,
}

// ============================================================================
// Apply
// ============================================================================

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Also create declared plugins once routes are rebuilt
    #[arg(long)]
    pub plugins: bool,

    /// Refuse to run when routes, plugins or credentials reference undeclared entities
    #[arg(long)]
    pub validate: bool,
}
