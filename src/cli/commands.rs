use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::case::CaseStatus;

#[derive(Parser)]
#[command(name = "relief-verify")]
#[command(author, version, about = "Forensic verification for disaster relief claims", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Path to the TOML configuration file
    #[arg(
        long,
        global = true,
        env = "RELIEF_VERIFY_CONFIG",
        default_value = "relief-verify.toml"
    )]
    pub config: PathBuf,
}

/// Output format for CLI results.
/// - Text: Human-readable text output (default)
/// - Json: Pretty-printed JSON
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify the identifiers in an extraction file
    Verify {
        /// Extraction JSON (`{"identifiers": [...], "rawContext": ...}`), or `-` for stdin
        input: PathBuf,

        /// Location hints forwarded to registry checks
        #[arg(long = "location", short = 'l')]
        locations: Vec<String>,
    },

    /// Show a stored case
    Show {
        /// Case ID
        case_id: String,
    },

    /// List stored cases, newest first
    List {
        /// Filter by status
        #[arg(long, value_enum)]
        status: Option<StatusFilterArg>,

        /// Maximum number of cases to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show monitored and debunked counts
    Stats,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilterArg {
    Investigating,
    Completed,
    Failed,
}

impl From<StatusFilterArg> for CaseStatus {
    fn from(arg: StatusFilterArg) -> Self {
        match arg {
            StatusFilterArg::Investigating => Self::Investigating,
            StatusFilterArg::Completed => Self::Completed,
            StatusFilterArg::Failed => Self::Failed,
        }
    }
}
