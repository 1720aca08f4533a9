//! CLI argument definitions using Clap

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::transcription::ProcessingTier;

/// Config keys accepted by `config set` / `config get`
pub const VALID_CONFIG_KEYS: [&str; 7] = [
    "engine_url",
    "user_jwt",
    "tier",
    "job_deadline_secs",
    "poll_interval_secs",
    "max_concurrent_jobs",
    "replay_buffer",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

/// Pluct Transcribe - submit a video URL for transcription and watch progress
#[derive(Parser, Debug)]
#[command(name = "pluct-transcribe")]
#[command(version)]
#[command(about = "Submit a video URL to the Pluct Business Engine and track it to a transcript")]
#[command(long_about = None)]
pub struct Cli {
    /// Video URL to transcribe
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Processing tier
    #[arg(short, long, value_name = "TIER")]
    pub tier: Option<TierArg>,

    /// Emit progress events as JSON lines instead of a progress bar
    #[arg(long)]
    pub json: bool,

    /// Business Engine base URL (overrides config file)
    #[arg(long, value_name = "URL")]
    pub engine_url: Option<String>,

    /// Overall job deadline in seconds
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Status poll interval in seconds
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create a config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Value to set
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// Show the full merged configuration
    Show,
    /// Print the config file path
    Path,
}

/// Processing tier argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TierArg {
    /// Fast transcript-only pass
    QuickScan,
    /// Full pipeline with downstream AI analysis
    AiAnalysis,
}

impl From<TierArg> for ProcessingTier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::QuickScan => ProcessingTier::QuickScan,
            TierArg::AiAnalysis => ProcessingTier::AiAnalysis,
        }
    }
}
