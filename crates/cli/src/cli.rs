use std::path::PathBuf;

use adval_validation::ValidationType;
use clap::{Parser, Subcommand};

/// Validate anomaly-detector configurations against live data.
///
/// Connection settings come from `OPENSEARCH_*` environment variables (or a
/// `.env` file); validation tunables from `ADVAL_*` variables or `--settings`.
#[derive(Parser, Debug)]
#[command(name = "adval", about = "Anomaly-detector configuration validator")]
pub struct CliArgs {
    /// YAML/JSON file overriding validation tunables
    #[arg(long, global = true, env = "ADVAL_SETTINGS_FILE")]
    pub settings: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check whether the data supports the detector as configured
    Validate {
        /// Detector definition (YAML or JSON)
        #[arg(long, short)]
        detector: PathBuf,

        /// How deep to validate
        #[arg(long = "type", value_enum, default_value_t = ValidationType::Model)]
        kind: ValidationType,
    },

    /// Suggest interval, history and window delay
    Suggest {
        /// Detector definition (YAML or JSON)
        #[arg(long, short)]
        detector: PathBuf,

        /// Comma-separated parameters: interval, history, window_delay
        #[arg(long, default_value = "interval,history,window_delay")]
        params: String,
    },
}
