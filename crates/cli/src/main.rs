mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use adval_core::config::load_dotenv;
use adval_core::{Config, DetectorConfig, ValidationSettings};
use adval_opensearch::OpenSearchClient;
use adval_validation::suggest::parse_suggest_names;
use adval_validation::{
    DataSource, ModelValidator, ParameterSuggestions, ValidationIssue, ValidationOutcome,
};

use crate::cli::{CliArgs, Command};

#[derive(Serialize)]
struct ValidateOutput<'a> {
    detector: &'a str,
    #[serde(flatten)]
    outcome: &'a ValidationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    issue: Option<ValidationIssue>,
}

#[derive(Serialize)]
struct SuggestOutput<'a> {
    detector: &'a str,
    suggestions: &'a ParameterSuggestions,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(path) = &args.settings {
        config.validation = load_settings(path)?;
    }
    config.log_summary();

    let client = OpenSearchClient::new(&config.opensearch).context("failed to build OpenSearch client")?;
    info!(url = %client.base_url(), "OpenSearch client ready");
    let source: Arc<dyn DataSource> = Arc::new(client);
    let validator = ModelValidator::new(source, config.validation.clone())?;

    match args.command {
        Command::Validate { detector, kind } => {
            let detector = load_detector(&detector)?;

            let report = validator
                .spawn(detector.clone(), kind)
                .await
                .context("validation task ended without a result")?;
            let outcome = report.with_context(|| format!("validation of '{}' failed", detector.name))?;

            print_json(
                &ValidateOutput {
                    detector: &detector.name,
                    outcome: &outcome,
                    issue: outcome.issue(),
                },
                args.pretty,
            )?;
        }
        Command::Suggest { detector, params } => {
            let names = parse_suggest_names(&params)?;
            let detector = load_detector(&detector)?;

            let suggestions = validator
                .suggest(&detector, &names)
                .await
                .with_context(|| format!("suggestion for '{}' failed", detector.name))?;

            print_json(
                &SuggestOutput {
                    detector: &detector.name,
                    suggestions: &suggestions,
                },
                args.pretty,
            )?;
        }
    }

    Ok(())
}

fn load_detector(path: &Path) -> Result<DetectorConfig> {
    DetectorConfig::load(path).with_context(|| format!("failed to load detector from {}", path.display()))
}

fn load_settings(path: &Path) -> Result<ValidationSettings> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let settings: ValidationSettings =
        serde_yaml::from_str(&raw).with_context(|| format!("failed to parse settings in {}", path.display()))?;
    settings
        .validate()
        .with_context(|| format!("rejected settings in {}", path.display()))?;
    Ok(settings)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}
