//! Command-line surface of the `curator` binary.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use curator_config::{ConfigLoader, ConfigOverrides};
use curator_state::{ProcessedSet, ProcessedStore};
use serde::Serialize;

use crate::bootstrap::run_checker;
use crate::error::{AppError, AppResult};

/// Parses CLI arguments, executes the requested command, and returns the process
/// exit code.
pub async fn run() -> i32 {
    execute(Cli::parse()).await
}

async fn execute(cli: Cli) -> i32 {
    match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> AppResult<i32> {
    let loader = ConfigLoader::new()
        .with_file(cli.config)
        .with_overrides(cli.settings.into_overrides());
    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let config = loader
                .load()
                .map_err(|err| AppError::config("config.load", err))?;
            let summary = run_checker(config).await?;
            Ok(summary.exit_code())
        }
        Command::Processed(args) => {
            let path = loader
                .processed_file()
                .map_err(|err| AppError::config("config.processed_file", err))?;
            let set = ProcessedStore::new(&path)
                .try_load()
                .map_err(|err| AppError::state("processed.load", err))?
                .unwrap_or_default();
            let mut stdout = io::stdout().lock();
            render_processed(&mut stdout, &set, args.output).map_err(|source| AppError::Io {
                operation: "processed.print",
                path: Some(path),
                source,
            })?;
            Ok(0)
        }
    }
}

#[derive(Serialize)]
struct ProcessedView<'a> {
    processed_ids: Vec<&'a str>,
    last_updated: Option<String>,
}

fn render_processed(
    out: &mut impl Write,
    set: &ProcessedSet,
    format: OutputFormat,
) -> io::Result<()> {
    let last_updated = set.last_updated().map(|ts| ts.to_rfc3339());
    match format {
        OutputFormat::Json => {
            let view = ProcessedView {
                processed_ids: set.ids().collect(),
                last_updated,
            };
            serde_json::to_writer_pretty(&mut *out, &view).map_err(io::Error::other)?;
            writeln!(out)
        }
        OutputFormat::Text => {
            for id in set.ids() {
                writeln!(out, "{id}")?;
            }
            writeln!(
                out,
                "{} processed, last updated {}",
                set.len(),
                last_updated.as_deref().unwrap_or("never")
            )
        }
    }
}

#[derive(Parser)]
#[command(
    name = "curator",
    about = "Checks new submissions to a Zenodo community",
    version
)]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true, env = "CURATOR_CONFIG")]
    config: Option<PathBuf>,
    #[command(flatten)]
    settings: SettingsArgs,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args)]
struct SettingsArgs {
    /// Community whose inclusion requests are checked.
    #[arg(long, global = true, env = "CURATOR_COMMUNITY_ID")]
    community_id: Option<String>,
    /// API access token.
    #[arg(long, global = true, env = "CURATOR_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
    /// Base URL of the repository API.
    #[arg(long, global = true, env = "CURATOR_API_BASE")]
    api_base: Option<String>,
    /// Location of the processed-set document.
    #[arg(long, global = true, env = "CURATOR_PROCESSED_FILE")]
    processed_file: Option<PathBuf>,
    /// Parent directory of the per-run scratch root.
    #[arg(long, global = true, env = "CURATOR_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,
    /// Name prefix of the scratch root.
    #[arg(long, global = true, env = "CURATOR_SCRATCH_PREFIX")]
    scratch_prefix: Option<String>,
    /// Timeout for each remote call, in seconds.
    #[arg(long, global = true, env = "CURATOR_HTTP_TIMEOUT_SECS")]
    http_timeout_secs: Option<u64>,
    /// Default log level when `RUST_LOG` is unset.
    #[arg(long, global = true, env = "CURATOR_LOG_LEVEL")]
    log_level: Option<String>,
    /// Log format (`pretty` or `json`).
    #[arg(long, global = true, env = "CURATOR_LOG_FORMAT")]
    log_format: Option<String>,
    /// File receiving a plain-text copy of the logs.
    #[arg(long, global = true, env = "CURATOR_LOG_FILE")]
    log_file: Option<PathBuf>,
    /// Prometheus textfile written at the end of a run.
    #[arg(long, global = true, env = "CURATOR_METRICS_FILE")]
    metrics_file: Option<PathBuf>,
}

impl SettingsArgs {
    fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            community_id: self.community_id,
            access_token: self.access_token,
            api_base: self.api_base,
            processed_file: self.processed_file,
            scratch_parent: self.scratch_dir,
            scratch_prefix: self.scratch_prefix,
            http_timeout_secs: self.http_timeout_secs,
            log_level: self.log_level,
            log_format: self.log_format,
            log_file: self.log_file,
            metrics_file: self.metrics_file,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run one pass over the community's requests (default).
    Run,
    /// Print the persisted processed-set.
    Processed(ProcessedArgs),
}

#[derive(Args)]
struct ProcessedArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    type TestResult<T> = anyhow::Result<T>;

    #[test]
    #[serial]
    fn flags_map_onto_config_overrides() -> TestResult<()> {
        let cli = Cli::try_parse_from([
            "curator",
            "run",
            "--community-id",
            "epfl",
            "--access-token",
            "secret",
            "--scratch-dir",
            "/srv/scratch",
            "--http-timeout-secs",
            "15",
        ])?;
        assert!(matches!(cli.command, Some(Command::Run)));
        let overrides = cli.settings.into_overrides();
        assert_eq!(overrides.community_id.as_deref(), Some("epfl"));
        assert_eq!(overrides.access_token.as_deref(), Some("secret"));
        assert_eq!(overrides.scratch_parent, Some(PathBuf::from("/srv/scratch")));
        assert_eq!(overrides.http_timeout_secs, Some(15));
        Ok(())
    }

    #[test]
    #[serial]
    fn bare_invocation_runs_a_pass() -> TestResult<()> {
        let cli = Cli::try_parse_from(["curator"])?;
        assert!(cli.command.is_none());
        Ok(())
    }

    #[test]
    fn processed_set_renders_as_text_and_json() -> TestResult<()> {
        let set: ProcessedSet = ["req-2", "req-1"].into_iter().collect();

        let mut text = Vec::new();
        render_processed(&mut text, &set, OutputFormat::Text)?;
        let text = String::from_utf8(text)?;
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            ["req-1", "req-2", "2 processed, last updated never"]
        );

        let mut json = Vec::new();
        render_processed(&mut json, &set, OutputFormat::Json)?;
        let value: serde_json::Value = serde_json::from_slice(&json)?;
        assert_eq!(value["processed_ids"], serde_json::json!(["req-1", "req-2"]));
        assert!(value["last_updated"].is_null());
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn missing_credentials_exit_with_config_code() -> TestResult<()> {
        if std::env::var_os("CURATOR_COMMUNITY_ID").is_some()
            || std::env::var_os("CURATOR_ACCESS_TOKEN").is_some()
        {
            return Ok(());
        }
        let dir = tempfile::tempdir()?;
        let processed = dir.path().join("processed.json");
        let processed = processed.to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(["curator", "run", "--processed-file", processed.as_str()])?;
        assert_eq!(execute(cli).await, crate::error::EXIT_CONFIG);
        Ok(())
    }
}
