//! Wiring from a resolved configuration to a running pass.

use std::sync::Arc;

use curator_config::{CheckerConfig, LogFormatSetting, LoggingSettings};
use curator_repository::{RepositoryClient, ZenodoClient};
use curator_state::ProcessedStore;
use curator_telemetry::{LogFormat, LoggingConfig, Metrics};
use tracing::{info, warn};

use crate::controller::{RunController, RunSummary};
use crate::error::{AppError, AppResult};

/// Collaborators built from configuration for the binary entrypoint.
pub struct BootstrapDependencies {
    config: CheckerConfig,
    client: Arc<dyn RepositoryClient>,
    metrics: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client or the metrics registry cannot be built.
    pub fn from_config(config: CheckerConfig) -> AppResult<Self> {
        let client = ZenodoClient::new(
            config.api_base.clone(),
            config.access_token.expose(),
            config.http_timeout,
        )
        .map_err(|err| AppError::repository("repository.client", err))?;
        let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self {
            config,
            client: Arc::new(client),
            metrics,
        })
    }

    /// Swap the repository client, keeping every other collaborator.
    #[must_use]
    pub fn with_client(mut self, client: Arc<dyn RepositoryClient>) -> Self {
        self.client = client;
        self
    }

    /// Assemble the run controller.
    #[must_use]
    pub fn into_controller(self) -> RunController {
        let Self {
            config,
            client,
            metrics,
        } = self;
        RunController::new(
            config.community_id,
            client,
            ProcessedStore::new(config.processed_file),
            config.scratch,
            metrics,
        )
        .with_metrics_file(config.metrics_file)
    }
}

/// Install the global subscriber described by `settings`.
///
/// # Errors
///
/// Returns an error when the log file cannot be opened or a subscriber is already
/// installed.
pub fn init_logging(settings: &LoggingSettings) -> AppResult<()> {
    let format = settings.format.map_or_else(LogFormat::infer, |format| match format {
        LogFormatSetting::Pretty => LogFormat::Pretty,
        LogFormatSetting::Json => LogFormat::Json,
    });
    let logging = LoggingConfig {
        level: &settings.level,
        format,
        file: settings.file.as_deref(),
        ..LoggingConfig::default()
    };
    curator_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))
}

/// Run one checker pass for `config`, stopping early on Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if logging, dependency construction, or scratch allocation fails.
pub async fn run_checker(config: CheckerConfig) -> AppResult<RunSummary> {
    init_logging(&config.logging)?;
    info!(
        build_sha = curator_telemetry::build_sha(),
        community_id = %config.community_id,
        api_base = %config.api_base,
        "curator submission checker starting"
    );
    let controller = BootstrapDependencies::from_config(config)?.into_controller();
    controller.run_until(shutdown_signal()).await
}

/// Resolves on the first Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    tokio::select! {
        () = interrupt() => info!("received SIGINT"),
        () = terminate() => info!("received SIGTERM"),
    }
}

async fn interrupt() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "could not listen for SIGINT");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(err) => {
            warn!(error = %err, "could not listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
