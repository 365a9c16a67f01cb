//! One pass over a community's inclusion requests.
//!
//! # Design
//! - The scratch root is allocated before listing and destroyed before returning,
//!   whether the pass finished, found nothing, or was interrupted.
//! - Already-processed and duplicate request ids never reach the processor.
//! - The processed set is saved after a pass that ran (including an interrupted one);
//!   it only ever contains requests whose workflow completed.

use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use curator_config::ScratchSettings;
use curator_fsops::{FileValidator, ScratchRoot};
use curator_repository::{RepositoryClient, SubmissionRequest};
use curator_state::{ProcessedSet, ProcessedStore};
use curator_telemetry::Metrics;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult, EXIT_FAILURE, EXIT_PARTIAL};
use crate::processor::SubmissionProcessor;

/// Counters describing one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Requests returned by the listing call.
    pub listed: usize,
    /// Listed requests skipped because they were already processed.
    pub already_processed: usize,
    /// Distinct requests not seen before this pass.
    pub new_requests: usize,
    /// New requests handed to the processor.
    pub attempted: usize,
    /// New requests whose workflow ran to completion.
    pub completed: usize,
    /// Whether a shutdown signal cut the pass short.
    pub interrupted: bool,
    /// Whether the listing call failed.
    pub listing_failed: bool,
}

impl RunSummary {
    /// New requests that were not run to completion.
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.new_requests.saturating_sub(self.completed)
    }

    /// Process exit code for this pass.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.listing_failed {
            EXIT_FAILURE
        } else if self.pending() > 0 {
            EXIT_PARTIAL
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassEnd {
    Finished,
    NothingListed,
    ListingFailed,
    Interrupted,
}

/// Drives the list, filter, process and persist pass.
pub struct RunController {
    community_id: String,
    client: Arc<dyn RepositoryClient>,
    store: ProcessedStore,
    processor: SubmissionProcessor,
    scratch: ScratchSettings,
    metrics: Metrics,
    metrics_file: Option<PathBuf>,
}

impl RunController {
    /// Build a controller for `community_id`.
    #[must_use]
    pub fn new(
        community_id: impl Into<String>,
        client: Arc<dyn RepositoryClient>,
        store: ProcessedStore,
        scratch: ScratchSettings,
        metrics: Metrics,
    ) -> Self {
        let processor =
            SubmissionProcessor::new(Arc::clone(&client), FileValidator::new(), metrics.clone());
        Self {
            community_id: community_id.into(),
            client,
            store,
            processor,
            scratch,
            metrics,
            metrics_file: None,
        }
    }

    /// Write a Prometheus textfile to `path` at the end of each pass.
    #[must_use]
    pub fn with_metrics_file(mut self, path: Option<PathBuf>) -> Self {
        self.metrics_file = path;
        self
    }

    /// Run one pass, stopping early when `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error only when the scratch root cannot be allocated. Every other
    /// failure is logged and reflected in the returned summary.
    pub async fn run_until<F>(&self, shutdown: F) -> AppResult<RunSummary>
    where
        F: Future<Output = ()> + Send,
    {
        let mut processed = self.store.load();
        let mut scratch = ScratchRoot::create(self.scratch.parent.as_deref(), &self.scratch.prefix)
            .map_err(|err| AppError::fsops("scratch.create", err))?;
        info!(
            community_id = %self.community_id,
            scratch = %scratch.path().display(),
            already_processed = processed.len(),
            "starting submission check"
        );

        let mut summary = RunSummary::default();
        let end = {
            let pass = self.pass(&scratch, &mut processed, &mut summary);
            tokio::pin!(shutdown);
            tokio::select! {
                biased;
                () = &mut shutdown => PassEnd::Interrupted,
                end = pass => end,
            }
        };
        summary.interrupted = end == PassEnd::Interrupted;
        summary.listing_failed = end == PassEnd::ListingFailed;
        if summary.interrupted {
            warn!(
                completed = summary.completed,
                "shutdown requested; stopping after saving completed submissions"
            );
        }

        if matches!(end, PassEnd::Finished | PassEnd::Interrupted) {
            self.persist(&mut processed);
        }
        scratch.destroy();
        self.metrics.set_processed_set_size(processed.len());
        self.export_metrics();

        info!(
            listed = summary.listed,
            already_processed = summary.already_processed,
            attempted = summary.attempted,
            completed = summary.completed,
            interrupted = summary.interrupted,
            "submission check finished"
        );
        Ok(summary)
    }

    async fn pass(
        &self,
        scratch: &ScratchRoot,
        processed: &mut ProcessedSet,
        summary: &mut RunSummary,
    ) -> PassEnd {
        let requests = match self.client.list_community_requests(&self.community_id).await {
            Ok(requests) => requests,
            Err(err) => {
                error!(
                    community_id = %self.community_id,
                    kind = err.kind(),
                    error = %err,
                    "error fetching community requests"
                );
                return PassEnd::ListingFailed;
            }
        };
        summary.listed = requests.len();
        self.metrics.inc_requests_listed(requests.len() as u64);
        if requests.is_empty() {
            info!(community_id = %self.community_id, "no submission requests found");
            return PassEnd::NothingListed;
        }

        let fresh = self.new_requests(requests, processed, summary);
        summary.new_requests = fresh.len();
        info!(count = fresh.len(), "found new submissions to process");

        for request in &fresh {
            summary.attempted += 1;
            let outcome = self.processor.process(request, scratch, processed).await;
            if outcome.is_completed() {
                summary.completed += 1;
            }
            scratch.remove_submission_dir(&request.request_id);
        }
        PassEnd::Finished
    }

    fn new_requests(
        &self,
        requests: Vec<SubmissionRequest>,
        processed: &ProcessedSet,
        summary: &mut RunSummary,
    ) -> Vec<SubmissionRequest> {
        let mut seen = HashSet::new();
        requests
            .into_iter()
            .filter(|request| {
                if processed.contains(&request.request_id) {
                    summary.already_processed += 1;
                    self.metrics.inc_request_skipped();
                    return false;
                }
                if !seen.insert(request.request_id.clone()) {
                    debug!(request_id = %request.request_id, "duplicate request in listing");
                    return false;
                }
                true
            })
            .collect()
    }

    fn persist(&self, processed: &mut ProcessedSet) {
        if let Err(err) = self.store.save(processed) {
            error!(
                error = %err,
                path = %self.store.path().display(),
                "could not save processed submissions"
            );
        }
    }

    fn export_metrics(&self) {
        let Some(path) = self.metrics_file.as_deref() else {
            return;
        };
        if let Err(err) = self.metrics.write_textfile(path) {
            warn!(error = %err, path = %path.display(), "could not write metrics file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_reflects_pending_requests() {
        let clean = RunSummary {
            listed: 3,
            already_processed: 1,
            new_requests: 2,
            attempted: 2,
            completed: 2,
            ..RunSummary::default()
        };
        assert_eq!(clean.exit_code(), 0);

        let partial = RunSummary {
            completed: 1,
            ..clean
        };
        assert_eq!(partial.pending(), 1);
        assert_eq!(partial.exit_code(), EXIT_PARTIAL);

        let failed = RunSummary {
            listing_failed: true,
            ..RunSummary::default()
        };
        assert_eq!(failed.exit_code(), EXIT_FAILURE);
        assert_eq!(RunSummary::default().exit_code(), 0);
    }
}
