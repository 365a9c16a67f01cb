//! Per-submission workflow.
//!
//! # Design
//! - Sequential: every file of a submission is downloaded and checked in listing
//!   order before the next one starts.
//! - Failures of one file never stop its siblings; they only clear the aggregate
//!   verdict.
//! - A submission is marked processed once its file loop has run, whatever the
//!   verdicts were. Missing record ids, unavailable scratch space and empty or
//!   unavailable listings leave it unmarked so the next run retries it.

use std::sync::Arc;

use curator_fsops::{FileValidator, ScratchRoot, ValidationResult};
use curator_repository::{FileDescriptor, RepositoryClient, SubmissionRequest};
use curator_state::ProcessedSet;
use curator_telemetry::Metrics;
use serde::Serialize;
use tracing::{error, info, warn};

/// Why a submission was not run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The request did not reference a record.
    MissingRecordId,
    /// The submission's scratch directory could not be created.
    ScratchUnavailable,
    /// The record's file listing could not be fetched.
    RecordUnavailable,
    /// The record listed no files.
    NoFiles,
}

impl SkipReason {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingRecordId => "missing_record_id",
            Self::ScratchUnavailable => "scratch_unavailable",
            Self::RecordUnavailable => "record_unavailable",
            Self::NoFiles => "no_files",
        }
    }
}

/// What happened to one file of a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// The file was downloaded and checked.
    Checked(ValidationResult),
    /// The download failed; `kind` is the failure label.
    DownloadFailed {
        /// Failure label.
        kind: &'static str,
    },
}

/// Per-file entry of a submission report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    /// File key from the listing.
    pub key: String,
    /// Outcome for the file.
    pub outcome: FileOutcome,
}

/// Aggregate result of a submission whose workflow ran to completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReport {
    /// Request identifier.
    pub request_id: String,
    /// Record identifier.
    pub record_id: String,
    /// One entry per listed file, in listing order.
    pub files: Vec<FileReport>,
    /// Whether every file downloaded and passed its check.
    pub all_checks_passed: bool,
}

impl SubmissionReport {
    /// Number of files that were downloaded and checked.
    #[must_use]
    pub fn files_checked(&self) -> usize {
        self.files
            .iter()
            .filter(|file| matches!(file.outcome, FileOutcome::Checked(_)))
            .count()
    }
}

/// Result of [`SubmissionProcessor::process`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// The workflow ran to completion and the request was marked processed.
    Completed(SubmissionReport),
    /// The workflow could not run; the request was left unmarked.
    Skipped(SkipReason),
}

impl ProcessOutcome {
    /// Whether the workflow ran to completion.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Runs the download-and-check workflow for single submissions.
#[derive(Clone)]
pub struct SubmissionProcessor {
    client: Arc<dyn RepositoryClient>,
    validator: FileValidator,
    metrics: Metrics,
}

impl SubmissionProcessor {
    /// Build a processor around its collaborators.
    #[must_use]
    pub fn new(client: Arc<dyn RepositoryClient>, validator: FileValidator, metrics: Metrics) -> Self {
        Self {
            client,
            validator,
            metrics,
        }
    }

    /// Process one request, marking it in `processed` when the workflow completes.
    pub async fn process(
        &self,
        request: &SubmissionRequest,
        scratch: &ScratchRoot,
        processed: &mut ProcessedSet,
    ) -> ProcessOutcome {
        let request_id = request.request_id.as_str();
        let Some(record_id) = request.record_id.as_deref() else {
            warn!(request_id, "no record id found in request");
            return self.skipped(SkipReason::MissingRecordId);
        };

        info!(request_id, record_id, "processing submission request");

        let submission_dir = match scratch.create_submission_dir(request_id) {
            Ok(dir) => dir,
            Err(err) => {
                error!(request_id, error = %err, "could not create submission directory");
                return self.skipped(SkipReason::ScratchUnavailable);
            }
        };

        let files = match self.client.get_record_files(record_id).await {
            Ok(files) => files,
            Err(err) => {
                error!(
                    record_id,
                    error = %err,
                    kind = err.kind(),
                    "error fetching record files"
                );
                return self.skipped(SkipReason::RecordUnavailable);
            }
        };
        if files.is_empty() {
            warn!(record_id, "no files found for record");
            return self.skipped(SkipReason::NoFiles);
        }

        let mut reports = Vec::with_capacity(files.len());
        let mut all_checks_passed = true;
        for file in &files {
            let outcome = self.handle_file(file, &submission_dir).await;
            let passed = matches!(&outcome, FileOutcome::Checked(result) if result.passed);
            all_checks_passed &= passed;
            reports.push(FileReport {
                key: file.key.clone(),
                outcome,
            });
        }

        let report = SubmissionReport {
            request_id: request_id.to_string(),
            record_id: record_id.to_string(),
            files: reports,
            all_checks_passed,
        };
        info!(
            request_id,
            files_processed = report.files_checked(),
            all_checks_passed,
            "submission processing complete"
        );

        // Marking records that the workflow ran, not that every file was valid.
        processed.insert(request_id);
        self.metrics.inc_submission_completed();
        ProcessOutcome::Completed(report)
    }

    async fn handle_file(
        &self,
        file: &FileDescriptor,
        submission_dir: &std::path::Path,
    ) -> FileOutcome {
        let path = match self.client.download(file, submission_dir).await {
            Ok(path) => path,
            Err(err) => {
                error!(file = %file.key, kind = err.kind(), error = %err, "error downloading file");
                self.metrics.inc_download_failure(err.kind());
                return FileOutcome::DownloadFailed { kind: err.kind() };
            }
        };
        self.metrics.inc_file_downloaded();

        let result = self.validator.check(&path);
        self.metrics.inc_file_check(result.passed);
        if let (Some(expected), Some(actual)) = (file.md5_checksum(), result.md5.as_deref())
            && !expected.eq_ignore_ascii_case(actual)
        {
            warn!(
                file = %file.key,
                expected,
                actual,
                "checksum differs from the one reported by the repository"
            );
        }
        FileOutcome::Checked(result)
    }

    fn skipped(&self, reason: SkipReason) -> ProcessOutcome {
        self.metrics.inc_submission_incomplete(reason.label());
        ProcessOutcome::Skipped(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_test_support::fixtures::{file, request, temp_dir};
    use curator_test_support::mocks::{FakeDownload, FakeRepository};

    type TestResult<T> = anyhow::Result<T>;

    fn processor(fake: FakeRepository) -> TestResult<(SubmissionProcessor, Arc<FakeRepository>)> {
        let fake = Arc::new(fake);
        let client: Arc<dyn RepositoryClient> = fake.clone();
        Ok((
            SubmissionProcessor::new(client, FileValidator::new(), Metrics::new()?),
            fake,
        ))
    }

    #[tokio::test]
    async fn files_are_handled_in_listing_order() -> TestResult<()> {
        let parent = temp_dir("processor_")?;
        let scratch = ScratchRoot::create(Some(parent.path()), "zenodo_downloads_")?;
        let (processor, fake) = processor(
            FakeRepository::new()
                .with_record("10", [file("b.txt"), file("a.txt")])
                .with_download("b.txt", FakeDownload::Bytes(b"b".to_vec()))
                .with_download("a.txt", FakeDownload::Bytes(b"a".to_vec())),
        )?;
        let mut processed = ProcessedSet::new();

        let outcome = processor
            .process(&request("r1", "10"), &scratch, &mut processed)
            .await;

        let ProcessOutcome::Completed(report) = &outcome else {
            anyhow::bail!("expected completion, got {outcome:?}");
        };
        let keys: Vec<_> = report.files.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, ["b.txt", "a.txt"]);
        assert!(report.all_checks_passed);
        assert!(processed.contains("r1"));
        assert_eq!(fake.record_calls(), ["10"]);
        Ok(())
    }

    #[tokio::test]
    async fn checksum_mismatch_does_not_change_the_verdict() -> TestResult<()> {
        let parent = temp_dir("processor_")?;
        let scratch = ScratchRoot::create(Some(parent.path()), "zenodo_downloads_")?;
        let mut listed = file("data.csv");
        listed.checksum = Some("md5:00000000000000000000000000000000".into());
        let (processor, _fake) = processor(
            FakeRepository::new()
                .with_record("10", [listed])
                .with_download("data.csv", FakeDownload::Bytes(b"a,b\n".to_vec())),
        )?;
        let mut processed = ProcessedSet::new();

        let outcome = processor
            .process(&request("r1", "10"), &scratch, &mut processed)
            .await;
        assert!(
            matches!(outcome, ProcessOutcome::Completed(ref report) if report.all_checks_passed)
        );
        Ok(())
    }

    #[tokio::test]
    async fn record_listing_failure_leaves_request_unmarked() -> TestResult<()> {
        let parent = temp_dir("processor_")?;
        let scratch = ScratchRoot::create(Some(parent.path()), "zenodo_downloads_")?;
        let (processor, _fake) = processor(FakeRepository::new().failing_record("10", 500))?;
        let mut processed = ProcessedSet::new();

        let outcome = processor
            .process(&request("r1", "10"), &scratch, &mut processed)
            .await;
        assert_eq!(outcome, ProcessOutcome::Skipped(SkipReason::RecordUnavailable));
        assert!(processed.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_link_fails_the_aggregate_but_marks_the_request() -> TestResult<()> {
        let parent = temp_dir("processor_")?;
        let scratch = ScratchRoot::create(Some(parent.path()), "zenodo_downloads_")?;
        let (processor, _fake) = processor(
            FakeRepository::new()
                .with_record("10", [FileDescriptor::new("x.csv", None), file("ok.csv")])
                .with_download("ok.csv", FakeDownload::Bytes(b"a,b\n".to_vec())),
        )?;
        let mut processed = ProcessedSet::new();

        let outcome = processor
            .process(&request("r1", "10"), &scratch, &mut processed)
            .await;

        let ProcessOutcome::Completed(report) = &outcome else {
            anyhow::bail!("expected completion, got {outcome:?}");
        };
        assert!(!report.all_checks_passed);
        assert_eq!(
            report.files[0].outcome,
            FileOutcome::DownloadFailed {
                kind: "missing_link"
            }
        );
        assert!(
            matches!(&report.files[1].outcome, FileOutcome::Checked(result) if result.passed)
        );
        assert_eq!(report.files_checked(), 1);
        assert!(processed.contains("r1"));
        Ok(())
    }

    #[tokio::test]
    async fn failing_verdict_clears_the_aggregate() -> TestResult<()> {
        let parent = temp_dir("processor_")?;
        let scratch = ScratchRoot::create(Some(parent.path()), "zenodo_downloads_")?;
        let (processor, _fake) = processor(
            FakeRepository::new()
                .with_record("10", [file("empty.txt")])
                .with_download("empty.txt", FakeDownload::Bytes(Vec::new())),
        )?;
        let mut processed = ProcessedSet::new();

        let outcome = processor
            .process(&request("r1", "10"), &scratch, &mut processed)
            .await;

        let ProcessOutcome::Completed(report) = &outcome else {
            anyhow::bail!("expected completion, got {outcome:?}");
        };
        assert!(!report.all_checks_passed);
        assert!(matches!(
            &report.files[0].outcome,
            FileOutcome::Checked(result) if result.exists && result.size_bytes == 0 && !result.passed
        ));
        assert!(processed.contains("r1"));
        Ok(())
    }

    #[test]
    fn skip_labels_are_stable() {
        assert_eq!(SkipReason::MissingRecordId.label(), "missing_record_id");
        assert_eq!(SkipReason::NoFiles.label(), "no_files");
    }
}
