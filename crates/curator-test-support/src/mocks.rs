//! Scripted [`RepositoryClient`] for pipeline tests.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use curator_repository::{
    FileDescriptor, RepositoryClient, RepositoryError, RepositoryResult, SubmissionRequest,
    safe_file_name,
};
use tokio::sync::Notify;

/// What a scripted download does.
#[derive(Debug, Clone)]
pub enum FakeDownload {
    /// Write these bytes.
    Bytes(Vec<u8>),
    /// Write a sparse file of this length.
    Sized(u64),
    /// Fail with this HTTP status before writing anything.
    Status(u16),
    /// Never complete; signals [`FakeRepository::hung`] when reached.
    Hang,
}

/// A call observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    /// `list_community_requests(community_id)`.
    List(String),
    /// `get_record_files(record_id)`.
    Record(String),
    /// `download` of the descriptor with this key.
    Download(String),
}

/// In-memory repository with scripted responses and call recording.
///
/// Unscripted records list no files; unscripted downloads fail with 404.
#[derive(Debug, Default)]
pub struct FakeRepository {
    requests: Vec<SubmissionRequest>,
    list_failure: Option<u16>,
    records: HashMap<String, Vec<FileDescriptor>>,
    record_failures: HashMap<String, u16>,
    downloads: HashMap<String, FakeDownload>,
    calls: Mutex<Vec<FakeCall>>,
    hung: Arc<Notify>,
}

impl FakeRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests returned by the listing call, in order.
    #[must_use]
    pub fn with_requests(mut self, requests: impl IntoIterator<Item = SubmissionRequest>) -> Self {
        self.requests = requests.into_iter().collect();
        self
    }

    /// Make the listing call fail with `status`.
    #[must_use]
    pub const fn failing_list(mut self, status: u16) -> Self {
        self.list_failure = Some(status);
        self
    }

    /// Files listed for `record_id`.
    #[must_use]
    pub fn with_record(
        mut self,
        record_id: &str,
        files: impl IntoIterator<Item = FileDescriptor>,
    ) -> Self {
        self.records
            .insert(record_id.to_string(), files.into_iter().collect());
        self
    }

    /// Make the listing of `record_id` fail with `status`.
    #[must_use]
    pub fn failing_record(mut self, record_id: &str, status: u16) -> Self {
        self.record_failures.insert(record_id.to_string(), status);
        self
    }

    /// Behaviour of the download of the file with `key`.
    #[must_use]
    pub fn with_download(mut self, key: &str, outcome: FakeDownload) -> Self {
        self.downloads.insert(key.to_string(), outcome);
        self
    }

    /// Notified when a [`FakeDownload::Hang`] download starts.
    #[must_use]
    pub fn hung(&self) -> Arc<Notify> {
        Arc::clone(&self.hung)
    }

    /// Every call observed so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record ids whose file listing was requested, in order.
    #[must_use]
    pub fn record_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FakeCall::Record(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: FakeCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

fn write_file(path: &Path, outcome: &FakeDownload) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    match outcome {
        FakeDownload::Bytes(bytes) => file.write_all(bytes),
        FakeDownload::Sized(len) => file.set_len(*len),
        FakeDownload::Status(_) | FakeDownload::Hang => Ok(()),
    }
}

#[async_trait]
impl RepositoryClient for FakeRepository {
    async fn list_community_requests(
        &self,
        community_id: &str,
    ) -> RepositoryResult<Vec<SubmissionRequest>> {
        self.record(FakeCall::List(community_id.to_string()));
        match self.list_failure {
            Some(status) => Err(RepositoryError::Status {
                operation: "list_requests",
                status,
            }),
            None => Ok(self.requests.clone()),
        }
    }

    async fn get_record_files(&self, record_id: &str) -> RepositoryResult<Vec<FileDescriptor>> {
        self.record(FakeCall::Record(record_id.to_string()));
        if let Some(status) = self.record_failures.get(record_id) {
            return Err(RepositoryError::Status {
                operation: "get_record",
                status: *status,
            });
        }
        Ok(self.records.get(record_id).cloned().unwrap_or_default())
    }

    async fn download(
        &self,
        file: &FileDescriptor,
        destination_dir: &Path,
    ) -> RepositoryResult<PathBuf> {
        self.record(FakeCall::Download(file.key.clone()));
        let name = safe_file_name(&file.key).ok_or_else(|| RepositoryError::UnsafeFileName {
            key: file.key.clone(),
        })?;
        if file.download_link.is_none() {
            return Err(RepositoryError::MissingLink {
                key: file.key.clone(),
            });
        }
        let outcome = self
            .downloads
            .get(&file.key)
            .cloned()
            .unwrap_or(FakeDownload::Status(404));
        match outcome {
            FakeDownload::Status(status) => Err(RepositoryError::Status {
                operation: "download",
                status,
            }),
            FakeDownload::Hang => {
                self.hung.notify_one();
                std::future::pending::<()>().await;
                Err(RepositoryError::Status {
                    operation: "download",
                    status: 408,
                })
            }
            written => {
                let path = destination_dir.join(name);
                write_file(&path, &written).map_err(|source| RepositoryError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(path)
            }
        }
    }
}
