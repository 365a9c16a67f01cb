//! Repository client seam and the Zenodo HTTP implementation.
//!
//! # Design
//! - One attempt per call; no retries or paging beyond the first page.
//! - Every call carries the bearer credential and is bounded by the configured
//!   timeout (connect and read phases for streamed downloads).
//! - Downloads stream to disk and remove the partial file on any failure.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde_json::Value;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{RepositoryError, RepositoryResult};
use crate::model::{FileDescriptor, SubmissionRequest, parse_record_files, parse_request_hits};
use crate::naming::safe_file_name;

/// Operations the submission pipeline needs from the remote repository.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// List the open inclusion requests of a community (first page only).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-success statuses, or bodies
    /// that are not JSON.
    async fn list_community_requests(
        &self,
        community_id: &str,
    ) -> RepositoryResult<Vec<SubmissionRequest>>;

    /// Fetch the file listing of a record.
    ///
    /// # Errors
    ///
    /// Same failure contract as [`RepositoryClient::list_community_requests`].
    async fn get_record_files(&self, record_id: &str) -> RepositoryResult<Vec<FileDescriptor>>;

    /// Stream one file into `destination_dir/<key>` and return the written path.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is unsafe, the link is missing or invalid,
    /// the transfer fails, or the bytes cannot be written.
    async fn download(
        &self,
        file: &FileDescriptor,
        destination_dir: &Path,
    ) -> RepositoryResult<PathBuf>;
}

/// HTTP client for the Zenodo REST API.
#[derive(Debug, Clone)]
pub struct ZenodoClient {
    http: Client,
    api_base: Url,
    timeout: Duration,
}

impl ZenodoClient {
    /// Build a client for `api_base` that authenticates with `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an error when the token cannot be used as a header value or the
    /// underlying HTTP client cannot be built.
    pub fn new(api_base: Url, access_token: &str, timeout: Duration) -> RepositoryResult<Self> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|_| RepositoryError::InvalidToken)?;
        bearer.set_sensitive(true);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(AUTHORIZATION, bearer);

        let http = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|source| RepositoryError::ClientBuild { source })?;

        Ok(Self {
            http,
            api_base,
            timeout,
        })
    }

    fn endpoint(&self, operation: &'static str, segments: &[&str]) -> RepositoryResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| RepositoryError::InvalidEndpoint { operation })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, operation: &'static str, url: Url) -> RepositoryResult<Value> {
        debug!(%url, operation, "repository request");
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| RepositoryError::Transport { operation, source })?;
        ensure_success(operation, response)?
            .json::<Value>()
            .await
            .map_err(|source| RepositoryError::Decode { operation, source })
    }
}

#[async_trait]
impl RepositoryClient for ZenodoClient {
    async fn list_community_requests(
        &self,
        community_id: &str,
    ) -> RepositoryResult<Vec<SubmissionRequest>> {
        const OPERATION: &str = "list_requests";
        let url = self.endpoint(OPERATION, &["communities", community_id, "requests"])?;
        let page = self.get_json(OPERATION, url).await?;
        let requests = parse_request_hits(&page);
        info!(community_id, count = requests.len(), "found submission requests");
        Ok(requests)
    }

    async fn get_record_files(&self, record_id: &str) -> RepositoryResult<Vec<FileDescriptor>> {
        const OPERATION: &str = "get_record";
        let url = self.endpoint(OPERATION, &["records", record_id])?;
        let record = self.get_json(OPERATION, url).await?;
        let files = parse_record_files(&record);
        info!(record_id, count = files.len(), "fetched record file listing");
        Ok(files)
    }

    async fn download(
        &self,
        file: &FileDescriptor,
        destination_dir: &Path,
    ) -> RepositoryResult<PathBuf> {
        const OPERATION: &str = "download";
        let name = safe_file_name(&file.key).ok_or_else(|| RepositoryError::UnsafeFileName {
            key: file.key.clone(),
        })?;
        let link = file
            .download_link
            .as_deref()
            .ok_or_else(|| RepositoryError::MissingLink {
                key: file.key.clone(),
            })?;
        let url = Url::parse(link).map_err(|source| RepositoryError::InvalidLink {
            key: file.key.clone(),
            source,
        })?;
        let path = destination_dir.join(name);

        info!(file = %file.key, "downloading file");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| RepositoryError::Transport {
                operation: OPERATION,
                source,
            })?;
        let response = ensure_success(OPERATION, response)?;

        if let Err(err) = stream_to_file(response, &path).await {
            if let Err(cleanup) = fs::remove_file(&path).await {
                debug!(path = %path.display(), error = %cleanup, "partial download not removed");
            }
            return Err(err);
        }
        info!(file = %file.key, path = %path.display(), "downloaded file");
        Ok(path)
    }
}

fn ensure_success(operation: &'static str, response: Response) -> RepositoryResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RepositoryError::Status {
            operation,
            status: status.as_u16(),
        })
    }
}

async fn stream_to_file(response: Response, path: &Path) -> RepositoryResult<()> {
    let mut file = File::create(path)
        .await
        .map_err(|source| RepositoryError::io(path, source))?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| RepositoryError::Transport {
            operation: "download",
            source,
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|source| RepositoryError::io(path, source))?;
    }
    file.flush()
        .await
        .map_err(|source| RepositoryError::io(path, source))?;
    file.sync_all()
        .await
        .map_err(|source| RepositoryError::io(path, source))
}
