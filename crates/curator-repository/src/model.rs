//! Domain types read from repository responses and the lenient parsers that
//! build them.
//!
//! # Design
//! - Parsing never fails as a whole: entries missing required fields are skipped
//!   (requests) or defaulted (files), matching how the pipeline degrades.
//! - Identifiers are kept as opaque strings even when the API sends numbers.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// File key used when the API omits one.
pub const UNKNOWN_FILE_KEY: &str = "unknown_file";

/// An inclusion request targeting the community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRequest {
    /// Stable identity of the request.
    pub request_id: String,
    /// Record the request refers to; absent when the payload has no topic record.
    pub record_id: Option<String>,
}

impl SubmissionRequest {
    /// Build a request from its identifiers.
    #[must_use]
    pub fn new(request_id: impl Into<String>, record_id: Option<&str>) -> Self {
        Self {
            request_id: request_id.into(),
            record_id: record_id.map(str::to_string),
        }
    }
}

/// One file attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    /// File name as reported by the repository.
    pub key: String,
    /// Direct link used to stream the file contents.
    pub download_link: Option<String>,
    /// Size in bytes as reported by the repository.
    pub size: Option<u64>,
    /// Checksum as reported by the repository, e.g. `md5:<hex>`.
    pub checksum: Option<String>,
}

impl FileDescriptor {
    /// Build a descriptor with a key and download link only.
    #[must_use]
    pub fn new(key: impl Into<String>, download_link: Option<&str>) -> Self {
        Self {
            key: key.into(),
            download_link: download_link.map(str::to_string),
            size: None,
            checksum: None,
        }
    }

    /// The reported MD5 digest, when the checksum uses the `md5:` scheme.
    #[must_use]
    pub fn md5_checksum(&self) -> Option<&str> {
        self.checksum
            .as_deref()
            .and_then(|checksum| checksum.strip_prefix("md5:"))
    }
}

/// Extract submission requests from a community requests page.
///
/// Only the hits embedded in this page are read; hits without an `id` are
/// skipped with a warning.
#[must_use]
pub fn parse_request_hits(page: &Value) -> Vec<SubmissionRequest> {
    let Some(hits) = page
        .get("hits")
        .and_then(|hits| hits.get("hits"))
        .and_then(Value::as_array)
    else {
        warn!("requests page carried no hit list");
        return Vec::new();
    };

    hits.iter()
        .filter_map(|hit| {
            let Some(request_id) = hit.get("id").and_then(opaque_id) else {
                warn!("skipping request hit without an id");
                return None;
            };
            let record_id = hit
                .get("topic")
                .and_then(|topic| topic.get("record"))
                .and_then(opaque_id);
            Some(SubmissionRequest {
                request_id,
                record_id,
            })
        })
        .collect()
}

/// Extract file descriptors from a record payload.
///
/// A missing or non-array `files` field yields an empty listing.
#[must_use]
pub fn parse_record_files(record: &Value) -> Vec<FileDescriptor> {
    record
        .get("files")
        .and_then(Value::as_array)
        .map(|files| files.iter().map(parse_file).collect())
        .unwrap_or_default()
}

fn parse_file(entry: &Value) -> FileDescriptor {
    FileDescriptor {
        key: entry
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_FILE_KEY)
            .to_string(),
        download_link: entry
            .get("links")
            .and_then(|links| links.get("self"))
            .and_then(Value::as_str)
            .filter(|link| !link.is_empty())
            .map(str::to_string),
        size: entry.get("size").and_then(Value::as_u64),
        checksum: entry
            .get("checksum")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn opaque_id(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) if !raw.is_empty() => Some(raw.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_hits_skip_entries_without_id() {
        let page = json!({
            "hits": {
                "hits": [
                    {"id": "req-1", "topic": {"record": "101"}},
                    {"topic": {"record": "102"}},
                    {"id": 7, "topic": {"record": 103}},
                    {"id": "req-4"}
                ],
                "total": 4
            }
        });
        let requests = parse_request_hits(&page);
        assert_eq!(
            requests,
            vec![
                SubmissionRequest::new("req-1", Some("101")),
                SubmissionRequest::new("7", Some("103")),
                SubmissionRequest::new("req-4", None),
            ]
        );
    }

    #[test]
    fn malformed_page_yields_no_requests() {
        assert!(parse_request_hits(&json!({"hits": []})).is_empty());
        assert!(parse_request_hits(&json!({})).is_empty());
        assert!(parse_request_hits(&json!("nope")).is_empty());
    }

    #[test]
    fn record_files_default_missing_fields() {
        let record = json!({
            "files": [
                {
                    "key": "data.csv",
                    "size": 12,
                    "checksum": "md5:0123abcd",
                    "links": {"self": "https://zenodo.org/api/records/1/files/data.csv/content"}
                },
                {"links": {}}
            ]
        });
        let files = parse_record_files(&record);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].key, "data.csv");
        assert_eq!(files[0].size, Some(12));
        assert_eq!(files[0].md5_checksum(), Some("0123abcd"));
        assert_eq!(files[1].key, UNKNOWN_FILE_KEY);
        assert!(files[1].download_link.is_none());
        assert!(files[1].md5_checksum().is_none());
    }

    #[test]
    fn record_without_file_array_is_empty() {
        assert!(parse_record_files(&json!({"id": 1})).is_empty());
        assert!(parse_record_files(&json!({"files": {"entries": {}}})).is_empty());
    }
}
