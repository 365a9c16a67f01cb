#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Remote repository access for the curator.
//!
//! [`RepositoryClient`] is the seam the pipeline depends on; [`ZenodoClient`] is
//! the HTTP implementation against the Zenodo REST API.

pub mod client;
pub mod error;
pub mod model;
pub mod naming;

pub use client::{RepositoryClient, ZenodoClient};
pub use error::{RepositoryError, RepositoryResult};
pub use model::{FileDescriptor, SubmissionRequest};
pub use naming::safe_file_name;
