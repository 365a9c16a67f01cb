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

//! Local filesystem concerns of a checker run: the per-run scratch area and the
//! checks applied to each downloaded file.

pub mod error;
pub mod scratch;
pub mod validator;

pub use error::{FsOpsError, FsOpsResult};
pub use scratch::{ScratchRoot, submission_dir_name};
pub use validator::{FileValidator, MAX_FILE_SIZE_BYTES, ValidationResult};
