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

//! Curator submission checker: per-submission workflow, run pass, and wiring.
//!
//! Layout: `processor.rs` (one submission), `controller.rs` (one pass),
//! `bootstrap.rs` (config to controller), `cli.rs` (binary surface).

/// Application bootstrap and signal handling.
pub mod bootstrap;
/// Command-line entrypoint.
pub mod cli;
/// Run pass over a community's requests.
pub mod controller;
/// Application error type and exit codes.
pub mod error;
/// Download-and-check workflow for one submission.
pub mod processor;

pub use bootstrap::{BootstrapDependencies, init_logging, run_checker, shutdown_signal};
pub use controller::{RunController, RunSummary};
pub use error::{AppError, AppResult, EXIT_CONFIG, EXIT_FAILURE, EXIT_PARTIAL};
pub use processor::{
    FileOutcome, FileReport, ProcessOutcome, SkipReason, SubmissionProcessor, SubmissionReport,
};
