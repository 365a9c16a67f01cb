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

//! Durable record of the submission requests a checker has already handled.

pub mod error;
pub mod store;

pub use error::{StateError, StateResult};
pub use store::{ProcessedSet, ProcessedStore};
