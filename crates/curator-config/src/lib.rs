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

//! Run configuration for the Curator submission checker.
//!
//! Layout: `model.rs` (typed configuration), `loader.rs` (file layer and
//! precedence merging), `validate.rs` (field parsing), `defaults.rs`.

pub(crate) mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ConfigOverrides};
pub use model::{AccessToken, CheckerConfig, LogFormatSetting, LoggingSettings, ScratchSettings};
