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

//! Startup configuration for the Cassandra backup/restore tooling.
//!
//! Layout: `model.rs` (typed configuration), `defaults.rs` (path and name
//! constants), `loader.rs` (YAML file + environment overrides), `validate.rs`
//! (field validation).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ENV_PREFIX, load, load_with_env};
pub use model::{TelemetryConfig, VaultConfig};
pub use validate::validate;
