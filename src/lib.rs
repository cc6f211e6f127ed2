//! bls-mirror - dataset mirroring into S3
//!
//! Mirrors the BLS `pr` time-series directory and a population API into an
//! object store, uploading only what changed, and derives reports from the
//! mirrored objects.

pub mod canonical;
pub mod config;
pub mod error;
pub mod fetch;
pub mod handler;
pub mod hash;
pub mod listing;
pub mod report;
pub mod store;
pub mod sync;

pub use config::{MirrorConfig, ReportConfig};
pub use error::{MirrorError, Result};
pub use fetch::{Fetcher, HttpFetcher};
pub use store::{MemoryStore, ObjectStore};
pub use sync::{DirectorySync, ResourcePublisher};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
