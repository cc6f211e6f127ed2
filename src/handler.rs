//! Invocation entry points
//!
//! Each handler takes an opaque event/context pair (as delivered by a
//! scheduler or queue trigger) that the mirror logic does not read, and
//! returns a serializable summary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{MirrorConfig, ReportConfig};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::report::{run_reports, Reports};
use crate::store::ObjectStore;
use crate::sync::{DirectorySync, PublishResult, ResourcePublisher, SyncResult};

/// Result of an ingest invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResult {
    /// Directory mirror
    pub part1: SyncResult,
    /// Population resource
    pub part2: PublishResult,
}

/// Mirror the directory, then publish the population resource
///
/// A missing population URL fails the call before any request is made.
pub async fn ingest(
    store: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn Fetcher>,
    config: &MirrorConfig,
    _event: &Value,
    _context: &Value,
) -> Result<IngestResult> {
    config.require_pop_api_url()?;

    let part1 = DirectorySync::new(store.clone(), fetcher.clone(), config.clone())
        .run()
        .await?;
    let part2 = ResourcePublisher::new(store, fetcher, config.clone())
        .publish()
        .await?;

    Ok(IngestResult { part1, part2 })
}

/// Build the three reports from the mirrored objects
pub async fn report(
    store: &dyn ObjectStore,
    config: &ReportConfig,
    _event: &Value,
    _context: &Value,
) -> Result<Reports> {
    run_reports(store, config).await
}

/// Ingest with everything read from the environment
#[cfg(feature = "cloud")]
pub async fn ingest_from_env(event: &Value, context: &Value) -> Result<IngestResult> {
    use crate::fetch::HttpFetcher;
    use crate::store::S3Store;

    let config = MirrorConfig::from_env()?;
    config.require_pop_api_url()?;

    let store = S3Store::connect(&config.region, config.endpoint_url.as_deref()).await?;
    let fetcher = HttpFetcher::new(config.user_agent.clone())?;
    ingest(Arc::new(store), Arc::new(fetcher), &config, event, context).await
}

/// Reports with everything read from the environment
#[cfg(feature = "cloud")]
pub async fn report_from_env(event: &Value, context: &Value) -> Result<Reports> {
    use crate::store::S3Store;

    let config = ReportConfig::from_env();
    let store = S3Store::connect(&config.region, config.endpoint_url.as_deref()).await?;
    report(&store, &config, event, context).await
}
