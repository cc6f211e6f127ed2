//! bls-mirror CLI
//!
//! Run with: bls-mirror ingest

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bls_mirror::config::*;
use bls_mirror::error::Result;
use bls_mirror::fetch::HttpFetcher;
use bls_mirror::handler;
use bls_mirror::store::{ObjectStore, S3Store};
use bls_mirror::sync::{DirectorySync, ResourcePublisher};

#[derive(Parser, Debug)]
#[command(name = "bls-mirror")]
#[command(about = "Mirror BLS time series and population data into S3")]
#[command(version)]
struct Cli {
    /// Destination bucket
    #[arg(long, env = "S3_BUCKET", default_value = DEFAULT_BUCKET)]
    bucket: String,

    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// S3-compatible endpoint (MinIO, R2, localstack)
    #[arg(long, env = "S3_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Log as JSON lines instead of text
    #[arg(long, env = "BLS_MIRROR_LOG_JSON")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct SyncArgs {
    /// Directory listing URL
    #[arg(long, env = "BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Key prefix for mirrored files
    #[arg(long, env = "S3_PREFIX", default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Maximum files per run (0 = unlimited)
    #[arg(long, env = "MAX_FILES", default_value = "0")]
    max_files: usize,

    /// User-Agent sent with every request
    #[arg(long, env = "USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
}

#[derive(clap::Args, Debug)]
struct PublishArgs {
    /// Population API URL
    #[arg(long, env = "POP_API_URL")]
    pop_api_url: Option<String>,

    /// Destination key for the population JSON
    #[arg(long, env = "POP_S3_KEY", default_value = DEFAULT_POP_KEY)]
    pop_key: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror the remote directory under the prefix
    Sync {
        #[command(flatten)]
        sync: SyncArgs,
    },
    /// Publish the population resource
    Publish {
        #[command(flatten)]
        publish: PublishArgs,
        /// User-Agent sent with every request
        #[arg(long, env = "USER_AGENT", default_value = DEFAULT_USER_AGENT)]
        user_agent: String,
    },
    /// Sync, then publish
    Ingest {
        #[command(flatten)]
        sync: SyncArgs,
        #[command(flatten)]
        publish: PublishArgs,
    },
    /// Build the three reports from mirrored objects
    Report {
        /// Key of the time-series file
        #[arg(long, env = "PR_CURRENT_KEY", default_value = DEFAULT_PR_CURRENT_KEY)]
        pr_current_key: String,
        /// Key of the population JSON
        #[arg(long, env = "POP_S3_KEY", default_value = DEFAULT_POP_KEY)]
        pop_key: String,
        /// Series joined with population in report 3
        #[arg(long, env = "SERIES_ID", default_value = DEFAULT_SERIES_ID)]
        series_id: String,
        /// Period joined with population in report 3
        #[arg(long, env = "PERIOD", default_value = DEFAULT_PERIOD)]
        period: String,
    },
}

impl Cli {
    fn mirror_config(&self, sync: Option<&SyncArgs>, publish: Option<&PublishArgs>) -> MirrorConfig {
        let mut config = MirrorConfig {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            ..Default::default()
        };
        if let Some(sync) = sync {
            config.base_url = sync.base_url.clone();
            config.prefix = sync.prefix.clone();
            config.max_files = sync.max_files;
            config.user_agent = sync.user_agent.clone();
        }
        if let Some(publish) = publish {
            config.pop_api_url = publish.pop_api_url.clone().filter(|s| !s.trim().is_empty());
            config.pop_key = publish.pop_key.clone();
        }
        config
    }
}

fn init_logging(json: bool) {
    // stdout carries the result document
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .with(filter)
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect(cli: &Cli) -> Result<Arc<dyn ObjectStore>> {
    let store = S3Store::connect(&cli.region, cli.endpoint_url.as_deref()).await?;
    Ok(Arc::new(store))
}

async fn run(cli: Cli) -> Result<()> {
    let event = Value::Null;
    let context = Value::Null;

    match &cli.command {
        Commands::Sync { sync } => {
            let config = cli.mirror_config(Some(sync), None);
            let fetcher = Arc::new(HttpFetcher::new(config.user_agent.clone())?);
            let result = DirectorySync::new(connect(&cli).await?, fetcher, config)
                .run()
                .await?;
            print_json(&result)?;
        }

        Commands::Publish {
            publish,
            user_agent,
        } => {
            let mut config = cli.mirror_config(None, Some(publish));
            config.user_agent = user_agent.clone();
            config.require_pop_api_url()?;
            let fetcher = Arc::new(HttpFetcher::new(config.user_agent.clone())?);
            let result = ResourcePublisher::new(connect(&cli).await?, fetcher, config)
                .publish()
                .await?;
            print_json(&result)?;
        }

        Commands::Ingest { sync, publish } => {
            let config = cli.mirror_config(Some(sync), Some(publish));
            config.require_pop_api_url()?;
            let fetcher = Arc::new(HttpFetcher::new(config.user_agent.clone())?);
            let result =
                handler::ingest(connect(&cli).await?, fetcher, &config, &event, &context).await?;
            print_json(&result)?;
        }

        Commands::Report {
            pr_current_key,
            pop_key,
            series_id,
            period,
        } => {
            let config = ReportConfig {
                bucket: cli.bucket.clone(),
                region: cli.region.clone(),
                endpoint_url: cli.endpoint_url.clone(),
                pr_current_key: pr_current_key.clone(),
                pop_key: pop_key.clone(),
                series_id: series_id.clone(),
                period: period.clone(),
            };
            let store = connect(&cli).await?;
            let reports = handler::report(store.as_ref(), &config, &event, &context).await?;
            print_json(&reports)?;
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    if let Err(e) = run(cli).await {
        tracing::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}
