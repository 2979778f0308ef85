//! Standalone binary for the ingestion worker runtime.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ingest_config::IngestConfig::load(None)?;

    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    ingest_worker::run(config).await
}
