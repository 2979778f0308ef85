//! Binary entry point for the `ingest` CLI.

#[tokio::main]
async fn main() {
    if let Err(error) = ingest_cli::run().await {
        eprintln!("ingest error: {error:#}");
        std::process::exit(1);
    }
}
