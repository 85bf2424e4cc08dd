//! Bugfy ingestion binary.
//!
//! Reads one JSON error report per line from stdin, ingests it, and writes
//! one JSON line per report to stdout: the stored event, or an error object.

use bugfy_ingest::{CreateErrorRequest, IngestConfig, IngestService};
use bugfy_store::StoreProvider;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bugfy_ingest=info,bugfy_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = IngestConfig::load()?;
    tracing::info!(
        timeout_ms = config.ingest.timeout_ms,
        fail_on_grouping_error = config.ingest.fail_on_grouping_error,
        "Configuration loaded"
    );

    let provider = StoreProvider::from_config(&config.store).await?;
    let service = IngestService::new(provider.events(), provider.issues(), config.ingest);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut ingested = 0u64;
    let mut rejected = 0u64;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let output = match serde_json::from_str::<CreateErrorRequest>(&line) {
            Ok(request) => match service.create_error(request).await {
                Ok(response) => {
                    ingested += 1;
                    serde_json::to_value(&response)?
                }
                Err(e) => {
                    rejected += 1;
                    json!({
                        "error": e.public_message(),
                        "client_error": e.is_client_error(),
                    })
                }
            },
            Err(e) => {
                rejected += 1;
                tracing::warn!(error = %e, "invalid JSON payload");
                json!({ "error": "invalid JSON payload", "client_error": true })
            }
        };

        stdout.write_all(output.to_string().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }

    stdout.flush().await?;
    tracing::info!(ingested, rejected, "Input exhausted, shutting down");
    Ok(())
}
