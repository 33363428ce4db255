//! textmill - document text extraction and full-text search maintenance.

use textmill::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must land before logging reads the environment
    let _ = dotenvy::dotenv();

    let default_filter = if cli::is_verbose() {
        "textmill=info"
    } else {
        "textmill=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    cli::run().await
}
