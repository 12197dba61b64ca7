use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tags_input::constants::network;
use tags_input::errors::TagsError;
use tags_input::host::server::run_stdio;
use tags_input::services::logger::{LogLevel, Logger};
use tags_input::services::remote::HttpFetcher;

/// JSON-lines driver for tags inputs: requests on stdin, views on stdout.
#[derive(Debug, Parser)]
#[command(name = "tags-input", version)]
struct Cli {
    /// error, warn, info or debug. Overrides TAGS_LOG_LEVEL.
    #[arg(long)]
    log_level: Option<String>,

    /// HTTP timeout for suggestion requests.
    #[arg(long, default_value_t = network::TIMEOUT_REQUEST_MS)]
    timeout_ms: u64,
}

async fn run(cli: Cli) -> Result<(), TagsError> {
    let mut logger = Logger::new("tags");
    if let Some(raw) = cli.log_level.as_deref() {
        let level = LogLevel::parse(raw).ok_or_else(|| {
            TagsError::invalid_config(format!("log-level: unknown level {}", raw))
                .with_hint("Use one of error, warn, info, debug.")
        })?;
        logger.set_level(level);
    }
    let fetcher = HttpFetcher::new(Duration::from_millis(cli.timeout_ms))?;
    run_stdio(Arc::new(fetcher), logger).await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("tags-input: {}", err);
        std::process::exit(1);
    }
}
