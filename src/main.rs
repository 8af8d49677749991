use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use colgen::cli::Cli;
use colgen::config::{Config, Mode};
use colgen::llm::{ChatBackend, LlmClient};
use colgen::processor::RowProcessor;
use colgen::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Cli::parse();

    // Load config, then apply CLI overrides before anything reads it
    let mut cfg = Config::load();
    if args.mock {
        cfg = cfg.with("COLGEN_MODE", "mock");
    }

    if cfg.mode() == Mode::Production && cfg.api_key().is_none() {
        warn!("no OPENAI_API_KEY configured; upstream calls will be rejected");
    }

    let backend: Arc<dyn ChatBackend> = Arc::new(LlmClient::from_config(&cfg)?);
    let processor = Arc::new(RowProcessor::new(backend, &cfg));
    let app = server::build_router(AppState { processor }, &cfg);

    let host = args.host.unwrap_or_else(|| cfg.bind_host());
    let port = args.port.unwrap_or_else(|| cfg.bind_port());
    let addr = SocketAddr::from((host, port));

    info!(mode = ?cfg.mode(), "colgen listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    Ok(())
}
