use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use promfix_server::{http, Config, FixtureEngine, ServerResult};

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::parse();
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "promfix failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> ServerResult<()> {
    let engine = FixtureEngine::setup(&config.fixture, &config)?;
    let app = http::router(Arc::new(engine));

    let listener = TcpListener::bind(config.listen).await?;
    info!(listen = %config.listen, "serving query API");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
