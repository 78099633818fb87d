use std::sync::Arc;

use biobind::{
    core::{authenticator::SoftwareAuthenticator, face::EmbeddedEngine},
    utils::config::Config,
    Application,
};
use tracing::{info, error};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::new()?;

    let file_appender = tracing_appender::rolling::daily("logs", "biobind.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.node.log_level)),
        )
        .with_writer(file_writer.and(std::io::stdout))
        .with_target(true)
        .init();

    info!("Starting biobind node v{}", env!("CARGO_PKG_VERSION"));

    // The embedded engine and software authenticator are the development
    // capabilities; production deployments inject device-backed ones.
    let app = Application::new(
        config,
        Arc::new(EmbeddedEngine),
        Arc::new(SoftwareAuthenticator::new()),
    )
    .await
    .map_err(|e| {
        error!("Failed to initialize application: {}", e);
        e
    })?;

    // Serves until the process receives a shutdown signal.
    app.run().await.map_err(|e| {
        error!("Application error: {}", e);
        e
    })?;

    info!("Application shutdown complete");
    Ok(())
}
