use anyhow::Context;
use medibook::{config::ServerConfig, context::AppContext, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medibook=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env().context("Failed to load configuration")?;

    // Create application context
    let ctx = AppContext::new(config)
        .await
        .context("Failed to initialize application context")?;

    // Start server
    server::serve(ctx).await.context("Server error")?;

    Ok(())
}
