use anyhow::{Context, Result};
use furia_chat::integration::{build_controller, ChatConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stderr keeps the chat output on stdout readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "furia_chat=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting FURIA chat");

    let config = ChatConfig::load().context("failed to load configuration")?;
    let controller = build_controller(&config).map_err(|e| {
        anyhow::anyhow!("{} ({})", e.user_message(), e)
    })?;

    furia_chat::ui::terminal::run(Arc::new(controller)).await
}
