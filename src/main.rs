use std::sync::Arc;

use anyhow::Context;
use caption_it::{web, FormConfig, HttpCaptionService};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("caption_it=info,tower_http=info")),
        )
        .init();

    let config = FormConfig::from_env().context("invalid configuration")?;
    let service = HttpCaptionService::new(&config.api_base_url, config.request_timeout)
        .context("failed to build HTTP client")?;
    tracing::info!(endpoint = service.endpoint(), "using caption service");

    let bind_addr = config.bind_addr;
    let state = web::AppState::new(config, Arc::new(service));
    let app = web::router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("🚀 Server running on http://{}", bind_addr);
    tracing::info!("📸 Open in your browser to start captioning!");

    axum::serve(listener, app).await?;
    Ok(())
}
