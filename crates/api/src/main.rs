use std::sync::Arc;

use anyhow::Context;

use facturx_api::app::{build_app, build_services};
use facturx_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    facturx_observability::init(config.log_format);

    let services = Arc::new(build_services(&config)?);
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        policy = ?config.future_date_policy,
        "listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;
    Ok(())
}
