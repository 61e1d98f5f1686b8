use std::sync::Arc;

use anyhow::Context;

use agencyops_api::app::{build_app, build_services, seed};
use agencyops_api::config::ApiConfig;
use agencyops_infra::EngineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env();
    agencyops_observability::init_with(config.log_format);

    let services = Arc::new(build_services(EngineConfig::from_env()));
    if config.seed_demo {
        seed::seed_demo(services.engine()).context("failed to seed demo data")?;
    }

    let app = build_app(config.jwt_secret.clone(), services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
