use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use contracts_cli::{init_tracing, ui};
use contracts_core::Settings;
use contracts_rag::Services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(false)?;
    let settings = Settings::load()?;
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let services = Services::open(settings).await?;

    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!("🌐 contracts UI listening on http://{addr}");
    axum::serve(listener, ui::router(Arc::new(services))).await?;
    Ok(())
}
