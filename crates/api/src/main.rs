use anyhow::Context;

use blogbus_api::config::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    blogbus_observability::init();

    let config = ServiceConfig::from_env().context("invalid configuration")?;

    let app = blogbus_api::app::build_app(&config)
        .await
        .with_context(|| format!("{} service failed to start", config.kind))?;

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(service = %config.kind, addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app.router.clone())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;

    app.drain().await;
    tracing::info!(service = %config.kind, "stopped");

    Ok(())
}
