use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use wa_gateway::client::WaClient;
use wa_gateway::config::Config;
use wa_gateway::gateway::OutboundGateway;
use wa_gateway::http::{router, AppState};
use wa_gateway::session::SessionManager;
use wa_gateway::store::FileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(port = config.port, session_dir = %config.session_dir.display(), "starting wa-gateway");

    let store = Arc::new(FileStore::new(config.session_dir.clone()));
    let (client, events) = WaClient::new(store);

    let session = SessionManager::new(client, &config);
    session
        .set_reply_hook(|msg| {
            let text = msg.body.to_lowercase();
            (text.contains("hello") || text.contains("hi"))
                .then(|| "Welcome! This line is monitored by wa-gateway.".to_string())
        })
        .await;
    tokio::spawn(Arc::clone(&session).run(events));
    session.initiate().await?;

    let gateway = Arc::new(OutboundGateway::new(
        Arc::clone(&session),
        config.country_code.clone(),
        config.send_timeout,
    ));

    let state = AppState::new(gateway, Arc::clone(&session));
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://localhost:{}", config.port);
    tracing::info!("pairing code at http://localhost:{}/qr", config.port);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;
    session.shutdown().await;
    Ok(())
}
