use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use admin_gateway::{Gateway, GatewayConfig, HttpAuthBackend, InMemorySessionStore, ProxyClient};
use admin_gateway_axum::{AuthState, admin_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env();
    tracing::info!("Proxying to backend at {}", config.backend_api_url);

    let backend = Arc::new(HttpAuthBackend::new(&config));
    let store = Arc::new(InMemorySessionStore::new());
    let gateway = Arc::new(Gateway::new(config.clone(), backend, store)?);
    let proxy = Arc::new(ProxyClient::new(&config));

    let app = admin_router(AuthState::new(gateway, proxy));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Admin console listening on {}", addr);
    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
