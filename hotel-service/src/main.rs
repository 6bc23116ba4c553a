use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use common_auth::{JwtVerifier, TokenSigner};
use common_store::{DocumentStore, MongoStore};
use hotel_service::config::{load_key_material, load_service_config};
use hotel_service::metrics::ServiceMetrics;
use hotel_service::{build_router, AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_service_config()?;
    let keys = load_key_material()?;

    let token_signer = TokenSigner::from_pem(config.jwt.clone(), &keys.private_pem)
        .context("Failed to load JWT signing key")?;
    let jwt_verifier = JwtVerifier::from_pem(config.jwt.clone(), &keys.public_pem)
        .context("Failed to load JWT verification key")?;

    let mongo = MongoStore::connect(&config.mongo)
        .await
        .context("Failed to connect to MongoDB")?;
    if let Err(err) = mongo.ping().await {
        warn!(error = %err, "MongoDB did not answer the startup ping");
    }
    let store: Arc<dyn DocumentStore> = Arc::new(mongo);

    let ip: IpAddr = config.host.parse().context("HOST is not an IP address")?;
    let addr = SocketAddr::from((ip, config.port));

    let state = AppState {
        store: store.clone(),
        jwt_verifier: Arc::new(jwt_verifier),
        token_signer: Arc::new(token_signer),
        config: Arc::new(config),
        metrics: Arc::new(ServiceMetrics::new()?),
    };
    let app = build_router(state);

    info!(%addr, "starting hotel-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.shutdown().await;
    info!("hotel-service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
}
