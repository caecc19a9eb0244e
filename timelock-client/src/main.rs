//! Timelock Service
//!
//! HTTP front for the timelock client: lists an owner's vaults and builds
//! unsigned lock/withdraw transactions for browser wallets to sign.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::Response,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timelock_client::{
    routes::{self, AppState},
    types::Config,
    SolanaRpc, TimelockClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timelock_client=info,timelock_service=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    info!(port = config.port, "Starting timelock service");
    info!(
        rpc_url = %config.rpc_url,
        program_id = %config.program_id,
        cors_origins = ?config.cors_origins,
        api_keys_configured = !config.api_keys.is_empty(),
        "Configuration loaded"
    );
    if config.api_keys.is_empty() {
        warn!("No API keys configured - running in development mode");
    }

    let rpc = Arc::new(SolanaRpc::new(&config.rpc_url));
    let client = Arc::new(TimelockClient::new(config.client_config(), rpc));

    let cors = build_cors_layer(&config);

    let app = routes::router(AppState {
        config: config.clone(),
        client,
    })
    .layer(middleware::from_fn_with_state(
        config.clone(),
        api_key_middleware,
    ))
    .layer(cors)
    .layer(RequestBodyLimitLayer::new(16 * 1024))
    .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(address = %addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

/// Build CORS layer from config
fn build_cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-api-key"),
        ])
}

/// API key authentication middleware
async fn api_key_middleware(
    State(config): State<Arc<Config>>,
    headers: HeaderMap,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if request.uri().path() == "/health" || config.api_keys.is_empty() {
        return Ok(next.run(request).await);
    }

    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("Request missing API key");
            StatusCode::UNAUTHORIZED
        })?;

    // never log the key itself
    if !config.api_keys.iter().any(|key| key == api_key) {
        warn!("Invalid API key provided");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
