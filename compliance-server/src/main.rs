use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use compliance_core::policy::PolicyStore;
use compliance_core::Orchestrator;

use compliance_server::config::ServerConfig;
use compliance_server::routes::{build_router, AppState};

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let values: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(values))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();

    tracing::info!(
        "Starting compliance-server v{} on {}:{}",
        env!("CARGO_PKG_VERSION"),
        config.host,
        config.port
    );

    let policy_store = Arc::new(PolicyStore::new(config.config_dir.clone()));
    let orchestrator = Arc::new(Orchestrator::new(
        policy_store.clone(),
        config.gemini_api_key.clone(),
        config.enable_code_retention,
    ));

    let state = AppState {
        orchestrator,
        policy_store,
        config: config.clone(),
    };

    let app = build_router(state).layer(cors_layer(&config.allowed_origins));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .unwrap_or_else(|e| {
            tracing::error!("invalid bind address: {e}");
            std::process::exit(1);
        });

    tracing::info!("Listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("failed to bind {addr}: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}
