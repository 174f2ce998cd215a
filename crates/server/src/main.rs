//! # airq-server
//!
//! REST API serving the latest recorded PM2.5 forecast.

use std::env;
use std::net::SocketAddr;
use std::time::Instant;

use airq_facade::AppConfig;
use axum::http::HeaderValue;
use axum::{routing::get, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod routes;

use routes::AppState;

fn cors_layer() -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let origin = match env::var("CORS_ORIGIN") {
        Ok(origin) if !origin.trim().is_empty() => {
            AllowOrigin::exact(HeaderValue::from_str(origin.trim())?)
        }
        _ => AllowOrigin::from(Any),
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airq=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let state = AppState {
        results_path: config.results_path.clone(),
        started: Instant::now(),
    };

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/api/predictions", get(routes::predictions))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer()?)
        .with_state(state);

    // Server configuration from environment
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "3002".to_string())
        .parse()?;
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    tracing::info!(
        results = %config.results_path.display(),
        "airq-server v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
