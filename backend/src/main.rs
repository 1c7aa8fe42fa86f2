use std::net::SocketAddr;

use axum::{http::Method, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Level};

use lunchbox_backend::config::Config;
use lunchbox_backend::io::rest;
use lunchbox_backend::Backend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let config = Config::from_env();
    let backend = Backend::new(&config)?;

    // CORS setup to allow the web frontend to make requests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", rest::api_router())
        .layer(cors)
        .with_state(backend);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
