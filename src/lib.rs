pub mod adapters;
pub mod app;
mod assets;
pub mod auth;
pub mod care;
pub mod config;
pub mod errors;
pub mod ports;
pub mod state;
mod templates;

use std::net::SocketAddr;

/// Run the server against an in-memory document store.
pub async fn serve(addr: SocketAddr, config: config::AppConfig) {
    let store = adapters::MemoryStore::new();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app::app(config, store))
        .await
        .expect("server error");
}
