mod backend;
mod config;
mod routes;
mod services;
mod state;

use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = match config::AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let client = backend::hosted::HostedClient::new(&config.backend).expect("hosted service client init failed");
    tracing::info!(url = %config.backend.url, origin = %config.public_origin, "hosted service client initialized");

    let port = config.port;
    let state = state::AppState::new(Arc::new(client), config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "helpdesk listening");
    axum::serve(listener, app).await.expect("server failed");
}
