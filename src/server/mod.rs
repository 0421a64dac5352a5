pub mod handlers;
pub mod middleware;
pub mod types;

use crate::{Result, config::Config, gateway::InferenceGateway};
use axum::{Router, extract::DefaultBodyLimit, routing::post};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use handlers::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(handlers::chat))
        .route(
            "/analyze-image",
            post(handlers::analyze_image).layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::validate_image,
            )),
        )
        .layer(DefaultBodyLimit::max(state.body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    // Fails here, before binding, when the credential is missing
    let gateway = InferenceGateway::from_config(&config.llm)?;

    let app_state = AppState {
        gateway: Arc::new(gateway),
        body_limit: config.server.body_limit_bytes,
    };

    let app = router(app_state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
