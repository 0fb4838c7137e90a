use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api;
use crate::config::ServerConfig;
use crate::state::AppState;

/// Largest accepted request body; uploads carry base64 document bytes.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

pub fn app_router(state: AppState) -> Router {
    let cors = match &state.cors_origin {
        Some(origin) => CorsLayer::new().allow_origin(origin.clone()),
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health))
        .route("/api/documents", get(api::list_documents).post(api::upload_document))
        .route("/api/documents/{id}", get(api::get_document).delete(api::delete_document))
        .route("/api/documents/{id}/reviews", get(api::list_reviews).post(api::create_review))
        .route("/api/documents/{id}/reviews/latest", get(api::latest_review))
        .route("/api/retrieve", post(api::retrieve))
        .route("/api/chat", post(api::chat))
        .route(
            "/api/chat/history/{id}",
            get(api::chat_history).delete(api::clear_chat_history),
        )
        .route("/api/resume/{id}/context", post(api::resume_context))
        .route("/api/resume/{id}/chat", post(api::resume_chat))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config).await?;
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for coursemate")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(provider = ?config.embedding_provider, "coursemate listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
