use crate::prelude::{eprintln, *};
use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::ServerState;

pub async fn run_sse(options: super::cli::SseOptions, state: Arc<ServerState>) -> Result<()> {
    let verbose = state.global.verbose;
    if verbose {
        eprintln!(
            "Starting CKAN MCP server with SSE transport on {}:{}...",
            options.host, options.port
        );
    }

    let addr = format!("{}:{}", options.host, options.port);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app_router = Router::new()
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
        .layer(cors)
        .with_state(state);

    if verbose {
        eprintln!("MCP server listening on http://{addr}");
        eprintln!("SSE endpoint: http://{addr}/sse");
        eprintln!("Message endpoint: http://{addr}/message");
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {addr}: {e}"))?;

    info!("Serving MCP over HTTP on {addr}");

    axum::serve(listener, app_router)
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

async fn sse_handler(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let ready = format!("CKAN MCP endpoint ready for {}", state.client.base_url());
    let stream = stream::once(async move { Ok(Event::default().data(ready)) });
    Sse::new(stream)
}

async fn message_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let request_str = serde_json::to_string(&request).unwrap_or_default();
    let response = super::handle_request(&request_str, &state).await;
    Json(serde_json::to_value(response).unwrap_or(serde_json::Value::Null))
}
