//! HTTP API server.
//!
//! Exposes course queries, the course catalog and session management.

use crate::agent::Source;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::{RagEngine, SessionManager};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state.
struct AppState {
    engine: RagEngine,
    sessions: Arc<SessionManager>,
}

impl AppState {
    fn new(orchestrator: &Orchestrator, engine: RagEngine) -> Self {
        Self {
            engine,
            sessions: orchestrator.sessions(),
        }
    }
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/courses", get(courses))
        .route("/api/session/{session_id}", delete(clear_session))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let orchestrator = Orchestrator::new(settings)?;
    let engine = orchestrator.rag_engine()?;
    let state = Arc::new(AppState::new(&orchestrator, engine));
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Coursemate API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Query", "POST   /api/query");
    Output::kv("Courses", "GET    /api/courses");
    Output::kv("Clear session", "DELETE /api/session/{id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<Source>,
    session_id: String,
}

#[derive(Serialize)]
struct ClearSessionResponse {
    session_id: String,
    cleared: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn internal_error(e: impl std::fmt::Display) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| state.sessions.create_session());

    info!("Query for {}: {}", session_id, req.query);

    match state.engine.query(&req.query, Some(&session_id)).await {
        Ok(response) => Json(QueryResponse {
            answer: response.answer,
            sources: response.sources,
            session_id,
        })
        .into_response(),
        Err(e) => {
            warn!("Query failed: {}", e);
            internal_error(e)
        }
    }
}

async fn courses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.engine.course_analytics().await {
        Ok(analytics) => Json(analytics).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    state.sessions.clear_session(&session_id);
    Json(ClearSessionResponse {
        session_id,
        cleared: true,
    })
}
