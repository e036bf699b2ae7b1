//! API routes
//!
//! The UI talks to the session through these endpoints: it reads the
//! snapshot, submits text and clears the conversation. A draft can also be
//! kept server-side in the input buffer and submitted from there.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::core::SessionSnapshot;
use crate::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InputBody {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// `replied`, `recovered`, `ignored` or `discarded`
    pub outcome: &'static str,
    pub session: SessionSnapshot,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot().await)
}

async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Json<SubmitResponse> {
    let outcome = state.session.submit(&request.text).await;

    Json(SubmitResponse {
        outcome: outcome.kind(),
        session: state.session.snapshot().await,
    })
}

async fn input(State(state): State<AppState>) -> Json<InputBody> {
    Json(InputBody {
        text: state.session.input().await,
    })
}

async fn set_input(
    State(state): State<AppState>,
    Json(body): Json<InputBody>,
) -> Json<InputBody> {
    state.session.set_input(body.text).await;
    input(State(state)).await
}

async fn submit_input(State(state): State<AppState>) -> Json<SubmitResponse> {
    let outcome = state.session.submit_input().await;

    Json(SubmitResponse {
        outcome: outcome.kind(),
        session: state.session.snapshot().await,
    })
}

async fn clear(State(state): State<AppState>) -> Json<SessionSnapshot> {
    state.session.clear().await;
    state.session.initialize().await;
    Json(state.session.snapshot().await)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/session", get(session).delete(clear))
        .route("/v1/session/messages", post(submit))
        .route("/v1/session/input", get(input).put(set_input))
        .route("/v1/session/input/submit", post(submit_input))
}
