//! Charla - single-session chat client
//!
//! Keeps one conversation transcript, forwards each user message together
//! with the history to a remote completion endpoint, and persists the
//! conversation between runs. A small HTTP API lets any front end drive the
//! session.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod conversation;
mod core;
mod providers;
mod routes;

use config::Config;
use crate::core::{SessionController, SqliteHistoryStore};
use providers::HttpCompletionClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionController>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "charla=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let persona = config.load_persona().await?;
    let endpoint = config.endpoint(&persona);
    tracing::info!(persona = %persona.persona.name, url = %endpoint.url, "using completion endpoint");

    let store = Arc::new(SqliteHistoryStore::new(&config.db_path()).await?);
    let client = Arc::new(HttpCompletionClient::new(endpoint)?);

    let session = SessionController::new(client, store).with_greetings(persona.greetings);
    session.initialize().await;

    let state = AppState {
        session: Arc::new(session),
    };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Charla API running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
