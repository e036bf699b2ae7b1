//! Session controller
//!
//! The SessionController is the single authority over conversation state. It:
//! 1. Loads persisted history when a session starts, greeting empty sessions
//! 2. Accepts user input, one request at a time
//! 3. Builds the prompt from the transcript and sends it to the endpoint
//! 4. Appends the reply, or an inline error notice when the request fails
//! 5. Persists the durable part of the transcript after each accepted change
//!
//! Failures never escape to the caller: they end up as transcript entries or
//! as ignored submits.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::Greetings;
use crate::conversation::{self, prompt, Message, Transcript};
use crate::providers::{CompletionClient, TransportError};

use super::memory::HistoryStore;

/// Shown in the transcript when the request to the endpoint fails
pub const REQUEST_FAILED_TEXT: &str = "Error al procesar tu solicitud. Intenta de nuevo.";

/// Shown in the transcript when the endpoint answers with an unusable payload
pub const MALFORMED_REPLY_TEXT: &str = "Respuesta inválida del servidor";

/// Errors handled at the session boundary
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("A request is already pending")]
    ConcurrentSubmit,

    #[error("Malformed reply payload")]
    MalformedPayload,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Stored history is corrupt")]
    StorageCorrupt,

    #[error("Failed to persist history: {0}")]
    StorageWriteFailure(String),
}

/// What happened to a submit
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The reply was appended
    Replied,
    /// The request failed; an inline notice was appended instead
    Recovered(SessionError),
    /// The submit was dropped without side effects
    Ignored(SessionError),
    /// The session was reset while the request was in flight; the reply
    /// was dropped
    Discarded,
}

impl SubmitOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitOutcome::Replied => "replied",
            SubmitOutcome::Recovered(_) => "recovered",
            SubmitOutcome::Ignored(_) => "ignored",
            SubmitOutcome::Discarded => "discarded",
        }
    }
}

/// Observable state for the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub transcript: Transcript,
    pub pending: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    transcript: Transcript,
    /// Whether the first message is the ephemeral greeting
    greeted: bool,
    /// Bumped on every reset or reload
    epoch: u64,
}

impl SessionState {
    fn dismiss_greeting(&mut self) {
        if self.greeted && self.transcript.first().is_some_and(Message::is_system) {
            self.transcript.remove(0);
        }
        self.greeted = false;
    }
}

/// Holds the pending flag for the lifetime of one request and releases it on
/// drop, including when the submit future is cancelled.
struct PendingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SessionError> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(SessionError::ConcurrentSubmit);
        }
        Ok(Self { flag })
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct SessionController {
    client: Arc<dyn CompletionClient>,
    store: Arc<dyn HistoryStore>,
    greetings: Greetings,
    state: Mutex<SessionState>,
    input: Mutex<String>,
    pending: AtomicBool,
}

impl SessionController {
    pub fn new(client: Arc<dyn CompletionClient>, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            client,
            store,
            greetings: Greetings::default(),
            state: Mutex::new(SessionState::default()),
            input: Mutex::new(String::new()),
            pending: AtomicBool::new(false),
        }
    }

    /// Set the greeting set used for empty sessions
    pub fn with_greetings(mut self, greetings: Greetings) -> Self {
        self.greetings = greetings;
        self
    }

    /// Load persisted history, greeting the session if there is none.
    ///
    /// The store is the only source of truth: whatever is in memory is
    /// replaced, not merged. A reload starts a new epoch, so a reply to a
    /// request sent before it is discarded.
    pub async fn initialize(&self) {
        let mut state = self.state.lock().await;
        let loaded = self.store.load().await;
        state.epoch += 1;
        state.transcript = loaded;
        state.greeted = false;

        if state.transcript.is_empty() {
            let greeting = self.greetings.pick();
            tracing::debug!(%greeting, "greeting empty session");
            state.transcript.push(Message::system(greeting));
            state.greeted = true;
        } else {
            tracing::info!(messages = state.transcript.len(), "restored conversation history");
        }
    }

    /// Submit user input. Empty input and submits while a request is pending
    /// are ignored without touching any state.
    pub async fn submit(&self, input: &str) -> SubmitOutcome {
        if input.trim().is_empty() {
            tracing::debug!("ignoring empty submit");
            return SubmitOutcome::Ignored(SessionError::EmptyInput);
        }

        let _pending = match PendingGuard::acquire(&self.pending) {
            Ok(guard) => guard,
            Err(e) => {
                tracing::debug!("ignoring submit while a request is pending");
                return SubmitOutcome::Ignored(e);
            }
        };

        let (prompt, epoch) = {
            let mut state = self.state.lock().await;
            state.dismiss_greeting();
            let prompt = prompt::build(&state.transcript, input);
            state.transcript.push(Message::user(input));
            self.persist(&state.transcript).await;
            (prompt, state.epoch)
        };

        let result = self.client.complete(&prompt).await;

        let outcome = {
            let mut state = self.state.lock().await;
            if state.epoch != epoch {
                tracing::debug!("session was reset while the request was in flight, dropping reply");
                SubmitOutcome::Discarded
            } else {
                match result {
                    Ok(payload) => match payload.into_reply() {
                        Some(reply) => {
                            state.transcript.push(Message::ai(reply));
                            self.persist(&state.transcript).await;
                            SubmitOutcome::Replied
                        }
                        None => {
                            tracing::warn!("completion endpoint returned a malformed payload");
                            state.transcript.push(Message::system(MALFORMED_REPLY_TEXT));
                            SubmitOutcome::Recovered(SessionError::MalformedPayload)
                        }
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "completion request failed");
                        state.transcript.push(Message::system(REQUEST_FAILED_TEXT));
                        SubmitOutcome::Recovered(SessionError::Transport(e))
                    }
                }
            }
        };

        // A draft typed after a reset belongs to the new session
        if !matches!(outcome, SubmitOutcome::Discarded) {
            self.input.lock().await.clear();
        }
        outcome
    }

    /// Submit whatever is currently in the input buffer
    pub async fn submit_input(&self) -> SubmitOutcome {
        let input = self.input.lock().await.clone();
        self.submit(&input).await
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        *self.input.lock().await = text.into();
    }

    pub async fn input(&self) -> String {
        self.input.lock().await.clone()
    }

    /// Reset the conversation and drop persisted history. A request still in
    /// flight keeps `pending` set until it returns, but its reply is dropped.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.epoch += 1;
        state.transcript.clear();
        state.greeted = false;

        if let Err(e) = self.store.clear().await {
            tracing::warn!(
                error = %SessionError::StorageWriteFailure(e.to_string()),
                "failed to clear persisted history"
            );
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            transcript: state.transcript.clone(),
            pending: self.is_pending(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Save the durable part of `transcript`. Callers hold the state lock so
    /// a save never interleaves with a reset.
    async fn persist(&self, transcript: &[Message]) {
        let durable = conversation::durable(transcript);
        if let Err(e) = self.store.save(&durable).await {
            tracing::warn!(
                error = %SessionError::StorageWriteFailure(e.to_string()),
                "continuing with in-memory history"
            );
        }
    }
}
