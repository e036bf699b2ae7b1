//! Chat personas
//!
//! A persona ties together the completion endpoint a deployment talks to and
//! the greetings shown while a conversation is still empty. Two personas are
//! built in; others can be loaded from TOML files.
//!
//! # Example Persona File
//!
//! ```toml
//! [persona]
//! name = "mei"
//! description = "Personal assistant"
//!
//! [endpoint]
//! url = "https://miik.pythonanywhere.com/mei_assistant"
//!
//! [greetings]
//! texts = ["¡Hola, soy mei!"]
//! ```

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// A persona definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Persona metadata
    pub persona: PersonaInfo,

    /// Where prompts are sent
    pub endpoint: EndpointInfo,

    /// Greeting set for empty conversations
    pub greetings: Greetings,
}

/// Persona metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaInfo {
    pub name: String,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub url: String,
}

/// Fixed set of greetings; one is picked uniformly at random per empty
/// session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Greetings {
    pub texts: Vec<String>,
}

impl Greetings {
    pub fn new<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            texts: texts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, text: &str) -> bool {
        self.texts.iter().any(|t| t == text)
    }

    /// Pick a greeting. Falls back to the default set if this one is empty.
    pub fn pick(&self) -> String {
        let mut rng = rand::thread_rng();
        self.texts
            .choose(&mut rng)
            .cloned()
            .or_else(|| builtin::CHAT_GREETINGS.choose(&mut rng).map(|s| s.to_string()))
            .unwrap_or_default()
    }
}

impl Default for Greetings {
    fn default() -> Self {
        Self::new(builtin::CHAT_GREETINGS.iter().copied())
    }
}

impl Persona {
    /// Resolve a built-in persona by name
    pub fn builtin(name: &str) -> Result<Self, PersonaError> {
        match name.to_lowercase().as_str() {
            "chat" | "default" => Ok(Self::from_parts(
                "chat",
                "General chat",
                builtin::CHAT_ENDPOINT,
                builtin::CHAT_GREETINGS,
            )),
            "mei" => Ok(Self::from_parts(
                "mei",
                "Personal assistant",
                builtin::MEI_ENDPOINT,
                builtin::MEI_GREETINGS,
            )),
            _ => Err(PersonaError::NotFound(name.to_string())),
        }
    }

    fn from_parts(name: &str, description: &str, url: &str, greetings: &[&str]) -> Self {
        Self {
            persona: PersonaInfo {
                name: name.to_string(),
                description: description.to_string(),
            },
            endpoint: EndpointInfo {
                url: url.to_string(),
            },
            greetings: Greetings::new(greetings.iter().copied()),
        }
    }

    /// Parse a persona from TOML
    pub fn from_toml(content: &str) -> Result<Self, PersonaError> {
        let persona: Persona =
            toml::from_str(content).map_err(|e| PersonaError::ParseError(e.to_string()))?;
        persona.validate()?;
        Ok(persona)
    }

    /// Load a persona directly from a file path
    pub async fn load_from_file(path: &Path) -> Result<Self, PersonaError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PersonaError::IoError(e.to_string()))?;

        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<(), PersonaError> {
        if self.greetings.texts.iter().all(|g| g.trim().is_empty()) {
            return Err(PersonaError::Validation(format!(
                "persona '{}' has no greetings",
                self.persona.name
            )));
        }
        if self.endpoint.url.trim().is_empty() {
            return Err(PersonaError::Validation(format!(
                "persona '{}' has no endpoint url",
                self.persona.name
            )));
        }
        Ok(())
    }
}

/// Errors from persona loading
#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Persona not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Built-in personas that don't require files
pub mod builtin {
    pub const CHAT_ENDPOINT: &str = "https://miik.pythonanywhere.com/otprompt";

    pub const CHAT_GREETINGS: &[&str] = &[
        "¡Que empiece la vaina!",
        "¡Epa, chamo!",
        "¿Qué hay, mi pana?",
        "¡Qué fue, hermano!",
        "¡Qué fue, vale!",
    ];

    pub const MEI_ENDPOINT: &str = "https://miik.pythonanywhere.com/mei_assistant";

    pub const MEI_GREETINGS: &[&str] = &["¡Hola, soy mei!"];
}
