//! Conversation types and transcript helpers

pub mod prompt;

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Role,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Ai,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Ai => "ai",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            sender: Role::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Role::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            sender: Role::Ai,
            text: text.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.sender == Role::System
    }
}

/// Ordered sequence of messages making up the visible conversation.
pub type Transcript = Vec<Message>;

/// The durable subset of a transcript: everything except system messages
/// (greetings and inline error notices are never persisted).
pub fn durable(transcript: &[Message]) -> Transcript {
    transcript
        .iter()
        .filter(|m| !m.is_system())
        .cloned()
        .collect()
}
