//! Append-only interview transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::ChatMessage;

/// Who said a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Model,
}

/// One line of the interview. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMessage {
    pub id: String,
    pub role: Speaker,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl TranscriptMessage {
    fn new(role: Speaker, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Ordered interview history. Lines can only be appended, never edited or
/// removed; a new session starts from an empty transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<TranscriptMessage>,
}

impl Transcript {
    /// Record a completed turn: the user's text followed by the model's reply.
    /// Returns the model's line.
    pub(crate) fn push_turn(
        &mut self,
        user: impl Into<String>,
        model: impl Into<String>,
    ) -> &TranscriptMessage {
        self.messages.push(TranscriptMessage::new(Speaker::User, user));
        let index = self.messages.len();
        self.messages.push(TranscriptMessage::new(Speaker::Model, model));
        &self.messages[index]
    }

    pub fn messages(&self) -> &[TranscriptMessage] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TranscriptMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of answered user turns.
    pub fn turns(&self) -> usize {
        self.iter().filter(|m| m.role == Speaker::User)
            .count()
    }

    /// Map the transcript to provider messages, in order.
    pub fn to_llm_messages(&self) -> Vec<ChatMessage> {
        self.iter()
            .map(|m| match m.role {
                Speaker::User => ChatMessage::user(&m.text),
                Speaker::Model => ChatMessage::assistant(&m.text),
            })
            .collect()
    }

    /// Plain-text rendering used inside the report prompt.
    pub fn render(&self) -> String {
        self.iter()
            .map(|m| {
                let who = match m.role {
                    Speaker::User => "Patient",
                    Speaker::Model => "Assistant",
                };
                format!("{}: {}", who, m.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
