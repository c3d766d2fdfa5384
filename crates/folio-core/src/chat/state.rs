use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::intent::Intent;
use crate::llm::Role;

/// How many prior user questions the context keeps; oldest evicted first.
pub const QUESTION_HISTORY_LEN: usize = 5;

/// One entry in the conversation log. Immutable once created; the log is
/// append-only and never reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub project_references: Vec<String>,
}

/// Rolling conversation context, superseded wholesale on reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    pub user_intent: Intent,
    #[serde(default)]
    pub previous_questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<UserProfile>,
}

impl ConversationContext {
    /// Record a question, evicting the oldest past the history bound.
    pub fn push_question(&mut self, question: impl Into<String>) {
        self.previous_questions.push(question.into());
        let overflow = self
            .previous_questions
            .len()
            .saturating_sub(QUESTION_HISTORY_LEN);
        if overflow > 0 {
            self.previous_questions.drain(..overflow);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub is_recruiter: bool,
    #[serde(default)]
    pub is_developer: bool,
    #[serde(default)]
    pub is_client: bool,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// The single per-session conversation state.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub is_open: bool,
    pub is_loading: bool,
    pub is_typing: bool,
    pub messages: Vec<Message>,
    pub context: ConversationContext,
    pub error: Option<String>,
}
