//! Single source of truth for conversation state. Sequences a turn
//! end-to-end: classify intent, retrieve project context, call the
//! completion API, append the reply, schedule a persisted save.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::chat::persistence::{
    ConversationStorage, FileStorage, PersistedConversation, SaveScheduler,
};
use crate::chat::state::{ConversationState, Message, MessageMetadata};
use crate::config::AssistantConfig;
use crate::context::ProjectContextStore;
use crate::error::Result;
use crate::github::GitHubClient;
use crate::intent::IntentClassifier;
use crate::llm::{GroqClient, Role, SamplingParams};
use crate::prompt::PromptComposer;

/// Persisted records older than this are discarded at startup.
const DEFAULT_MAX_RECORD_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Pause before the canned welcome message appears in a freshly opened chat.
const DEFAULT_WELCOME_DELAY: Duration = Duration::from_millis(500);

const WELCOME_MESSAGE: &str = "👋 Hi! I'm Dhruba's AI assistant. I can tell you about his projects, technical expertise, and development approach. What would you like to know?";

const WELCOME_SUGGESTED_QUESTIONS: &[&str] = &[
    "Tell me about Dhruba's major projects",
    "How does AI orchestration work?",
    "What technologies does he specialize in?",
    "How can I contact Dhruba?",
];

const FALLBACK_APOLOGY: &str = "I apologize, but I'm having trouble processing your request right now. Please try again or ask me something else about Dhruba's projects and experience.";

pub const QUICK_QUESTIONS: &[&str] = &[
    "What are Dhruba's major projects?",
    "How does AI orchestration work?",
    "Tell me about the Event Manager",
    "What's special about GitIQ?",
    "How was this portfolio built?",
    "What technologies does he use?",
    "How can I hire Dhruba?",
    "What's his development process?",
];

pub struct ConversationController {
    state: ConversationState,
    classifier: IntentClassifier,
    composer: PromptComposer,
    store: ProjectContextStore,
    saver: SaveScheduler,
    id_counter: u64,
    welcome_delay: Duration,
    max_record_age: Duration,
}

impl ConversationController {
    pub fn new(
        composer: PromptComposer,
        store: ProjectContextStore,
        storage: Arc<dyn ConversationStorage>,
    ) -> Self {
        Self {
            state: ConversationState::default(),
            classifier: IntentClassifier::new(),
            composer,
            store,
            saver: SaveScheduler::new(storage),
            id_counter: 0,
            welcome_delay: DEFAULT_WELCOME_DELAY,
            max_record_age: DEFAULT_MAX_RECORD_AGE,
        }
    }

    /// Wire up the full pipeline from a configuration: live Groq and GitHub
    /// clients and file-backed persistence.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let completion =
            GroqClient::new(config.groq_api_key.clone()).with_model(config.model.clone());
        let composer = PromptComposer::new(Arc::new(completion))
            .with_owner(config.owner_name.clone(), config.owner_title.clone())
            .with_params(SamplingParams {
                temperature: config.temperature,
                ..Default::default()
            });

        let provider = Arc::new(GitHubClient::new(
            config.github_token.clone(),
            config.github_username.clone(),
        ));
        let store = ProjectContextStore::new(provider);

        let storage = Arc::new(FileStorage::new()?);
        Ok(Self::new(composer, store, storage))
    }

    pub fn with_welcome_delay(mut self, delay: Duration) -> Self {
        self.welcome_delay = delay;
        self
    }

    pub fn with_max_record_age(mut self, max_age: Duration) -> Self {
        self.max_record_age = max_age;
        self
    }

    pub fn with_save_quiet_interval(mut self, interval: Duration) -> Self {
        self.saver = SaveScheduler::new(self.saver.storage().clone()).with_quiet_interval(interval);
        self
    }

    /// Adopt a persisted conversation when one exists, is on the current
    /// schema version, is younger than the age cutoff, and is non-empty.
    /// Anything else starts the session empty; a version or age mismatch
    /// discards the record in full.
    pub fn initialize(&mut self) {
        let record = match self.saver.storage().load() {
            Ok(Some(record)) => record,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "could not load persisted conversation");
                return;
            }
        };

        if !record.is_current_version()
            || record.is_expired(self.max_record_age)
            || record.messages.is_empty()
        {
            if let Err(e) = self.saver.storage().clear() {
                warn!(error = %e, "could not discard stale conversation record");
            }
            return;
        }

        // Advance the id counter past the highest id seen so restored
        // sessions never mint colliding ids.
        if let Some(last) = record.messages.last() {
            if let Some(counter) = parse_id_counter(&last.id) {
                self.id_counter = counter;
            }
        }

        info!(
            messages = record.messages.len(),
            "restored persisted conversation"
        );
        self.state.messages = record.messages;
        self.state.context = record.context;
    }

    /// Run one full turn. Empty input or a send already in flight is a
    /// silent no-op. The user message is appended synchronously before any
    /// asynchronous work; the loading flag is always cleared on completion.
    pub async fn send_message(&mut self, text: &str) {
        if text.trim().is_empty() || self.state.is_loading {
            return;
        }

        self.append_message(text.to_string(), Role::User, None);
        self.state.is_loading = true;
        self.state.is_typing = true;
        let started = Instant::now();

        let intent = self.classifier.classify(text);
        self.state.context.user_intent = intent;
        self.state.context.push_question(text);
        self.schedule_save();

        let context = self.state.context.clone();
        let additional_context = self.store.build_context_for_query(text, &context).await;

        let result = self
            .composer
            .generate_response(&self.state.messages, &context, &additional_context)
            .await;

        self.state.is_typing = false;
        match result {
            Ok(reply) => {
                self.state.error = None;
                let metadata = MessageMetadata {
                    response_time_ms: Some(started.elapsed().as_millis() as u64),
                    suggested_questions: reply.suggested_questions,
                    project_references: reply.project_references,
                };
                self.append_message(reply.message, Role::Assistant, Some(metadata));
            }
            Err(e) => {
                // Logged for diagnostics; the user only sees the fixed
                // apology and the conversation stays usable.
                error!(error = %e, "assistant turn failed");
                self.state.error = Some(e.to_string());
                self.append_message(FALLBACK_APOLOGY.to_string(), Role::Assistant, None);
            }
        }
        self.state.is_loading = false;
    }

    /// Flip the panel open or closed. Opening onto an empty log injects the
    /// canned welcome message after a short delay; the emptiness guard means
    /// this happens at most once per session.
    pub async fn toggle_chat(&mut self) {
        self.state.is_open = !self.state.is_open;

        if self.state.is_open && self.state.messages.is_empty() {
            tokio::time::sleep(self.welcome_delay).await;
            let metadata = MessageMetadata {
                suggested_questions: WELCOME_SUGGESTED_QUESTIONS
                    .iter()
                    .map(|q| q.to_string())
                    .collect(),
                ..Default::default()
            };
            self.append_message(WELCOME_MESSAGE.to_string(), Role::Assistant, Some(metadata));
        }
    }

    pub fn close_chat(&mut self) {
        self.state.is_open = false;
    }

    /// Empty the log, reset the context, and erase the persisted record.
    pub fn clear_chat(&mut self) {
        self.state.messages.clear();
        self.state.context = Default::default();
        self.state.error = None;
        self.saver.cancel();
        if let Err(e) = self.saver.storage().clear() {
            warn!(error = %e, "could not erase persisted conversation");
        }
    }

    pub async fn send_suggested_question(&mut self, question: &str) {
        self.send_message(question).await;
    }

    /// Write any pending debounced save immediately.
    pub fn flush_pending_save(&mut self) {
        self.saver.flush();
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn quick_questions(&self) -> &'static [&'static str] {
        QUICK_QUESTIONS
    }

    pub fn message_count(&self) -> usize {
        self.state.messages.len()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.state.messages.last()
    }

    fn next_message_id(&mut self) -> String {
        self.id_counter += 1;
        format!("msg_{}_{}", Utc::now().timestamp_millis(), self.id_counter)
    }

    fn append_message(&mut self, content: String, role: Role, metadata: Option<MessageMetadata>) {
        let message = Message {
            id: self.next_message_id(),
            role,
            content,
            timestamp: Utc::now(),
            metadata,
        };
        self.state.messages.push(message);
        self.schedule_save();
    }

    fn schedule_save(&mut self) {
        self.saver.schedule(PersistedConversation::new(
            self.state.messages.clone(),
            self.state.context.clone(),
        ));
    }

    #[cfg(test)]
    pub(crate) fn force_loading(&mut self, loading: bool) {
        self.state.is_loading = loading;
    }
}

/// Message ids end in `_{counter}`; the counter restores across reloads.
fn parse_id_counter(id: &str) -> Option<u64> {
    id.rsplit_once('_').and_then(|(_, tail)| tail.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::MemoryStorage;
    use crate::error::AssistantError;
    use crate::llm::{Completion, CompletionClient, PromptMessage, SamplingParams};

    struct StubCompletion;

    #[async_trait::async_trait]
    impl CompletionClient for StubCompletion {
        async fn complete(
            &self,
            _messages: &[PromptMessage],
            _params: &SamplingParams,
        ) -> Result<Completion> {
            Ok(Completion {
                content: "Sure.".to_string(),
                usage: None,
            })
        }
    }

    struct StubProvider;

    #[async_trait::async_trait]
    impl crate::github::GitProvider for StubProvider {
        async fn repository_stats(&self, _repo: &str) -> Result<crate::github::GitRepoStats> {
            Err(AssistantError::provider(503, "offline"))
        }

        async fn repository_readme(&self, _repo: &str) -> Result<String> {
            Err(AssistantError::NotFound("README not found".into()))
        }
    }

    fn controller() -> ConversationController {
        let composer = PromptComposer::new(Arc::new(StubCompletion));
        let store = ProjectContextStore::new(Arc::new(StubProvider));
        ConversationController::new(composer, store, Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn parses_trailing_counter() {
        assert_eq!(parse_id_counter("msg_1718000000000_42"), Some(42));
        assert_eq!(parse_id_counter("not-an-id"), None);
    }

    #[tokio::test]
    async fn send_while_loading_appends_nothing() {
        let mut controller = controller();
        controller.force_loading(true);
        controller.send_message("tell me about gitiq").await;
        assert_eq!(controller.message_count(), 0);
    }

    #[tokio::test]
    async fn empty_and_whitespace_input_is_dropped() {
        let mut controller = controller();
        controller.send_message("").await;
        controller.send_message("   \n\t").await;
        assert_eq!(controller.message_count(), 0);
    }
}
