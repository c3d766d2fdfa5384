pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod github;
pub mod intent;
pub mod llm;
pub mod prompt;

// Re-export key types
pub use chat::{ConversationContext, ConversationController, ConversationState, Message};
pub use config::AssistantConfig;
pub use context::{ProjectContext, ProjectContextStore};
pub use error::AssistantError;
pub use github::{GitHubClient, GitProvider, GitRepoStats};
pub use intent::{Intent, IntentClassifier};
pub use llm::{CompletionClient, GroqClient, PromptMessage, Role, SamplingParams};
pub use prompt::{AssistantReply, PromptComposer};
