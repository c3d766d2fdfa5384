mod controller;
pub mod persistence;
mod state;

pub use controller::{ConversationController, QUICK_QUESTIONS};
pub use persistence::{
    ConversationStorage, FileStorage, MemoryStorage, PersistedConversation, SaveScheduler,
    STORAGE_VERSION,
};
pub use state::{
    ConversationContext, ConversationState, Message, MessageMetadata, UserProfile,
    QUESTION_HISTORY_LEN,
};
