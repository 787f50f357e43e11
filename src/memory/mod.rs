//! 会话层：每客户端的问答历史、谓词、持久化

pub mod conversation;
pub mod persistence;
pub mod store;

pub use conversation::{Conversation, Question, TOPIC_PREDICATE};
pub use persistence::ConversationPersistence;
pub use store::ConversationStore;
