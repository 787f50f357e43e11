//! 按客户端隔离的会话存储
//!
//! 每个 client_id 一把 Mutex：同一客户端的问答串行执行以保证历史顺序，不同客户端互不阻塞。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::memory::conversation::Conversation;
use crate::memory::persistence::ConversationPersistence;

pub struct ConversationStore {
    max_histories: usize,
    persistence: Option<ConversationPersistence>,
    conversations: RwLock<HashMap<String, Arc<Mutex<Conversation>>>>,
}

impl ConversationStore {
    pub fn new(max_histories: usize, persistence: Option<ConversationPersistence>) -> Self {
        Self {
            max_histories,
            persistence,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// 获取或创建客户端会话；配置了持久化时先尝试从磁盘恢复
    pub async fn get_or_create(&self, client_id: &str) -> Arc<Mutex<Conversation>> {
        {
            let conversations = self.conversations.read().await;
            if let Some(c) = conversations.get(client_id) {
                return Arc::clone(c);
            }
        }

        let mut conversations = self.conversations.write().await;
        if let Some(c) = conversations.get(client_id) {
            return Arc::clone(c);
        }

        let conversation = self
            .restore(client_id)
            .unwrap_or_else(|| Conversation::new(client_id, self.max_histories));
        let conversation = Arc::new(Mutex::new(conversation));
        conversations.insert(client_id.to_string(), Arc::clone(&conversation));
        conversation
    }

    /// 获取会话（不创建）
    pub async fn get(&self, client_id: &str) -> Option<Arc<Mutex<Conversation>>> {
        self.conversations.read().await.get(client_id).cloned()
    }

    /// 写回磁盘；失败只记录日志
    pub fn persist(&self, conversation: &Conversation) {
        if let Some(persistence) = &self.persistence {
            if let Err(e) = persistence.save(conversation) {
                tracing::warn!(
                    "Failed to save conversation for [{}]: {}",
                    conversation.client_id(),
                    e
                );
            }
        }
    }

    pub async fn active_clients(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn list_clients(&self) -> Vec<String> {
        self.conversations.read().await.keys().cloned().collect()
    }

    fn restore(&self, client_id: &str) -> Option<Conversation> {
        let persistence = self.persistence.as_ref()?;
        match persistence.load(client_id, self.max_histories) {
            Ok(Some(c)) => {
                tracing::debug!("Restored {} questions for [{}]", c.len(), client_id);
                Some(c)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to restore conversation for [{}]: {}", client_id, e);
                None
            }
        }
    }
}
