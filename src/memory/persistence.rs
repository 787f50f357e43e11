//! 会话持久化
//!
//! 每个客户端一个 JSON 文件（`<dir>/<client_id>.json`），保存问答历史与谓词，
//! 首次访问时恢复，每次问答后写回。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::memory::conversation::{Conversation, Question};

/// 基于目录的会话持久化
#[derive(Debug, Clone)]
pub struct ConversationPersistence {
    dir: PathBuf,
}

impl ConversationPersistence {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, client_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_client_id(client_id)))
    }

    /// 加载某客户端的会话；文件不存在时返回 None
    pub fn load(&self, client_id: &str, max_histories: usize) -> Result<Option<Conversation>> {
        let path = self.path_for(client_id);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        let stored: StoredConversation = serde_json::from_str(&data)?;
        if stored.client_id != client_id {
            tracing::warn!(
                "Conversation file {:?} belongs to [{}], not [{}]",
                path,
                stored.client_id,
                client_id
            );
            return Ok(None);
        }
        Ok(Some(Conversation::restore(
            client_id,
            max_histories,
            stored.questions,
            stored.predicates,
        )))
    }

    /// 写入会话；目录不存在时自动创建
    pub fn save(&self, conversation: &Conversation) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let stored = StoredConversation {
            client_id: conversation.client_id().to_string(),
            questions: conversation.questions().to_vec(),
            predicates: conversation.predicates().clone(),
        };
        std::fs::write(
            self.path_for(conversation.client_id()),
            serde_json::to_string_pretty(&stored)?,
        )?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredConversation {
    client_id: String,
    questions: Vec<Question>,
    #[serde(default)]
    predicates: HashMap<String, String>,
}

/// client_id 转文件名：ASCII 字母数字与 `-` 原样保留，其余字节（含 `_`）编码为 `_XX`，不同 id 不会落到同一文件
fn sanitize_client_id(client_id: &str) -> String {
    let mut out = String::with_capacity(client_id.len());
    for byte in client_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("_{:02X}", byte));
        }
    }
    out
}
