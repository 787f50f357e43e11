//! 会话历史
//!
//! 每个客户端一份有序的问答历史（Question），外加客户端谓词（如 topic）。
//! 问题先入列、回复在求值结束后补上；超出 max_histories 时丢弃最旧的条目。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pattern::strip_all_punctuation;

/// 保存 topic 的谓词名
pub const TOPIC_PREDICATE: &str = "topic";

/// 一次问答：输入句子与最终回复
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
    pub sentence: String,
    pub response: Option<String>,
    pub asked_at: DateTime<Utc>,
}

impl Question {
    pub fn new(sentence: impl Into<String>) -> Self {
        Self {
            sentence: sentence.into(),
            response: None,
            asked_at: Utc::now(),
        }
    }
}

/// 单个客户端的会话
#[derive(Clone, Debug)]
pub struct Conversation {
    client_id: String,
    questions: Vec<Question>,
    predicates: HashMap<String, String>,
    max_histories: usize,
}

impl Conversation {
    pub fn new(client_id: impl Into<String>, max_histories: usize) -> Self {
        Self {
            client_id: client_id.into(),
            questions: Vec::new(),
            predicates: HashMap::new(),
            max_histories: max_histories.max(2),
        }
    }

    /// 从持久化数据恢复
    pub fn restore(
        client_id: impl Into<String>,
        max_histories: usize,
        questions: Vec<Question>,
        predicates: HashMap<String, String>,
    ) -> Self {
        let mut conversation = Self::new(client_id, max_histories);
        conversation.questions = questions;
        conversation.predicates = predicates;
        conversation.prune();
        conversation
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn predicates(&self) -> &HashMap<String, String> {
        &self.predicates
    }

    /// 记录新问题（回复待定）
    pub fn record_question(&mut self, sentence: impl Into<String>) {
        self.questions.push(Question::new(sentence));
        self.prune();
    }

    /// 给最新的问题补上回复
    pub fn attach_response(&mut self, response: impl Into<String>) {
        if let Some(q) = self.questions.last_mut() {
            q.response = Some(response.into());
        }
    }

    /// 倒数第 n 个问题（1 为最新）
    pub fn nth_question(&self, n: usize) -> Option<&Question> {
        let len = self.questions.len();
        if n == 0 || n > len {
            return None;
        }
        self.questions.get(len - n)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.nth_question(1)
    }

    /// 当前问题之前那一轮的回复（去标点后非空才返回），作为 that 上下文
    pub fn that_response(&self) -> Option<String> {
        let response = self.nth_question(2)?.response.as_deref()?;
        let stripped = strip_all_punctuation(response);
        let stripped = stripped.trim();
        (!stripped.is_empty()).then(|| stripped.to_string())
    }

    pub fn predicate(&self, name: &str) -> Option<&str> {
        self.predicates.get(name).map(String::as_str)
    }

    pub fn set_predicate(&mut self, name: &str, value: impl Into<String>) {
        self.predicates.insert(name.to_string(), value.into());
    }

    /// topic 谓词；未设置或为空时返回 None
    pub fn topic(&self) -> Option<&str> {
        self.predicate(TOPIC_PREDICATE).filter(|t| !t.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    fn prune(&mut self) {
        if self.questions.len() > self.max_histories {
            let excess = self.questions.len() - self.max_histories;
            self.questions.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_that_comes_from_previous_exchange() {
        let mut c = Conversation::new("console", 10);
        c.record_question("hello");
        assert_eq!(c.that_response(), None);
        c.attach_response("Hi there! How are you?");
        c.record_question("fine");
        assert_eq!(c.that_response(), Some("Hi there How are you".to_string()));
        assert_eq!(c.current_question().map(|q| q.sentence.as_str()), Some("fine"));
    }

    #[test]
    fn test_empty_previous_response_gives_no_that() {
        let mut c = Conversation::new("console", 10);
        c.record_question("hello");
        c.attach_response(" ... ");
        c.record_question("again");
        assert_eq!(c.that_response(), None);
    }

    #[test]
    fn test_prune_keeps_most_recent() {
        let mut c = Conversation::new("console", 3);
        for i in 0..5 {
            c.record_question(format!("q{}", i));
        }
        assert_eq!(c.len(), 3);
        assert_eq!(c.nth_question(3).map(|q| q.sentence.as_str()), Some("q2"));
        assert!(c.nth_question(4).is_none());
        assert!(c.nth_question(0).is_none());
    }

    #[test]
    fn test_topic_predicate() {
        let mut c = Conversation::new("console", 10);
        assert_eq!(c.topic(), None);
        c.set_predicate(TOPIC_PREDICATE, "  ");
        assert_eq!(c.topic(), None);
        c.set_predicate(TOPIC_PREDICATE, "sports");
        assert_eq!(c.topic(), Some("sports"));
    }
}
