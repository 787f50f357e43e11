//! 外部服务（`<sraix>` 调用）
//!
//! 引擎把外部服务视为不透明的「字符串进、字符串出」调用，不施加重试/超时策略；
//! ServiceRegistry 按名注册与查找，配置中的 kind 通过静态表构造。

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::error::{BrainError, Result};

/// 外部服务 trait
pub trait Service: Send + Sync {
    fn ask(&self, client_id: &str, question: &str) -> std::result::Result<String, String>;
}

/// Echo 服务：原样返回问题（测试用）
#[derive(Debug, Default)]
pub struct EchoService;

impl Service for EchoService {
    fn ask(&self, _client_id: &str, question: &str) -> std::result::Result<String, String> {
        Ok(question.to_string())
    }
}

/// 服务注册表：按名称存储 Arc<dyn Service>
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<dyn Service>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, service: Arc<dyn Service>) {
        self.services.insert(name.to_lowercase(), service);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.services.get(&name.to_lowercase()).cloned()
    }

    pub fn ask(&self, name: &str, client_id: &str, question: &str) -> std::result::Result<String, String> {
        let service = self
            .get(name)
            .ok_or_else(|| format!("Unknown service: {name}"))?;
        service.ask(client_id, question)
    }

    pub fn names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// 按配置 kind 构造服务
pub fn service_from_kind(kind: &str) -> Result<Arc<dyn Service>> {
    match kind {
        "echo" => Ok(Arc::new(EchoService)),
        other => Err(BrainError::CollaboratorMisconfigured(format!(
            "Unknown service kind [{}]",
            other
        ))),
    }
}
