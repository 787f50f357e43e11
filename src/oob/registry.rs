//! 带外命令处理器注册表
//!
//! 所有处理器实现 OobHandler trait（parse / execute 两阶段），由 HandlerRegistry 按标签注册工厂；
//! 每次分发新建一个处理器实例，parse 成功后才会 execute。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::error::{BrainError, Result};
use crate::oob::command::{OobCommand, OobElement};
use crate::oob::{AlarmHandler, DefaultHandler, DialHandler, DialogHandler, EmailHandler};

/// 处理器 trait：parse 校验并提取字段（缺字段返回 false），execute 执行副作用并返回补充文本
#[async_trait]
pub trait OobHandler: Send + Sync {
    fn name(&self) -> &str;

    fn parse(&mut self, element: &OobElement) -> bool;

    async fn execute(&self, client_id: &str) -> String;
}

/// 处理器工厂：每次分发产生一个新实例
pub type HandlerFactory = Arc<dyn Fn() -> Box<dyn OobHandler> + Send + Sync>;

/// 处理器注册表：标签名 -> 工厂，外加可选的默认处理器
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, HandlerFactory>,
    default: Option<HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H: OobHandler + Default + 'static>(&mut self, tag: &str) {
        self.register_factory(tag, factory_of::<H>());
    }

    pub fn register_factory(&mut self, tag: &str, factory: HandlerFactory) {
        self.handlers.insert(tag.to_string(), factory);
    }

    pub fn set_default(&mut self, factory: HandlerFactory) {
        self.default = Some(factory);
    }

    pub fn has(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn tags(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// 只分发第一个子元素：已注册标签走对应处理器，否则走默认处理器；都没有或 parse 失败时返回空串
    pub async fn dispatch(&self, client_id: &str, command: &OobCommand) -> String {
        let Some(element) = command.first() else {
            tracing::debug!("OOB command has no child element");
            return String::new();
        };
        let factory = match self.handlers.get(&element.name).or(self.default.as_ref()) {
            Some(f) => f,
            None => {
                tracing::warn!("No OOB handler for [{}] and no default", element.name);
                return String::new();
            }
        };

        let mut handler = factory();
        if !handler.parse(element) {
            tracing::warn!("OOB handler [{}] failed to parse <{}>", handler.name(), element.name);
            return String::new();
        }
        tracing::debug!("Dispatching <{}> to [{}]", element.name, handler.name());
        handler.execute(client_id).await
    }
}

/// 以 Default 构造处理器的工厂
pub fn factory_of<H: OobHandler + Default + 'static>() -> HandlerFactory {
    Arc::new(|| Box::new(H::default()) as Box<dyn OobHandler>)
}

/// 按配置 kind 查静态表得到工厂
pub fn handler_factory(kind: &str) -> Result<HandlerFactory> {
    match kind {
        "default" => Ok(factory_of::<DefaultHandler>()),
        "dial" => Ok(factory_of::<DialHandler>()),
        "email" => Ok(factory_of::<EmailHandler>()),
        "alarm" => Ok(factory_of::<AlarmHandler>()),
        "dialog" => Ok(factory_of::<DialogHandler>()),
        other => Err(BrainError::CollaboratorMisconfigured(format!(
            "Unknown OOB handler kind [{}]",
            other
        ))),
    }
}
