//! 默认处理器：未注册标签的兜底，只记录日志

use async_trait::async_trait;

use crate::oob::command::OobElement;
use crate::oob::registry::OobHandler;

#[derive(Debug, Default)]
pub struct DefaultHandler {
    tag: String,
}

#[async_trait]
impl OobHandler for DefaultHandler {
    fn name(&self) -> &str {
        "default"
    }

    fn parse(&mut self, element: &OobElement) -> bool {
        self.tag = element.name.clone();
        true
    }

    async fn execute(&self, client_id: &str) -> String {
        tracing::info!("Default OOB handler: client [{}] sent <{}>", client_id, self.tag);
        String::new()
    }
}
