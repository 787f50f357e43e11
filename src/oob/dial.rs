//! 拨号：`<oob><dial>07777777777</dial></oob>`

use async_trait::async_trait;

use crate::oob::command::OobElement;
use crate::oob::registry::OobHandler;

#[derive(Debug, Default)]
pub struct DialHandler {
    number: Option<String>,
}

impl DialHandler {
    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }
}

#[async_trait]
impl OobHandler for DialHandler {
    fn name(&self) -> &str {
        "dial"
    }

    fn parse(&mut self, element: &OobElement) -> bool {
        match element.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(number) => {
                self.number = Some(number.to_string());
                true
            }
            None => {
                tracing::error!("Invalid dial oob command, missing number");
                false
            }
        }
    }

    async fn execute(&self, client_id: &str) -> String {
        tracing::info!(client = %client_id, "Dialing [{}]", self.number.as_deref().unwrap_or_default());
        String::new()
    }
}
