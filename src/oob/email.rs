//! 发邮件：`<oob><email><to/><subject/><body/></email></oob>`，三个字段都必填

use async_trait::async_trait;

use crate::oob::command::OobElement;
use crate::oob::registry::OobHandler;

#[derive(Debug, Default)]
pub struct EmailHandler {
    to: String,
    subject: String,
    body: String,
}

#[async_trait]
impl OobHandler for EmailHandler {
    fn name(&self) -> &str {
        "email"
    }

    fn parse(&mut self, element: &OobElement) -> bool {
        let (Some(to), Some(subject), Some(body)) = (
            element.child_text("to"),
            element.child_text("subject"),
            element.child_text("body"),
        ) else {
            tracing::error!("Invalid email oob command, to, subject and body are required");
            return false;
        };
        self.to = to.to_string();
        self.subject = subject.to_string();
        self.body = body.to_string();
        true
    }

    async fn execute(&self, client_id: &str) -> String {
        tracing::info!(
            client = %client_id,
            "Emailing [{}] subject [{}] ({} chars)",
            self.to,
            self.subject,
            self.body.len()
        );
        String::new()
    }
}
