//! 对话框：`<dialog><title>Which contact?</title><list>…</list></dialog>`

use async_trait::async_trait;

use crate::oob::command::OobElement;
use crate::oob::registry::OobHandler;

#[derive(Debug, Default)]
pub struct DialogHandler {
    title: String,
    list: String,
}

#[async_trait]
impl OobHandler for DialogHandler {
    fn name(&self) -> &str {
        "dialog"
    }

    fn parse(&mut self, element: &OobElement) -> bool {
        match (element.child_text("title"), element.child_text("list")) {
            (Some(title), Some(list)) => {
                self.title = title.to_string();
                self.list = list.to_string();
                true
            }
            _ => {
                tracing::error!("Invalid dialog oob command, title and list required");
                false
            }
        }
    }

    async fn execute(&self, client_id: &str) -> String {
        tracing::info!(client = %client_id, "Dialog [{}] options [{}]", self.title, self.list);
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, text: &str) -> OobElement {
        OobElement {
            text: Some(text.to_string()),
            ..OobElement::new(name)
        }
    }

    #[tokio::test]
    async fn test_dialog() {
        let mut handler = DialogHandler::default();
        let mut element = OobElement::new("dialog");
        element.children.push(field("title", "Which contact?"));
        assert!(!handler.parse(&element));

        element.children.push(field("list", "Alice Bob"));
        assert!(handler.parse(&element));
        assert_eq!(handler.title, "Which contact?");
        assert_eq!(handler.list, "Alice Bob");
        assert_eq!(handler.execute("console").await, "");
    }
}
