//! 闹钟：`<alarm><hour>11</hour><minute>30</minute></alarm>` 或 `<alarm><message>…</message></alarm>`

use async_trait::async_trait;

use crate::oob::command::OobElement;
use crate::oob::registry::OobHandler;

#[derive(Debug, Default)]
pub struct AlarmHandler {
    hour: Option<String>,
    minute: Option<String>,
    message: Option<String>,
}

#[async_trait]
impl OobHandler for AlarmHandler {
    fn name(&self) -> &str {
        "alarm"
    }

    fn parse(&mut self, element: &OobElement) -> bool {
        for child in &element.children {
            let text = child.text.clone();
            match child.name.as_str() {
                "hour" => self.hour = text,
                "minute" | "min" => self.minute = text,
                "message" => self.message = text,
                other => tracing::error!("Unknown child element [{}] in alarm oob", other),
            }
        }
        if self.message.is_some() || (self.hour.is_some() && self.minute.is_some()) {
            return true;
        }
        tracing::error!("Invalid alarm oob command, either hour and minute or message required");
        false
    }

    async fn execute(&self, client_id: &str) -> String {
        match (&self.message, &self.hour, &self.minute) {
            (Some(message), _, _) => {
                tracing::info!(client = %client_id, "Showing alarm [{}]", message)
            }
            (None, Some(hour), Some(minute)) => {
                tracing::info!(client = %client_id, "Setting alarm for {}:{}", hour, minute)
            }
            _ => {}
        }
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alarm(children: &[(&str, &str)]) -> OobElement {
        let mut element = OobElement::new("alarm");
        for (name, text) in children {
            let mut child = OobElement::new(*name);
            child.text = Some(text.to_string());
            element.children.push(child);
        }
        element
    }

    #[test]
    fn test_alarm_variants() {
        assert!(AlarmHandler::default().parse(&alarm(&[("hour", "11"), ("minute", "30")])));
        assert!(AlarmHandler::default().parse(&alarm(&[("message", "Wake up")])));
        assert!(!AlarmHandler::default().parse(&alarm(&[("hour", "11")])));
        assert!(!AlarmHandler::default().parse(&alarm(&[])));
    }
}
