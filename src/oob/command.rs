//! 带外命令的提取与解析
//!
//! 回复文本里最多嵌一个 `<oob>…</oob>` 块（标签大小写与空白不敏感）。
//! 提取后前后文本各自 trim、以单个空格拼接；块体解析为 OobCommand。

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::core::error::{BrainError, Result};

/// 命令块内的元素：标签名、文本、子元素
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OobElement {
    pub name: String,
    pub text: Option<String>,
    pub children: Vec<OobElement>,
}

impl OobElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn child(&self, name: &str) -> Option<&OobElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// 子元素文本（空白文本视为缺失）
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)?.text.as_deref()
    }
}

/// 解析后的命令块
#[derive(Debug, Clone, PartialEq)]
pub struct OobCommand {
    pub tag: String,
    pub children: Vec<OobElement>,
}

impl OobCommand {
    /// 分发只看第一个子元素
    pub fn first(&self) -> Option<&OobElement> {
        self.children.first()
    }
}

/// 从回复文本中拆出命令块
#[derive(Debug, Clone)]
pub struct OobExtractor {
    marker: String,
    block: Regex,
    body: Regex,
}

impl OobExtractor {
    pub fn new(marker: &str) -> Result<Self> {
        let m = regex::escape(marker);
        let build = |pattern: String| {
            Regex::new(&pattern).map_err(|e| BrainError::Config(format!("Invalid OOB marker: {}", e)))
        };
        Ok(Self {
            marker: marker.to_string(),
            block: build(format!(r"(?is)<\s*{m}\s*>.*?<\s*/\s*{m}\s*>"))?,
            body: build(format!(r"(?is)^<\s*{m}\s*>(.*)<\s*/\s*{m}\s*>$"))?,
        })
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// 拆分为（去掉命令块后的回复, 命令块原文）；没有命令块时原文即回复
    pub fn strip(&self, text: &str) -> (String, Option<String>) {
        let Some(m) = self.block.find(text) else {
            return (text.to_string(), None);
        };
        let front = text[..m.start()].trim();
        let back = text[m.end()..].trim();
        let reply = match (front.is_empty(), back.is_empty()) {
            (true, _) => back.to_string(),
            (false, true) => front.to_string(),
            (false, false) => format!("{} {}", front, back),
        };
        (reply, Some(m.as_str().to_string()))
    }

    /// 把命令块原文解析为 OobCommand
    pub fn parse(&self, block: &str) -> Result<OobCommand> {
        let body = self
            .body
            .captures(block.trim())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| BrainError::OobParse(format!("Not an OOB block: {}", block)))?;
        let root = parse_element(&format!("<{0}>{1}</{0}>", self.marker, body))?;
        Ok(OobCommand {
            tag: root.name,
            children: root.children,
        })
    }
}

/// 解析一段只含元素与文本的 XML
fn parse_element(xml: &str) -> Result<OobElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<OobElement> = Vec::new();
    let err = |e: &dyn std::fmt::Display| BrainError::OobParse(e.to_string());

    loop {
        match reader.read_event().map_err(|e| err(&e))? {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
                stack.push(OobElement::new(name));
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| BrainError::OobParse("Element outside block".to_string()))?;
                parent.children.push(OobElement::new(name));
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| err(&e))?;
                if let Some(current) = stack.last_mut() {
                    let joined = match current.text.take() {
                        Some(prev) => format!("{} {}", prev, text),
                        None => text.to_string(),
                    };
                    current.text = Some(joined);
                }
            }
            Event::CData(c) => {
                if let Some(current) = stack.last_mut() {
                    current.text = Some(String::from_utf8_lossy(&c).trim().to_string());
                }
            }
            Event::End(_) => {
                let done = stack
                    .pop()
                    .ok_or_else(|| BrainError::OobParse("Unbalanced end tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(done),
                    None => return Ok(done),
                }
            }
            Event::Eof => return Err(BrainError::OobParse("Unexpected end of block".to_string())),
            _ => {}
        }
    }
}
