//! 模板解析：XML 片段文本 -> TemplateNode 树
//!
//! 文本先包进 `<template>` 根元素，再用 quick-xml 的事件流逐个构建节点；
//! 已知标签映射到对应变体，其余标签保留为 Element 原样输出。

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::core::error::{BrainError, Result};
use crate::template::{Template, TemplateNode};

const ROOT_TAG: &str = "template";

/// 正在构建中的元素
struct Frame {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<TemplateNode>,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| BrainError::TemplateParse(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| BrainError::TemplateParse(e.to_string()))?
                .to_string();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.attribute(key).map(str::to_string).ok_or_else(|| {
            BrainError::TemplateParse(format!("<{}> requires attribute [{}]", self.name, key))
        })
    }

    fn index(&self) -> Result<usize> {
        match self.attribute("index") {
            None => Ok(1),
            Some(v) => v
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|i| *i > 0)
                .ok_or_else(|| BrainError::TemplateParse(format!("Invalid index [{}]", v))),
        }
    }

    fn into_node(self) -> Result<TemplateNode> {
        let node = match self.name.as_str() {
            "star" => TemplateNode::Star(self.index()?),
            "topicstar" => TemplateNode::TopicStar(self.index()?),
            "thatstar" => TemplateNode::ThatStar(self.index()?),
            "get" => TemplateNode::Get {
                name: self.required("name")?,
            },
            "set" => TemplateNode::Set {
                name: self.required("name")?,
                children: self.children,
            },
            "think" => TemplateNode::Think(self.children),
            "bot" => TemplateNode::Bot {
                name: self.required("name")?,
            },
            "map" => TemplateNode::Map {
                name: self.required("name")?,
                children: self.children,
            },
            "srai" => TemplateNode::Srai(self.children),
            "sraix" => TemplateNode::Sraix {
                service: self.required("service")?,
                children: self.children,
            },
            "date" => TemplateNode::Date {
                format: self.attribute("format").map(str::to_string),
            },
            "uppercase" => TemplateNode::Uppercase(self.children),
            "lowercase" => TemplateNode::Lowercase(self.children),
            "authorise" => TemplateNode::Authorise {
                role: self.required("role")?,
                children: self.children,
            },
            _ => TemplateNode::Element {
                name: self.name,
                attributes: self.attributes,
                children: self.children,
            },
        };
        Ok(node)
    }
}

/// 解析模板文本
pub fn parse_template(text: &str) -> Result<Template> {
    let wrapped = format!("<{ROOT_TAG}>{text}</{ROOT_TAG}>");
    let mut reader = Reader::from_str(&wrapped);
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| BrainError::TemplateParse(format!("{} in [{}]", e, text)))?;
        match event {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let node = Frame::open(&start)?.into_node()?;
                push_child(&mut stack, node)?;
            }
            Event::Text(t) => {
                let s = t
                    .unescape()
                    .map_err(|e| BrainError::TemplateParse(e.to_string()))?;
                if !s.is_empty() {
                    push_child(&mut stack, TemplateNode::Word(s.to_string()))?;
                }
            }
            Event::CData(c) => {
                let s = String::from_utf8_lossy(&c).to_string();
                push_child(&mut stack, TemplateNode::Word(s))?;
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| BrainError::TemplateParse("Unbalanced end tag".to_string()))?;
                if stack.is_empty() {
                    return Ok(Template::new(frame.children));
                }
                let node = frame.into_node()?;
                push_child(&mut stack, node)?;
            }
            Event::Eof => {
                return Err(BrainError::TemplateParse(format!(
                    "Unexpected end of template [{}]",
                    text
                )))
            }
            _ => {}
        }
    }
}

fn push_child(stack: &mut [Frame], node: TemplateNode) -> Result<()> {
    let parent = stack
        .last_mut()
        .ok_or_else(|| BrainError::TemplateParse("Content outside template".to_string()))?;
    parent.children.push(node);
    Ok(())
}
