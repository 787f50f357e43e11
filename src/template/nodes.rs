//! 模板节点变体与求值

use std::fmt::Write as _;

use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

use crate::memory::conversation::TOPIC_PREDICATE;
use crate::pattern::Segment;
use crate::template::{collapse_whitespace, EvalContext};

/// 查不到谓词 / 映射 / 属性时的输出
pub const DEFAULT_UNKNOWN: &str = "unknown";

/// `<date>` 未指定 format 时的格式
pub const DEFAULT_DATE_FORMAT: &str = "%c";

/// 模板节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateNode {
    /// 原样输出的文本
    Word(String),
    /// `<star index="n"/>`，输入段第 n 个捕获
    Star(usize),
    TopicStar(usize),
    ThatStar(usize),
    /// 读取客户端谓词
    Get { name: String },
    /// 写入客户端谓词并输出写入的值
    Set { name: String, children: Vec<TemplateNode> },
    /// 求值但不输出
    Think(Vec<TemplateNode>),
    Bot { name: String },
    Map { name: String, children: Vec<TemplateNode> },
    Srai(Vec<TemplateNode>),
    Sraix { service: String, children: Vec<TemplateNode> },
    Date { format: Option<String> },
    Uppercase(Vec<TemplateNode>),
    Lowercase(Vec<TemplateNode>),
    /// 仅当客户端拥有 role 时输出子节点
    Authorise { role: String, children: Vec<TemplateNode> },
    /// 未识别的元素，原样重新输出（`<oob>` 块即由此保留到求值结果中）
    Element {
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<TemplateNode>,
    },
}

impl TemplateNode {
    pub fn resolve(&self, ctx: &mut EvalContext<'_>) -> String {
        match self {
            Self::Word(text) => text.clone(),
            Self::Star(index) => ctx.star(Segment::Input, *index),
            Self::TopicStar(index) => ctx.star(Segment::Topic, *index),
            Self::ThatStar(index) => ctx.star(Segment::That, *index),
            Self::Get { name } => ctx
                .conversation
                .predicate(name)
                .map(str::to_string)
                .unwrap_or_else(|| DEFAULT_UNKNOWN.to_string()),
            Self::Set { name, children } => {
                let value = collapse_whitespace(&resolve_all(children, ctx));
                if name == TOPIC_PREDICATE {
                    tracing::debug!("Client [{}] topic set to [{}]", ctx.client_id, value);
                }
                ctx.conversation.set_predicate(name, value.clone());
                value
            }
            Self::Think(children) => {
                resolve_all(children, ctx);
                String::new()
            }
            Self::Bot { name } => ctx
                .lexicon
                .bot_property(name)
                .unwrap_or_else(|| DEFAULT_UNKNOWN.to_string()),
            Self::Map { name, children } => {
                let key = collapse_whitespace(&resolve_all(children, ctx));
                ctx.lexicon
                    .lookup(name, &key)
                    .unwrap_or_else(|| DEFAULT_UNKNOWN.to_string())
            }
            Self::Srai(children) => {
                let sentence = collapse_whitespace(&resolve_all(children, ctx));
                ctx.srai(&sentence)
            }
            Self::Sraix { service, children } => {
                let question = collapse_whitespace(&resolve_all(children, ctx));
                match ctx.services.ask(service, ctx.client_id, &question) {
                    Ok(answer) => answer,
                    Err(e) => {
                        tracing::warn!("Service [{}] failed: {}", service, e);
                        String::new()
                    }
                }
            }
            Self::Date { format } => {
                let format = format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
                let mut out = String::new();
                if write!(out, "{}", chrono::Local::now().format(format)).is_err() {
                    tracing::warn!("Invalid date format [{}]", format);
                    out.clear();
                }
                out
            }
            Self::Uppercase(children) => resolve_all(children, ctx).to_uppercase(),
            Self::Lowercase(children) => resolve_all(children, ctx).to_lowercase(),
            Self::Authorise { role, children } => {
                if ctx.authorise(role) {
                    resolve_all(children, ctx)
                } else {
                    String::new()
                }
            }
            Self::Element {
                name,
                attributes,
                children,
            } => {
                let mut out = format!("<{}", name);
                for (key, value) in attributes {
                    let _ = write!(out, " {}=\"{}\"", key, escape(value.as_str()));
                }
                if children.is_empty() {
                    out.push_str("/>");
                    return out;
                }
                out.push('>');
                for child in children {
                    out.push_str(&child.resolve_markup(ctx));
                }
                let _ = write!(out, "</{}>", name);
                out
            }
        }
    }
}

impl TemplateNode {
    /// 作为元素内容求值：嵌套元素输出标记，其余求值结果按 XML 转义
    fn resolve_markup(&self, ctx: &mut EvalContext<'_>) -> String {
        match self {
            Self::Element { .. } => self.resolve(ctx),
            Self::Authorise { role, children } => {
                if ctx.authorise(role) {
                    children.iter().map(|c| c.resolve_markup(ctx)).collect()
                } else {
                    String::new()
                }
            }
            Self::Think(children) => {
                resolve_all(children, ctx);
                String::new()
            }
            other => escape(other.resolve(ctx).as_str()).into_owned(),
        }
    }
}

/// 依次求值并拼接
pub fn resolve_all(children: &[TemplateNode], ctx: &mut EvalContext<'_>) -> String {
    children.iter().map(|c| c.resolve(ctx)).collect()
}
