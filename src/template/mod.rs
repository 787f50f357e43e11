//! 模板层：规则命中后求值得到回复文本
//!
//! 模板是一棵多态 AST（TemplateNode），唯一的操作是 resolve -> 文本。
//! 求值所需的一切（匹配路径、会话、查表、授权、外部服务）都经由 EvalContext 传入。

pub mod nodes;
pub mod parser;

use serde::{Deserialize, Serialize};

use crate::lexicon::Lexicon;
use crate::memory::Conversation;
use crate::pattern::{encode, MatchContext, MatchPath, PatternGraph, Segment};
use crate::security::Authorisor;
use crate::services::ServiceRegistry;

pub use nodes::TemplateNode;
pub use parser::parse_template;

/// 规则终止节点上挂的模板
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub children: Vec<TemplateNode>,
}

impl Template {
    pub fn new(children: Vec<TemplateNode>) -> Self {
        Self { children }
    }

    /// 纯文本模板
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            children: vec![TemplateNode::Word(s.into())],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// 求值并拼接所有子节点（不做空白规整，由调用方处理）
    pub fn resolve(&self, ctx: &mut EvalContext<'_>) -> String {
        nodes::resolve_all(&self.children, ctx)
    }
}

/// 模板求值上下文
pub struct EvalContext<'a> {
    pub client_id: &'a str,
    pub graph: &'a PatternGraph,
    pub lexicon: &'a dyn Lexicon,
    /// 未配置授权服务时为 None，此时 authorise 节点一律放行
    pub authorisor: Option<&'a dyn Authorisor>,
    pub services: &'a ServiceRegistry,
    pub conversation: &'a mut Conversation,
    pub matched: &'a MatchPath,
    pub max_search_depth: usize,
    pub max_srai_depth: usize,
    pub srai_depth: usize,
    /// 求值过程中是否有 authorise 节点被拒绝
    pub denied: bool,
}

impl EvalContext<'_> {
    /// 当前匹配路径上某段的第 index 个捕获
    pub fn star(&self, segment: Segment, index: usize) -> String {
        self.matched
            .star(self.graph, segment, index)
            .unwrap_or_default()
    }

    /// 授权判断；拒绝时记录 denied 标记
    pub fn authorise(&mut self, role: &str) -> bool {
        let allowed = self
            .authorisor
            .map_or(true, |a| a.authorise(self.client_id, role));
        if !allowed {
            tracing::info!("Client [{}] denied role [{}]", self.client_id, role);
            self.denied = true;
        }
        allowed
    }

    /// 以当前 topic / that 递归匹配一句话并求值（`<srai>`）
    pub fn srai(&mut self, sentence: &str) -> String {
        if self.srai_depth >= self.max_srai_depth {
            tracing::warn!("Max srai depth [{}] exceeded", self.max_srai_depth);
            return String::new();
        }
        let topic = self.conversation.topic().map(str::to_string);
        let that = self.conversation.that_response();
        let tokens = encode(sentence, topic.as_deref(), that.as_deref());

        let graph = self.graph;
        let mut match_ctx = MatchContext::new(self.max_search_depth);
        let Some(path) = graph.match_tokens(&tokens, self.lexicon, &mut match_ctx) else {
            tracing::debug!("No srai match for [{}]", sentence);
            return String::new();
        };
        let Some(template) = graph.template(path.terminal()) else {
            return String::new();
        };

        let mut child = EvalContext {
            client_id: self.client_id,
            graph,
            lexicon: self.lexicon,
            authorisor: self.authorisor,
            services: self.services,
            conversation: &mut *self.conversation,
            matched: &path,
            max_search_depth: self.max_search_depth,
            max_srai_depth: self.max_srai_depth,
            srai_depth: self.srai_depth + 1,
            denied: false,
        };
        let text = template.resolve(&mut child);
        self.denied |= child.denied;
        collapse_whitespace(&text)
    }
}

/// 合并连续空白并去掉首尾空白
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
