//! 模式节点
//!
//! 模式图中的每个节点是一个带类型的变体（ROOT / 词 / 通配符 / 集合 / 机器人属性 / TOPIC / THAT / 优先词），
//! 节点之间以 arena 下标相连：子节点列表保持插入顺序，父节点为非拥有的回指。

use serde::{Deserialize, Serialize};

use crate::core::error::{BrainError, Result};
use crate::pattern::encoder::{strip_all_punctuation, THAT_SENTINEL, TOPIC_SENTINEL};
use crate::template::Template;

/// arena 中的节点下标
pub type NodeId = usize;

/// 通配符种类：`_` 恰好匹配一个词，`*` 匹配一个或多个词
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WildcardKind {
    Short,
    Long,
}

/// 节点变体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Root,
    Word(String),
    Wildcard(WildcardKind),
    /// 引用外部词汇集合，输入词属于该集合即匹配
    SetRef(String),
    /// 与机器人属性值相等即匹配
    BotProperty(String),
    Topic,
    That,
    /// `$WORD`：按字面匹配，但先于所有兄弟节点尝试
    Priority(String),
}

impl NodeKind {
    /// 将规则模式中的单个 token 解析为节点变体；纯标点的词返回 None
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        match token {
            "" => None,
            "*" => Some(Self::Wildcard(WildcardKind::Long)),
            "_" => Some(Self::Wildcard(WildcardKind::Short)),
            TOPIC_SENTINEL => Some(Self::Topic),
            THAT_SENTINEL => Some(Self::That),
            _ => {
                if let Some(name) = tag_content(token, "set") {
                    return Some(Self::SetRef(name.to_lowercase()));
                }
                if let Some(name) = tag_content(token, "bot") {
                    return Some(Self::BotProperty(name.to_lowercase()));
                }
                if let Some(word) = token.strip_prefix('$') {
                    let word = strip_all_punctuation(word).to_uppercase();
                    return (!word.is_empty()).then_some(Self::Priority(word));
                }
                let word = strip_all_punctuation(token).to_uppercase();
                (!word.is_empty()).then_some(Self::Word(word))
            }
        }
    }

    /// 结构等价：变体相同，且 Word / SetRef / BotProperty / Priority 的字面也相同
    ///
    /// `_` 与 `*` 匹配长度不同，作为不同节点；`$A` 与 `$B` 匹配的词不同，也不合并。
    pub fn equivalent(&self, other: &NodeKind) -> bool {
        match (self, other) {
            (Self::Root, Self::Root) | (Self::Topic, Self::Topic) | (Self::That, Self::That) => true,
            (Self::Wildcard(a), Self::Wildcard(b)) => a == b,
            (Self::Word(a), Self::Word(b))
            | (Self::SetRef(a), Self::SetRef(b))
            | (Self::BotProperty(a), Self::BotProperty(b))
            | (Self::Priority(a), Self::Priority(b)) => a == b,
            _ => false,
        }
    }

    /// 兄弟节点的尝试顺序：数值越小越先尝试
    pub fn specificity(&self) -> u8 {
        match self {
            Self::Priority(_) => 0,
            Self::Root | Self::Word(_) | Self::BotProperty(_) | Self::Topic | Self::That => 1,
            Self::SetRef(_) => 2,
            Self::Wildcard(WildcardKind::Short) => 3,
            Self::Wildcard(WildcardKind::Long) => 4,
        }
    }

    /// 是否会记录被消费的输入（用于 `<star/>` 取值）
    pub fn captures(&self) -> bool {
        matches!(self, Self::Wildcard(_) | Self::SetRef(_))
    }

    pub fn label(&self) -> String {
        match self {
            Self::Root => "ROOT".to_string(),
            Self::Word(w) => format!("WORD [{}]", w),
            Self::Wildcard(WildcardKind::Short) => "WILDCARD [_]".to_string(),
            Self::Wildcard(WildcardKind::Long) => "WILDCARD [*]".to_string(),
            Self::SetRef(name) => format!("SET [{}]", name),
            Self::BotProperty(name) => format!("BOT [{}]", name),
            Self::Topic => "TOPIC".to_string(),
            Self::That => "THAT".to_string(),
            Self::Priority(w) => format!("PRIORITY [{}]", w),
        }
    }
}

/// `<set>name</set>` 形式的 token 取出 name
fn tag_content<'a>(token: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let name = token.strip_prefix(open.as_str())?.strip_suffix(close.as_str())?.trim();
    (!name.is_empty()).then_some(name)
}

/// 模式图节点：变体、父节点、按特异度排列的子节点，以及终止节点上的模板
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub template: Option<Template>,
}

impl PatternNode {
    pub fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            template: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.template.is_some()
    }

    /// 检查 child 能否作为本节点的直接子节点
    pub fn can_add(&self, child: &NodeKind) -> Result<()> {
        let parent = self.kind.label();
        if matches!(child, NodeKind::Root) {
            return Err(BrainError::StructuralViolation(format!(
                "Cannot add root node to {} node",
                parent
            )));
        }
        if matches!(self.kind, NodeKind::Topic | NodeKind::That) {
            match child {
                NodeKind::Topic => {
                    return Err(BrainError::StructuralViolation(format!(
                        "Cannot add topic node to {} node",
                        parent
                    )))
                }
                NodeKind::That => {
                    return Err(BrainError::StructuralViolation(format!(
                        "Cannot add that node to {} node",
                        parent
                    )))
                }
                _ => {}
            }
        }
        Ok(())
    }
}
