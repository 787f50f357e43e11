//! 模式图：规则插入与按等价合并
//!
//! 节点存放在 arena（`Vec<PatternNode>`）中，以下标互相引用；0 号节点恒为 ROOT。
//! 插入时沿路径逐个 token 下行，已有等价子节点则复用，否则新建，图始终是一棵 trie。

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::core::error::{BrainError, Result};
use crate::pattern::encoder::DEFAULT_WILDCARD;
use crate::pattern::nodes::{NodeId, NodeKind, PatternNode};
use crate::template::Template;

/// 模式图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternGraph {
    nodes: Vec<PatternNode>,
    rules: usize,
}

impl Default for PatternGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternGraph {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![PatternNode::new(NodeKind::Root, None)],
            rules: 0,
        }
    }

    pub fn node(&self, id: NodeId) -> &PatternNode {
        &self.nodes[id]
    }

    pub fn template(&self, id: NodeId) -> Option<&Template> {
        self.nodes.get(id).and_then(|n| n.template.as_ref())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// 不同路径的规则数（重复插入同一路径不计数）
    pub fn rule_count(&self) -> usize {
        self.rules
    }

    /// 插入一条规则：pattern / topic / that 为空白分隔的模式文本，topic、that 为空时取 `*`
    pub fn insert(&mut self, pattern: &str, topic: &str, that: &str, template: Template) -> Result<NodeId> {
        let mut path = parse_segment(pattern);
        if path.is_empty() {
            return Err(BrainError::StructuralViolation(format!(
                "Pattern [{}] has no matchable tokens",
                pattern
            )));
        }
        path.push(NodeKind::Topic);
        path.extend(parse_context_segment(topic));
        path.push(NodeKind::That);
        path.extend(parse_context_segment(that));
        self.insert_path(&path, template)
    }

    /// 按节点路径插入；重复路径以最后一次插入的模板为准
    pub fn insert_path(&mut self, path: &[NodeKind], template: Template) -> Result<NodeId> {
        if path.is_empty() {
            return Err(BrainError::StructuralViolation("Empty rule path".to_string()));
        }
        // 先校验整条路径，避免中途失败留下半截分支
        let mut parent_kind = NodeKind::Root;
        for kind in path {
            PatternNode::new(parent_kind.clone(), None).can_add(kind)?;
            parent_kind = kind.clone();
        }

        let mut current = Self::ROOT;
        for kind in path {
            current = self.add_child(current, kind.clone())?;
        }

        let node = &mut self.nodes[current];
        if node.template.replace(template).is_some() {
            tracing::debug!("Duplicate rule path, template replaced at node {}", current);
        } else {
            self.rules += 1;
        }
        Ok(current)
    }

    /// 在 parent 下查找等价子节点，不存在则按特异度插入新节点
    fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId> {
        if let Some(existing) = self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].kind.equivalent(&kind))
        {
            return Ok(existing);
        }
        self.nodes[parent].can_add(&kind)?;

        let id = self.nodes.len();
        let rank = kind.specificity();
        self.nodes.push(PatternNode::new(kind, Some(parent)));

        let children = &self.nodes[parent].children;
        let at = children
            .iter()
            .position(|&c| self.nodes[c].kind.specificity() > rank)
            .unwrap_or(children.len());
        self.nodes[parent].children.insert(at, id);
        Ok(id)
    }

    /// 从终止节点回溯到 ROOT 的节点路径（不含 ROOT）
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            if c == Self::ROOT {
                break;
            }
            path.push(c);
            current = self.nodes.get(c).and_then(|n| n.parent);
        }
        path.reverse();
        path
    }

    /// 校验 arena 完整性（用于快照加载）
    pub fn validate(&self) -> Result<()> {
        let root = self
            .nodes
            .first()
            .ok_or_else(|| BrainError::SnapshotCorrupt("Graph has no nodes".to_string()))?;
        if root.kind != NodeKind::Root || root.parent.is_some() {
            return Err(BrainError::SnapshotCorrupt("Node 0 is not the root".to_string()));
        }
        for (id, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                let linked = child != Self::ROOT
                    && self.nodes.get(child).is_some_and(|c| c.parent == Some(id));
                if !linked {
                    return Err(BrainError::SnapshotCorrupt(format!(
                        "Node {} has a dangling child reference {}",
                        id, child
                    )));
                }
            }
        }
        for (id, node) in self.nodes.iter().enumerate().skip(1) {
            if node.kind == NodeKind::Root {
                return Err(BrainError::SnapshotCorrupt(format!("Extra root at node {}", id)));
            }
            match node.parent {
                Some(p) if p < self.nodes.len() && self.nodes[p].children.contains(&id) => {}
                _ => {
                    return Err(BrainError::SnapshotCorrupt(format!(
                        "Node {} has a dangling parent reference",
                        id
                    )))
                }
            }
        }
        let terminals = self.nodes.iter().filter(|n| n.is_terminal()).count();
        if terminals != self.rules {
            return Err(BrainError::SnapshotCorrupt(format!(
                "Rule count {} does not match {} terminal nodes",
                self.rules, terminals
            )));
        }
        Ok(())
    }

    /// 以缩进文本输出整棵树，用于调试
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(Self::ROOT, 0, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = &self.nodes[id];
        let marker = if node.is_terminal() { " => TEMPLATE" } else { "" };
        let _ = writeln!(out, "{}{}{}", "  ".repeat(depth), node.kind.label(), marker);
        for &child in &node.children {
            self.dump_node(child, depth + 1, out);
        }
    }
}

fn parse_segment(text: &str) -> Vec<NodeKind> {
    text.split_whitespace().filter_map(NodeKind::from_token).collect()
}

fn parse_context_segment(text: &str) -> Vec<NodeKind> {
    let kinds = parse_segment(text);
    if kinds.is_empty() {
        parse_segment(DEFAULT_WILDCARD)
    } else {
        kinds
    }
}
