//! 匹配算法（consume）
//!
//! 深度优先、带回溯的递归：每个节点先检查深度上限，再判断自身能否消费当前 token，
//! 成功后按特异度顺序尝试子节点。长通配符先取最长跨度，失败后逐步缩短。
//! 第一条到达终止节点且恰好耗尽 token 的路径胜出；没有路径时返回 None（NoMatch），
//! 深度超限只记录在 MatchContext 上，同样折叠为 None。

use crate::lexicon::Lexicon;
use crate::pattern::encoder::{is_sentinel, THAT_SENTINEL, TOPIC_SENTINEL};
use crate::pattern::graph::PatternGraph;
use crate::pattern::nodes::{NodeId, NodeKind, WildcardKind};

/// 单次匹配的状态：深度上限、到达过的最大深度、是否触发过深度超限
#[derive(Debug, Clone)]
pub struct MatchContext {
    pub max_search_depth: usize,
    deepest: usize,
    depth_exceeded: bool,
}

impl MatchContext {
    pub fn new(max_search_depth: usize) -> Self {
        Self {
            max_search_depth,
            deepest: 0,
            depth_exceeded: false,
        }
    }

    pub fn depth_exceeded(&self) -> bool {
        self.depth_exceeded
    }

    pub fn deepest(&self) -> usize {
        self.deepest
    }
}

/// 匹配序列中的三个段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Input,
    Topic,
    That,
}

/// 路径上的一步：经过的节点、所在段、消费的 token
#[derive(Debug, Clone)]
pub struct MatchStep {
    pub node: NodeId,
    pub segment: Segment,
    pub words: Vec<String>,
}

/// 成功匹配的路径，以携带模板的终止节点结尾
#[derive(Debug, Clone)]
pub struct MatchPath {
    steps: Vec<MatchStep>,
    terminal: NodeId,
}

impl MatchPath {
    pub fn steps(&self) -> &[MatchStep] {
        &self.steps
    }

    pub fn terminal(&self) -> NodeId {
        self.terminal
    }

    /// 取某段第 index 个（从 1 开始）通配符 / 集合捕获的文本
    pub fn star(&self, graph: &PatternGraph, segment: Segment, index: usize) -> Option<String> {
        self.steps
            .iter()
            .filter(|s| s.segment == segment && graph.node(s.node).kind.captures())
            .nth(index.checked_sub(1)?)
            .map(|s| s.words.join(" "))
    }
}

impl PatternGraph {
    /// 在编码后的 token 序列上执行匹配
    pub fn match_tokens(
        &self,
        words: &[String],
        lexicon: &dyn Lexicon,
        ctx: &mut MatchContext,
    ) -> Option<MatchPath> {
        let mut matcher = Matcher {
            graph: self,
            words,
            lexicon,
            ctx,
        };
        let mut steps = matcher.consume_children(PatternGraph::ROOT, 0, 0, Segment::Input)?;
        steps.reverse();
        let terminal = steps.last()?.node;
        Some(MatchPath { steps, terminal })
    }
}

struct Matcher<'a> {
    graph: &'a PatternGraph,
    words: &'a [String],
    lexicon: &'a dyn Lexicon,
    ctx: &'a mut MatchContext,
}

impl Matcher<'_> {
    /// 节点自身的消费；返回逆序（叶子在前）的步骤
    fn consume(&mut self, id: NodeId, pos: usize, depth: usize, segment: Segment) -> Option<Vec<MatchStep>> {
        if depth > self.ctx.max_search_depth {
            if !self.ctx.depth_exceeded {
                tracing::warn!("Max search depth [{}] exceeded", self.ctx.max_search_depth);
            }
            self.ctx.depth_exceeded = true;
            return None;
        }
        self.ctx.deepest = self.ctx.deepest.max(depth);

        let graph = self.graph;
        let node = graph.node(id);
        let word = self.words.get(pos).map(String::as_str);
        tracing::trace!("{}{} <- {:?}", "  ".repeat(depth), node.kind.label(), word);

        match &node.kind {
            NodeKind::Root => None,
            NodeKind::Word(literal) | NodeKind::Priority(literal) => {
                if word? != literal.as_str() {
                    return None;
                }
                self.advance(id, pos, 1, depth, segment)
            }
            NodeKind::BotProperty(name) => {
                let word = word?;
                let value = self.lexicon.bot_property(name)?;
                if !word.eq_ignore_ascii_case(value.trim()) {
                    return None;
                }
                self.advance(id, pos, 1, depth, segment)
            }
            NodeKind::SetRef(name) => {
                let word = word?;
                if is_sentinel(word) || !self.lexicon.contains(name, word) {
                    return None;
                }
                self.advance(id, pos, 1, depth, segment)
            }
            NodeKind::Topic => {
                if word? != TOPIC_SENTINEL {
                    return None;
                }
                self.enter_segment(id, pos, depth, Segment::Topic)
            }
            NodeKind::That => {
                if word? != THAT_SENTINEL {
                    return None;
                }
                self.enter_segment(id, pos, depth, Segment::That)
            }
            NodeKind::Wildcard(WildcardKind::Short) => {
                if is_sentinel(word?) {
                    return None;
                }
                self.advance(id, pos, 1, depth, segment)
            }
            NodeKind::Wildcard(WildcardKind::Long) => {
                let available = self.words[pos.min(self.words.len())..]
                    .iter()
                    .take_while(|w| !is_sentinel(w))
                    .count();
                (1..=available)
                    .rev()
                    .find_map(|len| self.advance(id, pos, len, depth, segment))
            }
        }
    }

    /// 消费 len 个 token 后进入子节点，成功则记录本步
    fn advance(&mut self, id: NodeId, pos: usize, len: usize, depth: usize, segment: Segment) -> Option<Vec<MatchStep>> {
        let mut steps = self.consume_children(id, pos + len, depth, segment)?;
        steps.push(MatchStep {
            node: id,
            segment,
            words: self.words[pos..pos + len].to_vec(),
        });
        Some(steps)
    }

    /// 越过哨兵，之后的节点归属新段
    fn enter_segment(&mut self, id: NodeId, pos: usize, depth: usize, segment: Segment) -> Option<Vec<MatchStep>> {
        let mut steps = self.consume_children(id, pos + 1, depth, segment)?;
        steps.push(MatchStep {
            node: id,
            segment,
            words: Vec::new(),
        });
        Some(steps)
    }

    /// token 耗尽时看本节点是否终止；否则按顺序尝试子节点
    fn consume_children(&mut self, id: NodeId, pos: usize, depth: usize, segment: Segment) -> Option<Vec<MatchStep>> {
        let graph = self.graph;
        let node = graph.node(id);
        if pos >= self.words.len() {
            return node.is_terminal().then(Vec::new);
        }
        node.children
            .iter()
            .find_map(|&child| self.consume(child, pos, depth + 1, segment))
    }
}
