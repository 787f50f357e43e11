//! 模式层：模式图（构建与等价合并）、上下文编码、回溯匹配、快照

pub mod encoder;
pub mod graph;
pub mod matcher;
pub mod nodes;
pub mod snapshot;

pub use encoder::{encode, normalize_tokens, strip_all_punctuation, THAT_SENTINEL, TOPIC_SENTINEL};
pub use graph::PatternGraph;
pub use matcher::{MatchContext, MatchPath, MatchStep, Segment};
pub use nodes::{NodeId, NodeKind, PatternNode, WildcardKind};
