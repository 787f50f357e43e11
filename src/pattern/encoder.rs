//! 上下文编码器
//!
//! 把（输入句子, topic 值, 上一轮回复）线性化为一个 token 序列：
//! `[输入...] __TOPIC__ [topic...] __THAT__ [that...]`，
//! 使普通模式、topic 条件与 that 条件在同一棵树、同一次遍历中统一匹配。

/// topic 段起始哨兵；经过标点剥离的普通输入不可能产生该 token
pub const TOPIC_SENTINEL: &str = "__TOPIC__";
/// that 段起始哨兵
pub const THAT_SENTINEL: &str = "__THAT__";
/// topic / that 缺省时使用的长通配符
pub const DEFAULT_WILDCARD: &str = "*";

pub fn is_sentinel(token: &str) -> bool {
    token == TOPIC_SENTINEL || token == THAT_SENTINEL
}

/// 去除所有标点（字母、数字、空白之外的字符）
pub fn strip_all_punctuation(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

/// 归一化为匹配用的 token：去标点、转大写、按空白切分，并丢弃哨兵
pub fn normalize_tokens(text: &str) -> Vec<String> {
    strip_all_punctuation(text)
        .split_whitespace()
        .map(|w| w.to_uppercase())
        .filter(|w| !is_sentinel(w))
        .collect()
}

/// 把上下文值转为 token；为空（含仅有标点/空白）时回退为单个长通配符
fn context_tokens(value: Option<&str>) -> Vec<String> {
    let tokens = value.map(normalize_tokens).unwrap_or_default();
    if tokens.is_empty() {
        vec![DEFAULT_WILDCARD.to_string()]
    } else {
        tokens
    }
}

/// 编码一次匹配请求
pub fn encode(sentence: &str, topic: Option<&str>, that: Option<&str>) -> Vec<String> {
    let mut tokens = normalize_tokens(sentence);
    tokens.push(TOPIC_SENTINEL.to_string());
    tokens.extend(context_tokens(topic));
    tokens.push(THAT_SENTINEL.to_string());
    tokens.extend(context_tokens(that));
    tokens
}
