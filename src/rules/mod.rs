//! 规则源：TOML 规则文件 -> 模式图
//!
//! 每个文件是若干 `[[rule]]` 表：
//!
//! ```toml
//! [[rule]]
//! pattern = "HELLO *"
//! that = "*"
//! template = "Hi <star/>"
//! ```

pub mod loader;

use serde::Deserialize;

pub use loader::RuleLoader;

/// 单条规则；topic / that 缺省为 `*`
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEntry {
    pub pattern: String,
    #[serde(default = "default_context")]
    pub topic: String,
    #[serde(default = "default_context")]
    pub that: String,
    pub template: String,
}

fn default_context() -> String {
    "*".to_string()
}

/// 规则文件
#[derive(Debug, Default, Deserialize)]
pub struct RuleFile {
    #[serde(rename = "rule", default)]
    pub rules: Vec<RuleEntry>,
}
