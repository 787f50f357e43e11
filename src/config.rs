//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HONEYCOMB__*` 覆盖（双下划线表示嵌套，如 `HONEYCOMB__BRAIN__MAX_SEARCH_DEPTH=500`）。

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub brain: BrainSection,
    pub bot: BotSection,
}

/// [bot] 段：命令行入口使用的客户端信息
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotSection {
    pub name: String,
    /// 控制台对话使用的 client_id
    pub client_id: String,
    /// 启动时打印的欢迎语
    pub initial_question: Option<String>,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            name: "honeycomb".to_string(),
            client_id: "console".to_string(),
            initial_question: None,
        }
    }
}

/// [brain] 段：匹配深度、历史长度、默认回复
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrainSection {
    /// 单次匹配的递归深度上限
    pub max_search_depth: usize,
    /// `<srai>` 递归层数上限
    pub max_srai_depth: usize,
    /// 每个客户端保留的问答条数
    pub max_histories: usize,
    /// 未匹配时返回的回复
    pub default_response: String,
    /// 带外命令的包裹标签名
    pub oob_marker: String,
    pub binaries: BinariesSection,
    pub files: FilesSection,
    pub security: SecuritySection,
    pub oob: OobSection,
    /// 外部服务：名称 -> kind
    pub services: HashMap<String, String>,
}

impl Default for BrainSection {
    fn default() -> Self {
        Self {
            max_search_depth: 10_000,
            max_srai_depth: 50,
            max_histories: 100,
            default_response: String::new(),
            oob_marker: "oob".to_string(),
            binaries: BinariesSection::default(),
            files: FilesSection::default(),
            security: SecuritySection::default(),
            oob: OobSection::default(),
            services: HashMap::new(),
        }
    }
}

/// [brain.binaries] 段：模式图快照
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BinariesSection {
    pub load_binary: bool,
    pub save_binary: bool,
    pub binary_filename: PathBuf,
    /// 快照加载失败时是否回退到解析规则源
    pub load_source_on_binary_fail: bool,
}

impl Default for BinariesSection {
    fn default() -> Self {
        Self {
            load_binary: false,
            save_binary: false,
            binary_filename: PathBuf::from("data/brain.json"),
            load_source_on_binary_fail: true,
        }
    }
}

/// [brain.files] 段：规则源与词汇表位置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilesSection {
    pub rules: Option<PathBuf>,
    pub rules_extension: String,
    pub rules_recursive: bool,
    pub sets: Option<PathBuf>,
    pub maps: Option<PathBuf>,
    pub collections_extension: String,
    pub properties: Option<PathBuf>,
    /// 会话持久化目录，未设置时不落盘
    pub conversations: Option<PathBuf>,
}

impl Default for FilesSection {
    fn default() -> Self {
        Self {
            rules: None,
            rules_extension: ".toml".to_string(),
            rules_recursive: true,
            sets: None,
            maps: None,
            collections_extension: ".txt".to_string(),
            properties: None,
            conversations: None,
        }
    }
}

/// [brain.security] 段；未出现的子段表示不启用对应服务
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecuritySection {
    pub authentication: Option<AuthenticationSection>,
    pub authorisation: Option<AuthorisationSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthenticationSection {
    /// passthrough / client_list
    pub kind: String,
    pub denied_text: String,
    pub allowed_clients: Vec<String>,
}

impl Default for AuthenticationSection {
    fn default() -> Self {
        Self {
            kind: "passthrough".to_string(),
            denied_text: "Access denied".to_string(),
            allowed_clients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthorisationSection {
    /// passthrough / usergroups
    pub kind: String,
    pub denied_text: String,
    /// client_id -> 角色列表
    pub usergroups: HashMap<String, Vec<String>>,
}

impl Default for AuthorisationSection {
    fn default() -> Self {
        Self {
            kind: "passthrough".to_string(),
            denied_text: "Access denied".to_string(),
            usergroups: HashMap::new(),
        }
    }
}

/// [brain.oob] 段：默认处理器与 标签 -> kind 映射
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OobSection {
    pub default: Option<String>,
    pub handlers: HashMap<String, String>,
}

/// 从 config 目录加载配置，环境变量 HONEYCOMB__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HONEYCOMB__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!("Config file {} not found, using defaults", path.display());
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HONEYCOMB")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.brain.max_search_depth, 10_000);
        assert_eq!(cfg.brain.oob_marker, "oob");
        assert!(cfg.brain.binaries.load_source_on_binary_fail);
        assert!(cfg.brain.security.authentication.is_none());
        assert_eq!(cfg.bot.client_id, "console");
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.toml");
        std::fs::write(
            &path,
            r#"
[brain]
max_search_depth = 42
default_response = "Sorry?"

[brain.security.authorisation]
kind = "usergroups"
denied_text = "No way"

[brain.security.authorisation.usergroups]
alice = ["root"]

[brain.oob.handlers]
dial = "dial"

[brain.services]
echo = "echo"
"#,
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.brain.max_search_depth, 42);
        assert_eq!(cfg.brain.default_response, "Sorry?");
        let authz = cfg.brain.security.authorisation.unwrap();
        assert_eq!(authz.kind, "usergroups");
        assert_eq!(authz.usergroups["alice"], vec!["root".to_string()]);
        assert_eq!(cfg.brain.oob.handlers["dial"], "dial");
        assert_eq!(cfg.brain.services["echo"], "echo");
        assert_eq!(cfg.brain.max_srai_depth, 50);
    }
}
