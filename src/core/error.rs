//! Brain 错误类型
//!
//! 加载期错误（结构违规、快照损坏/缺失、规则源错误）可以中止引擎；
//! 匹配期的深度超限与未匹配不会以错误形式逃逸，统一折叠为 NoMatch（`None`）。

use std::path::PathBuf;

use thiserror::Error;

/// 引擎加载与运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum BrainError {
    /// 插入规则时违反树形约束（如 TOPIC 下再挂 TOPIC）
    #[error("Structural violation: {0}")]
    StructuralViolation(String),

    #[error("Snapshot absent: {0}")]
    SnapshotAbsent(PathBuf),

    /// 快照文件存在但无法解析或版本不兼容
    #[error("Snapshot corrupt: {0}")]
    SnapshotCorrupt(String),

    #[error("Rule source error: {0}")]
    RuleSource(String),

    #[error("Template parse error: {0}")]
    TemplateParse(String),

    #[error("OOB parse error: {0}")]
    OobParse(String),

    /// 认证 / 授权 / 服务 / OOB 处理器配置错误；加载时只记录日志，不中止
    #[error("Collaborator misconfigured: {0}")]
    CollaboratorMisconfigured(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BrainError {
    /// 快照类错误：按配置决定是否回退到规则源解析
    pub fn is_snapshot_error(&self) -> bool {
        matches!(self, Self::SnapshotAbsent(_) | Self::SnapshotCorrupt(_))
    }
}

impl From<config::ConfigError> for BrainError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BrainError>;
