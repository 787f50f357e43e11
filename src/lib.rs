//! Honeycomb - Rust 规则对话引擎
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: Brain 编排、构建器、错误类型
//! - **pattern**: 模式图、上下文编码、回溯匹配、快照
//! - **template**: 模板 AST 与求值
//! - **oob**: 带外命令提取与处理器分发
//! - **memory**: 每客户端会话历史与持久化
//! - **rules**: TOML 规则源加载
//! - **lexicon**: 集合 / 映射 / 机器人属性查表
//! - **security**: 认证与授权
//! - **services**: 外部服务（`<sraix>`）
//! - **observability**: 日志初始化

pub mod config;
pub mod core;
pub mod lexicon;
pub mod memory;
pub mod observability;
pub mod oob;
pub mod pattern;
pub mod rules;
pub mod security;
pub mod services;
pub mod template;

pub use crate::core::{Brain, BrainBuilder, BrainError};
