//! 安全协作方：认证与授权
//!
//! 引擎只调用两个布尔能力：authenticate(client) 与 authorise(client, role)，
//! 每个都配有一段拒绝文本（Gate）。具体实现由配置中的 kind 通过静态表构造。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::{AuthenticationSection, AuthorisationSection};
use crate::core::error::{BrainError, Result};

/// 认证服务：客户端能否与机器人对话
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, client_id: &str) -> bool;
}

/// 授权服务：客户端是否拥有某个角色
pub trait Authorisor: Send + Sync {
    fn authorise(&self, client_id: &str, role: &str) -> bool;
}

/// 服务 + 被拒绝时返回给用户的文本
pub struct Gate<T: ?Sized> {
    pub service: Arc<T>,
    pub denied_text: String,
}

impl<T: ?Sized> Gate<T> {
    pub fn new(service: Arc<T>, denied_text: impl Into<String>) -> Self {
        Self {
            service,
            denied_text: denied_text.into(),
        }
    }
}

impl<T: ?Sized> Clone for Gate<T> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            denied_text: self.denied_text.clone(),
        }
    }
}

/// 全部放行
#[derive(Debug, Default)]
pub struct PassThroughAuthenticator;

impl Authenticator for PassThroughAuthenticator {
    fn authenticate(&self, _client_id: &str) -> bool {
        true
    }
}

/// 仅放行白名单中的客户端
#[derive(Debug, Default)]
pub struct ClientListAuthenticator {
    allowed: HashSet<String>,
}

impl ClientListAuthenticator {
    pub fn new<I: IntoIterator<Item = String>>(allowed: I) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

impl Authenticator for ClientListAuthenticator {
    fn authenticate(&self, client_id: &str) -> bool {
        self.allowed.contains(client_id)
    }
}

/// 所有角色都放行
#[derive(Debug, Default)]
pub struct PassThroughAuthorisor;

impl Authorisor for PassThroughAuthorisor {
    fn authorise(&self, _client_id: &str, _role: &str) -> bool {
        true
    }
}

/// 按用户组配置授权：client -> 角色集合
#[derive(Debug, Default)]
pub struct UserGroupAuthorisor {
    roles: HashMap<String, HashSet<String>>,
}

impl UserGroupAuthorisor {
    pub fn new(usergroups: &HashMap<String, Vec<String>>) -> Self {
        let roles = usergroups
            .iter()
            .map(|(user, roles)| {
                (
                    user.clone(),
                    roles.iter().map(|r| r.to_lowercase()).collect(),
                )
            })
            .collect();
        Self { roles }
    }
}

impl Authorisor for UserGroupAuthorisor {
    fn authorise(&self, client_id: &str, role: &str) -> bool {
        self.roles
            .get(client_id)
            .is_some_and(|r| r.contains(&role.to_lowercase()))
    }
}

/// 按配置 kind 构造认证服务
pub fn build_authenticator(cfg: &AuthenticationSection) -> Result<Gate<dyn Authenticator>> {
    let service: Arc<dyn Authenticator> = match cfg.kind.as_str() {
        "passthrough" => Arc::new(PassThroughAuthenticator),
        "client_list" => Arc::new(ClientListAuthenticator::new(cfg.allowed_clients.iter().cloned())),
        other => {
            return Err(BrainError::CollaboratorMisconfigured(format!(
                "Unknown authentication kind [{}]",
                other
            )))
        }
    };
    Ok(Gate::new(service, cfg.denied_text.clone()))
}

/// 按配置 kind 构造授权服务
pub fn build_authorisor(cfg: &AuthorisationSection) -> Result<Gate<dyn Authorisor>> {
    let service: Arc<dyn Authorisor> = match cfg.kind.as_str() {
        "passthrough" => Arc::new(PassThroughAuthorisor),
        "usergroups" => Arc::new(UserGroupAuthorisor::new(&cfg.usergroups)),
        other => {
            return Err(BrainError::CollaboratorMisconfigured(format!(
                "Unknown authorisation kind [{}]",
                other
            )))
        }
    };
    Ok(Gate::new(service, cfg.denied_text.clone()))
}
