//! Brain 构建器：统一的加载顺序
//!
//! 1. 模式图：按配置先尝试快照，失败时视配置回退到解析规则源，解析后可选写新快照
//! 2. 词汇表（集合 / 映射 / 属性）
//! 3. 外部服务
//! 4. 认证与授权
//! 5. OOB 处理器
//!
//! 第 1 步的结构违规与快照错误会中止构建；其余协作方配置错误只记录日志，对应位置留空。
//! 以 with_* 显式传入的组件优先于配置。

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::{AppConfig, BrainSection};
use crate::core::brain::Brain;
use crate::core::error::Result;
use crate::lexicon::{Collections, Lexicon};
use crate::memory::{ConversationPersistence, ConversationStore};
use crate::oob::{handler_factory, HandlerFactory, HandlerRegistry, OobExtractor};
use crate::pattern::{snapshot, PatternGraph};
use crate::rules::RuleLoader;
use crate::security::{build_authenticator, build_authorisor, Authenticator, Authorisor, Gate};
use crate::services::{service_from_kind, Service, ServiceRegistry};

pub struct BrainBuilder {
    settings: BrainSection,
    graph: Option<PatternGraph>,
    lexicon: Option<Arc<dyn Lexicon>>,
    services: Vec<(String, Arc<dyn Service>)>,
    authenticator: Option<Gate<dyn Authenticator>>,
    authorisor: Option<Gate<dyn Authorisor>>,
    handlers: Vec<(String, HandlerFactory)>,
    default_handler: Option<HandlerFactory>,
}

impl BrainBuilder {
    pub fn new(settings: BrainSection) -> Self {
        Self {
            settings,
            graph: None,
            lexicon: None,
            services: Vec::new(),
            authenticator: None,
            authorisor: None,
            handlers: Vec::new(),
            default_handler: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.brain.clone())
    }

    /// 直接使用已构建好的模式图，跳过快照与规则源
    pub fn with_graph(mut self, graph: PatternGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_lexicon(mut self, lexicon: Arc<dyn Lexicon>) -> Self {
        self.lexicon = Some(lexicon);
        self
    }

    pub fn with_service(mut self, name: &str, service: Arc<dyn Service>) -> Self {
        self.services.push((name.to_string(), service));
        self
    }

    pub fn with_authenticator(mut self, gate: Gate<dyn Authenticator>) -> Self {
        self.authenticator = Some(gate);
        self
    }

    pub fn with_authorisor(mut self, gate: Gate<dyn Authorisor>) -> Self {
        self.authorisor = Some(gate);
        self
    }

    pub fn with_oob_handler(mut self, tag: &str, factory: HandlerFactory) -> Self {
        self.handlers.push((tag.to_string(), factory));
        self
    }

    pub fn with_default_oob_handler(mut self, factory: HandlerFactory) -> Self {
        self.default_handler = Some(factory);
        self
    }

    pub fn build(self) -> Result<Brain> {
        let graph = match self.graph {
            Some(graph) => graph,
            None => load_graph(&self.settings)?,
        };
        tracing::info!(
            "Pattern graph ready: {} rules, {} nodes",
            graph.rule_count(),
            graph.node_count()
        );
        tracing::debug!("Pattern graph:\n{}", graph.dump());

        let lexicon = match self.lexicon {
            Some(lexicon) => lexicon,
            None => Arc::new(load_collections(&self.settings)),
        };

        let mut services = ServiceRegistry::new();
        for (name, kind) in &self.settings.services {
            match service_from_kind(kind) {
                Ok(service) => services.register(name, service),
                Err(e) => tracing::error!("Service [{}] not loaded: {}", name, e),
            }
        }
        for (name, service) in self.services {
            services.register(&name, service);
        }

        let authentication = self.authenticator.or_else(|| {
            let cfg = self.settings.security.authentication.as_ref()?;
            build_authenticator(cfg)
                .map_err(|e| tracing::error!("Authentication not loaded: {}", e))
                .ok()
        });
        let authorisation = self.authorisor.or_else(|| {
            let cfg = self.settings.security.authorisation.as_ref()?;
            build_authorisor(cfg)
                .map_err(|e| tracing::error!("Authorisation not loaded: {}", e))
                .ok()
        });
        if authentication.is_none() && authorisation.is_none() {
            tracing::debug!("No security configured, running open");
        }

        let mut oob = HandlerRegistry::new();
        if let Some(kind) = &self.settings.oob.default {
            match handler_factory(kind) {
                Ok(factory) => oob.set_default(factory),
                Err(e) => tracing::error!("Default OOB handler not loaded: {}", e),
            }
        }
        for (tag, kind) in &self.settings.oob.handlers {
            match handler_factory(kind) {
                Ok(factory) => oob.register_factory(tag, factory),
                Err(e) => tracing::error!("OOB handler [{}] not loaded: {}", tag, e),
            }
        }
        for (tag, factory) in self.handlers {
            oob.register_factory(&tag, factory);
        }
        if let Some(factory) = self.default_handler {
            oob.set_default(factory);
        }
        tracing::info!("OOB handlers: {:?}", oob.tags());

        let extractor = OobExtractor::new(&self.settings.oob_marker)?;
        let persistence = self
            .settings
            .files
            .conversations
            .as_ref()
            .map(ConversationPersistence::new);
        let conversations = ConversationStore::new(self.settings.max_histories, persistence);

        Ok(Brain {
            settings: self.settings,
            graph: RwLock::new(Arc::new(graph)),
            lexicon,
            services,
            authentication,
            authorisation,
            oob,
            extractor,
            conversations,
        })
    }
}

/// 快照优先，按配置回退到规则源
fn load_graph(settings: &BrainSection) -> Result<PatternGraph> {
    let binaries = &settings.binaries;
    if binaries.load_binary {
        match snapshot::load(&binaries.binary_filename) {
            Ok(graph) => {
                tracing::info!("Loaded snapshot {}", binaries.binary_filename.display());
                return Ok(graph);
            }
            Err(e) if e.is_snapshot_error() && binaries.load_source_on_binary_fail => {
                tracing::warn!("{}, falling back to rule sources", e);
            }
            Err(e) => return Err(e),
        }
    }

    let graph = parse_sources(settings)?;
    if binaries.save_binary {
        match snapshot::save(&graph, &binaries.binary_filename) {
            Ok(()) => tracing::info!("Saved snapshot {}", binaries.binary_filename.display()),
            Err(e) => tracing::error!("Failed to save snapshot: {}", e),
        }
    }
    Ok(graph)
}

fn parse_sources(settings: &BrainSection) -> Result<PatternGraph> {
    let mut graph = PatternGraph::new();
    let files = &settings.files;
    match &files.rules {
        Some(dir) => {
            RuleLoader::new(dir, &files.rules_extension, files.rules_recursive)
                .load_into(&mut graph)?;
        }
        None => tracing::warn!("No rules directory configured"),
    }
    Ok(graph)
}

fn load_collections(settings: &BrainSection) -> Collections {
    let files = &settings.files;
    let mut collections = Collections::new();
    if let Some(dir) = &files.sets {
        match collections.load_sets_dir(dir, &files.collections_extension) {
            Ok(n) => tracing::info!("Loaded {} sets", n),
            Err(e) => tracing::warn!("Sets not loaded from {}: {}", dir.display(), e),
        }
    }
    if let Some(dir) = &files.maps {
        match collections.load_maps_dir(dir, &files.collections_extension) {
            Ok(n) => tracing::info!("Loaded {} maps", n),
            Err(e) => tracing::warn!("Maps not loaded from {}: {}", dir.display(), e),
        }
    }
    if let Some(path) = &files.properties {
        match collections.load_properties(path) {
            Ok(n) => tracing::info!("Loaded {} bot properties", n),
            Err(e) => tracing::warn!("Properties not loaded from {}: {}", path.display(), e),
        }
    }
    collections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthenticationSection, BinariesSection};
    use crate::core::error::BrainError;
    use crate::template::Template;

    fn write_rules(dir: &std::path::Path) {
        std::fs::write(
            dir.join("greetings.toml"),
            "[[rule]]\npattern = \"HELLO\"\ntemplate = \"Hi there\"\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_fallback_to_source_then_save() {
        let dir = tempfile::tempdir().unwrap();
        write_rules(dir.path());
        let snapshot_path = dir.path().join("brain.json");

        let mut settings = BrainSection::default();
        settings.files.rules = Some(dir.path().to_path_buf());
        settings.binaries = BinariesSection {
            load_binary: true,
            save_binary: true,
            binary_filename: snapshot_path.clone(),
            load_source_on_binary_fail: true,
        };

        let brain = BrainBuilder::new(settings.clone()).build().unwrap();
        assert_eq!(brain.graph().await.rule_count(), 1);
        assert!(snapshot_path.exists());

        // 第二次从快照加载，即使规则目录已不存在
        std::fs::remove_file(dir.path().join("greetings.toml")).unwrap();
        let brain = BrainBuilder::new(settings).build().unwrap();
        assert_eq!(brain.ask("console", "hello").await.as_deref(), Some("Hi there"));
    }

    #[test]
    fn test_snapshot_failure_is_fatal_without_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = BrainSection::default();
        settings.binaries.load_binary = true;
        settings.binaries.load_source_on_binary_fail = false;
        settings.binaries.binary_filename = dir.path().join("missing.json");
        let err = BrainBuilder::new(settings).build().err().unwrap();
        assert!(matches!(err, BrainError::SnapshotAbsent(_)));
    }

    #[test]
    fn test_structural_violation_in_rules_aborts_build() {
        let dir = tempfile::tempdir().unwrap();
        write_rules(dir.path());
        std::fs::write(
            dir.path().join("topics.toml"),
            "[[rule]]\npattern = \"A __TOPIC__\"\ntemplate = \"x\"\n",
        )
        .unwrap();

        let mut settings = BrainSection::default();
        settings.files.rules = Some(dir.path().to_path_buf());
        let err = BrainBuilder::new(settings).build().err().unwrap();
        assert!(matches!(err, BrainError::StructuralViolation(_)));
    }

    #[test]
    fn test_misconfigured_collaborators_are_left_unset() {
        let mut settings = BrainSection::default();
        settings.security.authentication = Some(AuthenticationSection {
            kind: "ldap".to_string(),
            ..Default::default()
        });
        settings.oob.handlers.insert("camera".to_string(), "camera".to_string());
        settings.oob.handlers.insert("dial".to_string(), "dial".to_string());
        settings.services.insert("weather".to_string(), "pandora".to_string());

        let mut graph = PatternGraph::new();
        graph.insert("HI", "*", "*", Template::text("hi")).unwrap();
        let brain = BrainBuilder::new(settings).with_graph(graph).build().unwrap();
        assert!(!brain.has_authentication());
        assert!(brain.oob_handlers().has("dial"));
        assert!(!brain.oob_handlers().has("camera"));
        assert!(brain.services().is_empty());
    }
}
