//! Brain：持有模式图、会话存储、处理器注册表，串起一次问答
//!
//! 一次问答的顺序：认证 -> 记录问题 -> 推导 topic / that -> 编码 -> 匹配 -> 模板求值
//! -> 提取并分发 OOB 命令 -> 合并补充文本 -> 授权拒绝兜底 -> 记录回复并持久化。

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::config::BrainSection;
use crate::core::error::Result;
use crate::lexicon::Lexicon;
use crate::memory::{Conversation, ConversationStore};
use crate::oob::{HandlerRegistry, OobExtractor};
use crate::pattern::{encode, snapshot, MatchContext, PatternGraph};
use crate::security::{Authenticator, Authorisor, Gate};
use crate::services::ServiceRegistry;
use crate::template::{collapse_whitespace, EvalContext};

pub struct Brain {
    pub(crate) settings: BrainSection,
    pub(crate) graph: RwLock<Arc<PatternGraph>>,
    pub(crate) lexicon: Arc<dyn Lexicon>,
    pub(crate) services: ServiceRegistry,
    pub(crate) authentication: Option<Gate<dyn Authenticator>>,
    pub(crate) authorisation: Option<Gate<dyn Authorisor>>,
    pub(crate) oob: HandlerRegistry,
    pub(crate) extractor: OobExtractor,
    pub(crate) conversations: ConversationStore,
}

impl Brain {
    /// 回答一句话；未匹配时返回 None，由调用方决定默认回复
    pub async fn ask(&self, client_id: &str, sentence: &str) -> Option<String> {
        if let Some(gate) = &self.authentication {
            if !gate.service.authenticate(client_id) {
                tracing::error!("[{}] failed authentication", client_id);
                return Some(gate.denied_text.clone());
            }
        }

        let conversation = self.conversations.get_or_create(client_id).await;
        let mut conversation = conversation.lock().await;
        conversation.record_question(sentence);

        let topic = conversation.topic().map(str::to_string);
        let that = conversation.that_response();
        tracing::debug!(
            "[{}] topic [{}] that [{}]",
            client_id,
            topic.as_deref().unwrap_or("*"),
            that.as_deref().unwrap_or("*")
        );
        let tokens = encode(sentence, topic.as_deref(), that.as_deref());

        let graph = self.graph().await;
        let mut match_ctx = MatchContext::new(self.settings.max_search_depth);
        let Some(path) = graph.match_tokens(&tokens, self.lexicon.as_ref(), &mut match_ctx) else {
            tracing::info!("[{}] no match for [{}]", client_id, sentence);
            self.conversations.persist(&conversation);
            return None;
        };
        let template = graph.template(path.terminal())?;
        tracing::debug!("[{}] matched {} nodes deep", client_id, match_ctx.deepest());

        let (resolved, denied) = {
            let mut ctx = EvalContext {
                client_id,
                graph: &graph,
                lexicon: self.lexicon.as_ref(),
                authorisor: self.authorisation.as_ref().map(|g| g.service.as_ref()),
                services: &self.services,
                conversation: &mut *conversation,
                matched: &path,
                max_search_depth: self.settings.max_search_depth,
                max_srai_depth: self.settings.max_srai_depth,
                srai_depth: 0,
                denied: false,
            };
            let text = template.resolve(&mut ctx);
            (collapse_whitespace(&text), ctx.denied)
        };

        let mut reply = self.process_oob(client_id, &resolved).await;
        if reply.is_empty() && denied {
            if let Some(gate) = &self.authorisation {
                reply = gate.denied_text.clone();
            }
        }
        conversation.attach_response(reply.clone());
        self.conversations.persist(&conversation);
        Some(reply)
    }

    /// 未匹配时使用配置的默认回复
    pub async fn ask_or_default(&self, client_id: &str, sentence: &str) -> String {
        match self.ask(client_id, sentence).await {
            Some(reply) => reply,
            None => self.settings.default_response.clone(),
        }
    }

    /// 提取命令块并分发，补充文本非空时以一个空格接在回复后
    async fn process_oob(&self, client_id: &str, text: &str) -> String {
        let (mut reply, block) = self.extractor.strip(text);
        let Some(block) = block else {
            return reply;
        };
        let command = match self.extractor.parse(&block) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("[{}] {}", client_id, e);
                return reply;
            }
        };
        let extra = self.oob.dispatch(client_id, &command).await;
        if !extra.is_empty() {
            if !reply.is_empty() {
                reply.push(' ');
            }
            reply.push_str(&extra);
        }
        reply
    }

    /// 当前模式图（只读共享）
    pub async fn graph(&self) -> Arc<PatternGraph> {
        Arc::clone(&*self.graph.read().await)
    }

    /// 整体替换模式图；正在进行的匹配继续使用旧图
    pub async fn swap_graph(&self, graph: PatternGraph) {
        let rules = graph.rule_count();
        *self.graph.write().await = Arc::new(graph);
        tracing::info!("Pattern graph swapped, {} rules", rules);
    }

    /// 从快照文件加载新图并替换；失败时旧图保持不变
    pub async fn reload_snapshot(&self, path: &Path) -> Result<()> {
        let graph = snapshot::load(path)?;
        self.swap_graph(graph).await;
        Ok(())
    }

    pub async fn save_snapshot(&self, path: &Path) -> Result<()> {
        let graph = self.graph().await;
        snapshot::save(&graph, path)
    }

    pub async fn conversation(&self, client_id: &str) -> Option<Arc<Mutex<Conversation>>> {
        self.conversations.get(client_id).await
    }

    pub async fn dump_tree(&self) -> String {
        self.graph().await.dump()
    }

    pub fn settings(&self) -> &BrainSection {
        &self.settings
    }

    pub fn oob_handlers(&self) -> &HandlerRegistry {
        &self.oob
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    pub fn has_authentication(&self) -> bool {
        self.authentication.is_some()
    }

    pub fn has_authorisation(&self) -> bool {
        self.authorisation.is_some()
    }
}
