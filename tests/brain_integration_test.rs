//! Brain 端到端集成测试

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use honeycomb::config::BrainSection;
use honeycomb::lexicon::Collections;
use honeycomb::oob::{factory_of, OobElement, OobHandler};
use honeycomb::pattern::PatternGraph;
use honeycomb::security::{
    Authenticator, Authorisor, ClientListAuthenticator, Gate, UserGroupAuthorisor,
};
use honeycomb::template::parse_template;
use honeycomb::{Brain, BrainBuilder};

#[derive(Default)]
struct DialedHandler {
    to: Option<String>,
}

#[async_trait]
impl OobHandler for DialedHandler {
    fn name(&self) -> &str {
        "dialed"
    }

    fn parse(&mut self, element: &OobElement) -> bool {
        self.to = element.child_text("to").map(str::to_string);
        self.to.is_some()
    }

    async fn execute(&self, _client_id: &str) -> String {
        "dialed".to_string()
    }
}

#[derive(Default)]
struct CaptureHandler {
    payload: String,
}

#[async_trait]
impl OobHandler for CaptureHandler {
    fn name(&self) -> &str {
        "capture"
    }

    fn parse(&mut self, element: &OobElement) -> bool {
        match &element.text {
            Some(text) => {
                self.payload = text.clone();
                true
            }
            None => false,
        }
    }

    async fn execute(&self, _client_id: &str) -> String {
        format!("got[{}]", self.payload)
    }
}

#[derive(Default)]
struct FallbackHandler;

#[async_trait]
impl OobHandler for FallbackHandler {
    fn name(&self) -> &str {
        "fallback"
    }

    fn parse(&mut self, _element: &OobElement) -> bool {
        true
    }

    async fn execute(&self, _client_id: &str) -> String {
        "fallback".to_string()
    }
}

fn graph(rules: &[(&str, &str, &str, &str)]) -> PatternGraph {
    let mut graph = PatternGraph::new();
    for (pattern, topic, that, template) in rules {
        graph
            .insert(pattern, topic, that, parse_template(template).unwrap())
            .unwrap();
    }
    graph
}

fn settings() -> BrainSection {
    BrainSection {
        default_response: "I have no answer".to_string(),
        ..Default::default()
    }
}

fn brain(rules: &[(&str, &str, &str, &str)]) -> Brain {
    BrainBuilder::new(settings())
        .with_graph(graph(rules))
        .with_lexicon(Arc::new(Collections::new()))
        .with_oob_handler("cmd", factory_of::<DialedHandler>())
        .with_default_oob_handler(factory_of::<FallbackHandler>())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_oob_round_trip() {
    let brain = brain(&[(
        "CALL",
        "*",
        "*",
        "Calling... <oob><cmd><to>123</to></cmd></oob> done",
    )]);
    assert_eq!(
        brain.ask("console", "call").await.as_deref(),
        Some("Calling... done dialed")
    );
}

#[tokio::test]
async fn test_oob_unregistered_tag_uses_default_handler() {
    let brain = brain(&[("PHOTO", "*", "*", "Smile <oob><camera>on</camera></oob>")]);
    assert_eq!(brain.ask("console", "photo").await.as_deref(), Some("Smile fallback"));
}

#[tokio::test]
async fn test_oob_parse_failure_keeps_reply_text() {
    let brain = brain(&[("CALL", "*", "*", "Calling... <oob><cmd><from>1</from></cmd></oob> done")]);
    assert_eq!(brain.ask("console", "call").await.as_deref(), Some("Calling... done"));
}

#[tokio::test]
async fn test_oob_payload_with_markup_characters() {
    let mut lexicon = Collections::new();
    lexicon.add_map("shop", [("food", "Fish & Chips")]);
    let brain = BrainBuilder::new(settings())
        .with_graph(graph(&[(
            "ORDER",
            "*",
            "*",
            r#"Ordering <oob><cap><map name="shop">food</map></cap></oob>"#,
        )]))
        .with_lexicon(Arc::new(lexicon))
        .with_oob_handler("cap", factory_of::<CaptureHandler>())
        .build()
        .unwrap();
    assert_eq!(
        brain.ask("console", "order").await.as_deref(),
        Some("Ordering got[Fish & Chips]")
    );
}

#[tokio::test]
async fn test_no_match_yields_default_response() {
    let brain = brain(&[("HELLO", "*", "*", "Hi")]);
    assert_eq!(brain.ask("console", "goodbye").await, None);
    assert_eq!(brain.ask_or_default("console", "goodbye").await, "I have no answer");
}

#[tokio::test]
async fn test_reinsertion_uses_latest_template() {
    let mut g = graph(&[("HELLO", "*", "*", "first")]);
    g.insert("HELLO", "*", "*", parse_template("second").unwrap())
        .unwrap();
    assert_eq!(g.rule_count(), 1);
    let brain = BrainBuilder::new(settings())
        .with_graph(g)
        .with_lexicon(Arc::new(Collections::new()))
        .build()
        .unwrap();
    assert_eq!(brain.ask("console", "hello").await.as_deref(), Some("second"));
}

#[tokio::test]
async fn test_topic_and_that_context() {
    let brain = brain(&[
        ("HELLO", "*", "*", "Hi"),
        ("SPORTS", "*", "*", r#"<think><set name="topic">sports</set></think>OK sports"#),
        ("*", "SPORTS", "*", "Still sports"),
        ("DO YOU LIKE TEA", "*", "*", "I do. Do you like tea?"),
        ("YES", "*", "I DO DO YOU LIKE TEA", "Then we agree."),
        ("YES", "*", "*", "Yes what?"),
    ]);

    // 没有 topic 与历史时，默认通配分支可以匹配
    assert_eq!(brain.ask("a", "hello").await.as_deref(), Some("Hi"));

    assert_eq!(brain.ask("a", "do you like tea").await.as_deref(), Some("I do. Do you like tea?"));
    assert_eq!(brain.ask("a", "yes").await.as_deref(), Some("Then we agree."));
    assert_eq!(brain.ask("a", "yes").await.as_deref(), Some("Yes what?"));

    // 另一个客户端的历史互不影响
    assert_eq!(brain.ask("b", "yes").await.as_deref(), Some("Yes what?"));

    assert_eq!(brain.ask("a", "sports").await.as_deref(), Some("OK sports"));
    assert_eq!(brain.ask("a", "anything at all").await.as_deref(), Some("Still sports"));
    assert_eq!(brain.ask("b", "anything at all").await, None);

    let conversation = brain.conversation("a").await.unwrap();
    let conversation = conversation.lock().await;
    assert_eq!(conversation.topic(), Some("sports"));
    assert_eq!(
        conversation.current_question().and_then(|q| q.response.as_deref()),
        Some("Still sports")
    );
}

#[tokio::test]
async fn test_authorisation_gating() {
    let mut groups = HashMap::new();
    groups.insert("admin".to_string(), vec!["root".to_string()]);
    let authorisor: Arc<dyn Authorisor> = Arc::new(UserGroupAuthorisor::new(&groups));
    let brain = BrainBuilder::new(settings())
        .with_graph(graph(&[
            ("SHUTDOWN", "*", "*", r#"<authorise role="root">Shutting down.</authorise>"#),
            ("STATUS", "*", "*", r#"All good<authorise role="root">, 3 jobs queued</authorise>."#),
        ]))
        .with_lexicon(Arc::new(Collections::new()))
        .with_authorisor(Gate::new(authorisor, "Not allowed"))
        .build()
        .unwrap();

    assert_eq!(brain.ask("admin", "shutdown").await.as_deref(), Some("Shutting down."));
    assert_eq!(brain.ask("guest", "shutdown").await.as_deref(), Some("Not allowed"));
    assert_eq!(brain.ask("admin", "status").await.as_deref(), Some("All good, 3 jobs queued."));
    assert_eq!(brain.ask("guest", "status").await.as_deref(), Some("All good."));
}

#[tokio::test]
async fn test_denial_text_when_only_a_command_block_remains() {
    let mut groups = HashMap::new();
    groups.insert("admin".to_string(), vec!["root".to_string()]);
    let authorisor: Arc<dyn Authorisor> = Arc::new(UserGroupAuthorisor::new(&groups));
    let brain = BrainBuilder::new(settings())
        .with_graph(graph(&[(
            "REBOOT",
            "*",
            "*",
            r#"<authorise role="root">Rebooting.</authorise><oob><reboot>now</reboot></oob>"#,
        )]))
        .with_lexicon(Arc::new(Collections::new()))
        .with_authorisor(Gate::new(authorisor, "Not allowed"))
        .build()
        .unwrap();

    assert_eq!(brain.ask("admin", "reboot").await.as_deref(), Some("Rebooting."));
    assert_eq!(brain.ask("guest", "reboot").await.as_deref(), Some("Not allowed"));
}

#[tokio::test]
async fn test_authentication_denial() {
    let authenticator: Arc<dyn Authenticator> =
        Arc::new(ClientListAuthenticator::new(vec!["console".to_string()]));
    let brain = BrainBuilder::new(settings())
        .with_graph(graph(&[("HELLO", "*", "*", "Hi")]))
        .with_lexicon(Arc::new(Collections::new()))
        .with_authenticator(Gate::new(authenticator, "Who are you?"))
        .build()
        .unwrap();

    assert_eq!(brain.ask("console", "hello").await.as_deref(), Some("Hi"));
    assert_eq!(brain.ask("stranger", "hello").await.as_deref(), Some("Who are you?"));
    assert!(brain.conversation("stranger").await.is_none());
}

#[tokio::test]
async fn test_concurrent_clients() {
    let brain = Arc::new(brain(&[("HELLO", "*", "*", "Hi")]));
    let mut handles = Vec::new();
    for i in 0..8 {
        let brain = Arc::clone(&brain);
        handles.push(tokio::spawn(async move {
            let client = format!("client{}", i);
            for _ in 0..5 {
                assert_eq!(brain.ask(&client, "hello").await.as_deref(), Some("Hi"));
            }
            client
        }));
    }
    for handle in handles {
        let client = handle.await.unwrap();
        let conversation = brain.conversation(&client).await.unwrap();
        assert_eq!(conversation.lock().await.len(), 5);
    }
}

#[tokio::test]
async fn test_snapshot_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brain.json");
    let brain = brain(&[("HELLO", "*", "*", "Hi")]);
    brain.save_snapshot(&path).await.unwrap();

    brain.swap_graph(graph(&[("BYE", "*", "*", "Bye")])).await;
    assert_eq!(brain.ask("console", "hello").await, None);

    brain.reload_snapshot(&path).await.unwrap();
    assert_eq!(brain.ask("console", "hello").await.as_deref(), Some("Hi"));

    // 损坏的快照不会替换当前图
    std::fs::write(&path, "{ not json").unwrap();
    assert!(brain.reload_snapshot(&path).await.is_err());
    assert_eq!(brain.ask("console", "hello").await.as_deref(), Some("Hi"));
}

#[tokio::test]
async fn test_sample_data_directory() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    let mut settings = settings();
    settings.files.rules = Some(root.join("rules"));
    settings.files.sets = Some(root.join("sets"));
    settings.files.maps = Some(root.join("maps"));
    settings.files.properties = Some(root.join("properties.txt"));
    settings.oob.default = Some("default".to_string());
    settings.oob.handlers.insert("dial".to_string(), "dial".to_string());
    settings.oob.handlers.insert("alarm".to_string(), "alarm".to_string());
    settings.services.insert("echo".to_string(), "echo".to_string());
    let brain = BrainBuilder::new(settings).build().unwrap();

    assert_eq!(
        brain.ask("console", "Howdy!").await.as_deref(),
        Some("Hi there! What is your name?")
    );
    assert_eq!(
        brain.ask("console", "What is the capital of France?").await.as_deref(),
        Some("Paris")
    );
    assert_eq!(brain.ask("console", "are you honey").await.as_deref(), Some("Yes, that is me."));
    assert_eq!(brain.ask("console", "dial 555").await.as_deref(), Some("Calling 555."));
    assert_eq!(brain.ask("console", "remind me at 11 30").await.as_deref(), Some("Alarm set."));
    assert_eq!(brain.ask("console", "echo ping").await.as_deref(), Some("PING"));
    assert_eq!(brain.ask("console", "hi honey").await.as_deref(), Some("Hi there! What is your name?"));
}
