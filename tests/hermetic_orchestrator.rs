use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uihost_bot::agent::{Completion, Orchestrator, ReplySink, UploadKey, HOST_UI_FILES_TOOL};
use uihost_bot::llm::{
    ContentBlock, ContentItem, LlmClient, LlmError, LlmProvider, Message, ModelResponse,
    StopReason, ToolDefinition,
};
use uihost_bot::storage::ObjectStore;

const BASE_URL: &str = "https://files.example.dev/";

/// Asks for one upload on the first turn, then finishes.
struct OneFileModel;

#[async_trait]
impl LlmProvider for OneFileModel {
    async fn complete(
        &self,
        _system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        _model_id: &str,
        _max_tokens: u32,
    ) -> Result<ModelResponse, LlmError> {
        assert!(tools.iter().any(|t| t.name == HOST_UI_FILES_TOOL));

        if messages.len() == 1 {
            return Ok(ModelResponse {
                stop_reason: StopReason::ToolUse,
                content: vec![
                    ContentBlock::Item(ContentItem::Text {
                        text: "Generating your page".to_string(),
                    }),
                    ContentBlock::Item(ContentItem::ToolUse {
                        id: "toolu_01".to_string(),
                        name: HOST_UI_FILES_TOOL.to_string(),
                        input: json!({"filename": "index.html", "filecontent": "<h1>hi</h1>"}),
                    }),
                ],
                usage: None,
            });
        }

        Ok(ModelResponse {
            stop_reason: StopReason::EndTurn,
            content: vec![ContentBlock::Item(ContentItem::Text {
                text: "Your page is live".to_string(),
            })],
            usage: None,
        })
    }
}

#[derive(Default)]
struct InMemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self
            .objects
            .lock()
            .expect("store lock")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().expect("store lock").get(key).cloned()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn put(&self, key: &str, content: &[u8]) -> bool {
        self.objects
            .lock()
            .expect("store lock")
            .insert(key.to_string(), content.to_vec());
        true
    }
}

#[derive(Default)]
struct RecordingSink {
    replies: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn replies(&self) -> Vec<String> {
        self.replies.lock().expect("sink lock").clone()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn reply(&self, text: &str) -> anyhow::Result<()> {
        self.replies.lock().expect("sink lock").push(text.to_string());
        Ok(())
    }
}

fn build(store: Arc<InMemoryStore>) -> Orchestrator {
    let llm = LlmClient::with_provider(Arc::new(OneFileModel), "test-model", 1024, "prompt");
    Orchestrator::new(Arc::new(llm), store, BASE_URL, 5)
}

#[tokio::test]
async fn test_file_is_hosted_and_reported() {
    let store = Arc::new(InMemoryStore::default());
    let orchestrator = build(store.clone());
    let sink = RecordingSink::default();

    let completion = orchestrator
        .process_with_key("a hello page", &sink, &UploadKey::from_string("K1K1K1K1K"))
        .await
        .expect("should complete");

    assert_eq!(completion, Completion::EndTurn);
    assert_eq!(
        store.get("K1K1K1K1K/index.html").as_deref(),
        Some(b"<h1>hi</h1>".as_slice())
    );
    assert_eq!(
        sink.replies(),
        vec![
            "Generating your page",
            "Uploading ==> index.html",
            "uploaded: https://files.example.dev/K1K1K1K1K/index.html",
            "Your page is live",
        ]
    );
}

#[tokio::test]
async fn test_concurrent_messages_use_distinct_prefixes() {
    let store = Arc::new(InMemoryStore::default());
    let orchestrator = build(store.clone());
    let first = RecordingSink::default();
    let second = RecordingSink::default();

    let (a, b) = tokio::join!(
        orchestrator.process("page one", &first),
        orchestrator.process("page two", &second)
    );
    a.expect("first completes");
    b.expect("second completes");

    let keys = store.keys();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);
    for key in &keys {
        let (prefix, filename) = key.split_once('/').expect("prefixed key");
        assert_eq!(prefix.len(), 9);
        assert_eq!(filename, "index.html");
    }
}
