//! End-to-end tests of the assist flow through the coordinator: context
//! assembly, the spawned request with retries, apply and undo.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use promptstack_core::context::{ContextSource, DocumentMeta, StaticPool};
use promptstack_core::error::{AssistError, EditError, TransportError};
use promptstack_core::llm::{AssistEvent, SuggestionTransport};
use promptstack_core::suggestion::SuggestionStatus;
use promptstack_core::{Buffer, Coordinator, CoordinatorConfig, ModelRegistry};
use promptstack_test_utils::{
    FixedClock, ItemBuilder, ScriptedTransport, TestConfigBuilder, TestFiles, init_test_tracing,
};
use tokio::sync::mpsc::UnboundedReceiver;

const DOCUMENT: &str = "Write a function that sorts a list\nKeep it short.";

const REPLY: &str = r#"Here you go:
```json
{
  "suggestions": [
    {
      "type": "clarity",
      "title": "Say how short",
      "description": "Give a concrete length.",
      "edits": [{"line": 2, "column": 9, "old_content": "short.", "new_content": "under ten lines."}]
    },
    {
      "type": "gap",
      "title": "Name the language",
      "description": "",
      "edits": [{"line": 1, "column": 1, "old_content": "Write a function", "new_content": "Write a Rust function"}]
    }
  ],
  "summary": "Two small fixes"
}
```"#;

fn library() -> StaticPool {
    StaticPool::new(vec![
        ItemBuilder::new("bread").content("Knead the dough.").build(),
        ItemBuilder::new("sorting")
            .tags(["sort", "algorithm"])
            .category("code")
            .content("Prefer a stable sort.")
            .use_count(5)
            .build(),
    ])
}

fn coordinator(
    transport: &Arc<ScriptedTransport>,
    config: CoordinatorConfig,
) -> (Coordinator, UnboundedReceiver<AssistEvent>) {
    let (coordinator, rx) = Coordinator::new(
        Box::new(Buffer::new(DOCUMENT)),
        config,
        Arc::clone(transport) as Arc<dyn SuggestionTransport>,
        Box::new(library()),
        Box::new(StaticPool::default()),
    );
    (coordinator.with_clock(Arc::new(FixedClock::default())), rx)
}

fn default_config() -> CoordinatorConfig {
    CoordinatorConfig::from_app_config(&TestConfigBuilder::new().build(), &ModelRegistry::default())
}

fn meta() -> DocumentMeta {
    DocumentMeta::default().with_tags(["sort"]).with_category("code")
}

#[test_log::test(tokio::test)]
async fn test_round_trip_with_retry_apply_and_undo() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .fail(TransportError::Server {
                status: 503,
                message: "overloaded".into(),
            })
            .reply(REPLY),
    );
    let (mut c, mut rx) = coordinator(&transport, default_config());

    c.request_suggestions(&meta()).unwrap();
    let event = rx.recv().await.unwrap();
    assert_eq!(c.handle_event(event).unwrap(), 2);
    assert_eq!(transport.calls(), 2);
    assert_eq!(c.summary(), Some("Two small fixes"));

    // The best-matching library prompt leads the context.
    let sent = &transport.requests()[0];
    assert_eq!(sent.context[0].id, "sorting");
    assert_eq!(sent.context[0].source, ContextSource::Library);
    assert!(sent.document_excerpt.contains("Keep it short."));

    let ids: Vec<String> = c.suggestions().iter().map(|s| s.id.clone()).collect();
    c.apply(&ids[0]).unwrap();
    c.apply(&ids[1]).unwrap();
    assert_eq!(
        c.document().text(),
        "Write a Rust function that sorts a list\nKeep it under ten lines."
    );
    assert!(c
        .suggestions()
        .iter()
        .all(|s| s.status == SuggestionStatus::Applied));

    c.undo().unwrap();
    assert_eq!(
        c.document().text(),
        "Write a function that sorts a list\nKeep it under ten lines."
    );
    c.undo().unwrap();
    assert_eq!(c.document().text(), DOCUMENT);
    assert!(matches!(c.undo(), Err(AssistError::NothingToUndo)));

    c.redo().unwrap();
    assert_eq!(
        c.document().text(),
        "Write a function that sorts a list\nKeep it under ten lines."
    );
}

#[tokio::test]
async fn test_stale_suggestion_conflicts_after_user_edit() {
    init_test_tracing();
    let transport = Arc::new(ScriptedTransport::new().reply(REPLY));
    let (mut c, mut rx) = coordinator(&transport, default_config());

    c.request_suggestions(&meta()).unwrap();
    let event = rx.recv().await.unwrap();
    c.handle_event(event).unwrap();

    // The user rewrites line 2 while the suggestions sit in the list.
    c.document_mut()
        .apply_mutation("Write a function that sorts a list\nBe brief.".to_string());

    let id = c.suggestions()[0].id.clone();
    let err = c.apply(&id).unwrap_err();
    assert!(matches!(err, AssistError::Edit(EditError::Conflict { .. })));
    assert_eq!(c.document().text(), "Write a function that sorts a list\nBe brief.");
    assert!(!c.document().is_read_only());
    assert_eq!(c.suggestion(&id).unwrap().status, SuggestionStatus::Error);
    assert!(!c.can_undo());

    // The other suggestion still applies.
    let other = c.suggestions()[1].id.clone();
    c.apply(&other).unwrap();
    assert_eq!(
        c.document().text(),
        "Write a Rust function that sorts a list\nBe brief."
    );
}

#[tokio::test]
async fn test_transport_failure_returns_to_idle() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .fail(TransportError::Auth("invalid x-api-key".into()))
            .reply(REPLY),
    );
    let (mut c, mut rx) = coordinator(&transport, default_config());

    c.request_suggestions(&meta()).unwrap();
    let event = rx.recv().await.unwrap();
    let err = c.handle_event(event).unwrap_err();
    assert!(matches!(err, AssistError::Transport(TransportError::Auth(_))));
    assert_eq!(transport.calls(), 1);
    assert!(!c.is_request_in_flight());

    c.request_suggestions(&meta()).unwrap();
    let event = rx.recv().await.unwrap();
    assert_eq!(c.handle_event(event).unwrap(), 2);
}

#[tokio::test]
async fn test_cancelled_request_is_superseded() {
    let transport = Arc::new(ScriptedTransport::new().hang().reply(REPLY));
    let (mut c, mut rx) = coordinator(&transport, default_config());

    let first = c.request_suggestions(&meta()).unwrap();
    // Let the first task reach the transport before cancelling it.
    while transport.calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(c.cancel_request());
    let second = c.request_suggestions(&meta()).unwrap();
    assert_ne!(first, second);

    let mut loaded = 0;
    for _ in 0..2 {
        let event = rx.recv().await.unwrap();
        loaded += c.handle_event(event).unwrap();
    }
    assert_eq!(loaded, 2);
    assert_eq!(c.suggestions().len(), 2);
    assert!(!c.document().is_read_only());
}

#[tokio::test]
async fn test_oversized_document_never_reaches_transport() {
    let transport = Arc::new(ScriptedTransport::new().reply(REPLY));
    let app = TestConfigBuilder::new()
        .model("tiny-model")
        .context_window("tiny-model", 20)
        .build();
    let config = CoordinatorConfig::from_app_config(&app, &ModelRegistry::from_config(&app.model));
    let (mut c, _rx) = coordinator(&transport, config);

    let err = c.request_suggestions(&meta()).unwrap_err();
    assert!(matches!(err, AssistError::BudgetExceeded { limit: 5, .. }));
    assert_eq!(transport.calls(), 0);
    assert!(c.budget_status()[0].starts_with("Document exceeds token budget"));
}

#[tokio::test]
async fn test_config_and_pools_from_files() {
    let files = TestFiles::new();
    let app = files
        .load_config(
            r#"
[model]
name = "local-model"

[model.context_windows]
"local-model" = 8000

[context]
max_library_items = 1
"#,
        )
        .await;
    let pool_path = files
        .write(
            "library.toml",
            r#"
[[items]]
id = "sorting"
title = "Sorting helper"
tags = ["sort"]
content = "Prefer a stable sort."

[[items]]
id = "lists"
title = "List idioms"
content = "Sort the list in place."
"#,
        )
        .await;
    let pool = StaticPool::load(&pool_path).await.unwrap();

    let transport = Arc::new(ScriptedTransport::new().reply(r#"{"suggestions": []}"#));
    let config = CoordinatorConfig::from_app_config(&app, &ModelRegistry::from_config(&app.model));
    assert_eq!(config.budget.window_size(), 8000);
    let (mut c, mut rx) = Coordinator::new(
        Box::new(Buffer::new(DOCUMENT)),
        config,
        Arc::clone(&transport) as Arc<dyn SuggestionTransport>,
        Box::new(pool),
        Box::new(StaticPool::default()),
    );

    c.request_suggestions(&meta()).unwrap();
    let event = rx.recv().await.unwrap();
    assert_eq!(c.handle_event(event).unwrap(), 0);

    let selection = c.selection();
    assert_eq!(selection.library.len(), 1);
    assert_eq!(selection.library[0].item.id, "sorting");
    assert!(selection.fits);
}
