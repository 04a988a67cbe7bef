//! Text-path behavior of the conversation engine

mod common;

use common::{drain_events, engine_with, eventually, loading_transitions, server_error, ScriptedBackend};
use contextllm_core::bus::EngineEvent;
use contextllm_core::config::Config;
use contextllm_core::session::Role;
use contextllm_engine::{ConversationEngine, EngineBackends};
use contextllm_providers::QueryReply;

#[tokio::test]
async fn test_first_submission_titles_session_and_toggles_loading() {
    let (backend, gate) = ScriptedBackend::gated(vec![Ok(QueryReply::new("Hi!", "gpt"))]);
    let (engine, _sink) = engine_with(backend);
    let mut rx = engine.subscribe();

    let active = engine.active_session().unwrap();
    assert!(active.messages.is_empty());

    let handle = engine.submit("Hello world").unwrap();

    let session = engine.active_session().unwrap();
    assert_eq!(session.messages.len(), 1);
    assert_eq!(session.messages[0].content, "Hello world");
    assert_eq!(session.messages[0].role, Role::User);
    assert_eq!(session.title, "Hello world...");
    assert!(engine.is_loading());

    gate.add_permits(1);
    let outcome = handle.await.unwrap();
    assert!(outcome.is_success());
    assert!(!engine.is_loading());

    let session = engine.active_session().unwrap();
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[1].role, Role::Assistant);
    assert_eq!(session.messages[1].content, "Hi!");
    assert_eq!(session.messages[1].llm.as_deref(), Some("gpt"));
    assert_eq!(engine.current_llm(), "gpt");

    let events = drain_events(&mut rx);
    assert_eq!(loading_transitions(&events), vec![true, false]);
    assert!(events.contains(&EngineEvent::TitleChanged {
        session_id: session.id,
        title: "Hello world...".to_string(),
    }));
}

#[tokio::test]
async fn test_second_submission_keeps_title() {
    let (engine, _sink) = engine_with(ScriptedBackend::new(vec![
        Ok(QueryReply::new("Hi!", "gpt")),
        Ok(QueryReply::new("Sure.", "claude")),
    ]));

    engine.submit("Hello world").unwrap().await.unwrap();
    engine.submit("Second").unwrap().await.unwrap();

    let session = engine.active_session().unwrap();
    assert_eq!(session.title, "Hello world...");
    assert_eq!(session.messages.len(), 4);
    assert_eq!(session.messages[3].llm.as_deref(), Some("claude"));
    assert_eq!(engine.current_llm(), "claude");
}

#[tokio::test]
async fn test_backend_failure_appends_single_apology() {
    let (engine, _sink) = engine_with(ScriptedBackend::new(vec![server_error()]));
    let mut rx = engine.subscribe();

    let outcome = engine.submit("Hello").unwrap().await.unwrap();
    assert!(!outcome.is_success());

    let session = engine.active_session().unwrap();
    let replies: Vec<_> = session
        .messages
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .collect();
    assert_eq!(replies.len(), 1);
    assert_eq!(
        replies[0].content,
        "Sorry, I encountered an error while processing your request. Please try again."
    );
    assert!(replies[0].llm.is_none());
    assert!(!engine.is_loading());
    assert_eq!(loading_transitions(&drain_events(&mut rx)), vec![true, false]);
}

#[tokio::test]
async fn test_http_500_through_real_client() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/query")
        .with_status(500)
        .with_body("boom")
        .expect(1)
        .create_async()
        .await;

    let mut config = Config::default();
    config.backend.base_url = server.url();
    let engine = ConversationEngine::new(&config, EngineBackends::http(&config));

    let outcome = engine.submit("Hello").unwrap().await.unwrap();
    assert!(!outcome.is_success());
    assert!(outcome.message().unwrap().llm.is_none());
    assert!(!engine.is_loading());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_new_chat_is_active_empty_and_first() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());
    let original = engine.active_session().unwrap().id;

    let created = engine.new_chat();

    let sessions = engine.sessions();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, created);
    assert_eq!(sessions[1].id, original);

    let active = engine.active_session().unwrap();
    assert_eq!(active.id, created);
    assert_eq!(active.title, "New chat");
    assert!(active.messages.is_empty());
}

#[tokio::test]
async fn test_reply_lands_in_session_active_at_submission() {
    let (backend, gate) = ScriptedBackend::gated(vec![Ok(QueryReply::new("Hi!", "gpt"))]);
    let (engine, _sink) = engine_with(backend);
    let first = engine.active_session().unwrap().id;

    let handle = engine.submit("Hello").unwrap();
    let second = engine.new_chat();
    assert_eq!(engine.active_session().unwrap().id, second);

    gate.add_permits(1);
    let outcome = handle.await.unwrap();
    assert_eq!(outcome.session_id(), first);

    let first_session = engine.registry().session(first).unwrap();
    assert_eq!(first_session.messages.len(), 2);
    assert_eq!(first_session.messages[1].content, "Hi!");

    let second_session = engine.registry().session(second).unwrap();
    assert!(second_session.messages.is_empty());
    assert_eq!(second_session.title, "New chat");
}

#[tokio::test]
async fn test_concurrent_submissions_keep_loading_until_all_finish() {
    let (backend, gate) = ScriptedBackend::gated(vec![
        Ok(QueryReply::new("one", "gpt")),
        Ok(QueryReply::new("two", "gpt")),
    ]);
    let (engine, _sink) = engine_with(backend);
    let mut rx = engine.subscribe();

    let a = engine.submit("first").unwrap();
    let b = engine.submit("second").unwrap();
    assert!(engine.is_loading());

    gate.add_permits(1);
    let finished_one = eventually(|| a.is_finished() || b.is_finished()).await;
    assert!(finished_one);
    assert!(engine.is_loading());

    gate.add_permits(1);
    a.await.unwrap();
    b.await.unwrap();
    assert!(!engine.is_loading());
    assert_eq!(loading_transitions(&drain_events(&mut rx)), vec![true, false]);
}

#[tokio::test]
async fn test_blank_prompt_is_rejected_without_mutation() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());
    assert!(engine.submit("  \n ").is_err());

    let session = engine.active_session().unwrap();
    assert!(session.messages.is_empty());
    assert_eq!(session.title, "New chat");
    assert!(!engine.is_loading());
}

#[tokio::test]
async fn test_prompt_and_uid_reach_backend() {
    let backend = std::sync::Arc::new(ScriptedBackend::default());
    let backends = EngineBackends {
        query: backend.clone(),
        context_sink: std::sync::Arc::new(common::RecordingSink::default()),
        voice_settings: std::sync::Arc::new(common::FixedVoiceSettings {
            llm: "gpt".to_string(),
            context: Vec::new(),
        }),
    };
    let engine = ConversationEngine::new(&Config::default(), backends).with_uid("user-42");

    engine.submit("  What is new?  ").unwrap().await.unwrap();
    assert_eq!(
        *backend.calls.lock(),
        vec![("What is new?".to_string(), "user-42".to_string())]
    );
}

#[tokio::test]
async fn test_title_changes_only_once() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());
    let mut rx = engine.subscribe();

    for prompt in ["alpha", "beta", "gamma"] {
        engine.submit(prompt).unwrap().await.unwrap();
    }

    let titles: Vec<_> = drain_events(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::TitleChanged { .. }))
        .collect();
    assert_eq!(titles.len(), 1);
    assert_eq!(engine.active_session().unwrap().title, "alpha...");
}

#[tokio::test]
async fn test_delete_chat_is_a_no_op() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());
    let id = engine.active_session().unwrap().id;
    engine.new_chat();

    assert!(!engine.delete_chat(id));
    assert_eq!(engine.sessions().len(), 2);
}

#[tokio::test]
async fn test_switch_chat_changes_active_session() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());
    let first = engine.active_session().unwrap().id;
    engine.new_chat();

    assert!(engine.switch_chat(first));
    assert_eq!(engine.active_session().unwrap().id, first);
}
