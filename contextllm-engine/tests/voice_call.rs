//! Voice-path behavior of the conversation engine

mod common;

use chrono::{Duration, Utc};
use common::{drain_events, engine_with, engine_with_voice_llm, ScriptedBackend};
use contextllm_core::bus::{EngineEvent, VoiceEvent};
use contextllm_core::session::Role;
use contextllm_engine::CallEnd;
use contextllm_providers::QueryReply;

#[tokio::test]
async fn test_identical_final_within_window_is_rejected() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());
    let mut rx = engine.subscribe();
    let t = Utc::now();

    let call = engine.start_voice_call();
    call.sender
        .send(VoiceEvent::final_transcript(Role::User, "Hi", t))
        .unwrap();
    call.sender
        .send(VoiceEvent::final_transcript(
            Role::User,
            "Hi",
            t + Duration::milliseconds(500),
        ))
        .unwrap();
    let summary = call.stop().await.unwrap();

    assert_eq!(summary.rejected, 1);
    let session = engine.active_session().unwrap();
    let hits = session
        .messages
        .iter()
        .filter(|m| m.role == Role::User && m.content == "Hi")
        .count();
    assert_eq!(hits, 1);
    assert!(drain_events(&mut rx)
        .iter()
        .any(|e| matches!(e, EngineEvent::DuplicateRejected { .. })));
}

#[tokio::test]
async fn test_identical_final_outside_window_is_accepted() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());
    let t = Utc::now();

    let call = engine.start_voice_call();
    call.sender
        .send(VoiceEvent::final_transcript(Role::User, "Hi", t))
        .unwrap();
    call.sender
        .send(VoiceEvent::final_transcript(
            Role::User,
            "Hi",
            t + Duration::milliseconds(1000),
        ))
        .unwrap();
    let summary = call.stop().await.unwrap();

    assert_eq!(summary.rejected, 0);
    assert_eq!(engine.active_session().unwrap().messages.len(), 2);
}

#[tokio::test]
async fn test_voice_duplicate_of_text_submission_is_rejected() {
    let (engine, _sink) = engine_with(ScriptedBackend::new(vec![Ok(QueryReply::new(
        "Hi!", "gpt",
    ))]));
    engine.submit("Hello").unwrap().await.unwrap();

    let call = engine.start_voice_call();
    call.sender
        .send(VoiceEvent::final_transcript(Role::User, "Hello", Utc::now()))
        .unwrap();
    let summary = call.stop().await.unwrap();

    assert_eq!(summary.rejected, 1);
    assert_eq!(engine.active_session().unwrap().messages.len(), 2);
}

#[tokio::test]
async fn test_reemitted_late_final_is_rejected_after_clamp() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());
    engine.submit("typed first").unwrap().await.unwrap();
    let late = Utc::now() - Duration::seconds(30);

    let call = engine.start_voice_call();
    tokio_test::assert_ok!(call
        .sender
        .send(VoiceEvent::final_transcript(Role::User, "spoken", late)));
    tokio_test::assert_ok!(call.sender.send(VoiceEvent::final_transcript(
        Role::User,
        "spoken",
        late + Duration::milliseconds(500),
    )));
    let summary = call.stop().await.unwrap();

    assert_eq!(summary.rejected, 1);
    let session = engine.active_session().unwrap();
    let spoken: Vec<_> = session
        .messages
        .iter()
        .filter(|m| m.content == "spoken")
        .collect();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].origin_time(), late);
    assert!(session
        .messages
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn test_untagged_voice_reply_inherits_text_model() {
    let (engine, _sink) = engine_with_voice_llm(
        ScriptedBackend::new(vec![Ok(QueryReply::new("Bonjour!", "claude"))]),
        "",
    );
    engine.refresh_voice_settings().await;
    engine.submit("Say hello").unwrap().await.unwrap();

    let t = Utc::now();
    let call = engine.start_voice_call();
    tokio_test::assert_ok!(call
        .sender
        .send(VoiceEvent::final_transcript(Role::User, "And goodbye?", t)));
    tokio_test::assert_ok!(call.sender.send(VoiceEvent::final_transcript(
        Role::Assistant,
        "Au revoir!",
        t + Duration::milliseconds(200),
    )));
    call.stop().await.unwrap();

    let session = engine.active_session().unwrap();
    let reply = session.messages.last().unwrap();
    assert_eq!(reply.content, "Au revoir!");
    assert_eq!(reply.llm.as_deref(), Some("claude"));
}

#[tokio::test]
async fn test_partials_never_enter_the_session() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());

    let call = engine.start_voice_call();
    call.sender.send(VoiceEvent::SessionStart).unwrap();
    call.sender
        .send(VoiceEvent::partial_transcript(Role::User, "Wha"))
        .unwrap();
    call.sender
        .send(VoiceEvent::partial_transcript(Role::User, "What time"))
        .unwrap();
    let summary = call.stop().await.unwrap();

    assert_eq!(summary.indicators.transcript, "What time");
    assert!(!summary.indicators.listening);
    let session = engine.active_session().unwrap();
    assert!(session.messages.is_empty());
    assert_eq!(session.title, "New chat");
}

#[tokio::test]
async fn test_first_voice_message_sets_title() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());

    let call = engine.start_voice_call();
    call.sender
        .send(VoiceEvent::final_transcript(
            Role::User,
            "Book a table for two tonight at eight please",
            Utc::now(),
        ))
        .unwrap();
    call.stop().await.unwrap();

    assert_eq!(
        engine.active_session().unwrap().title,
        "Book a table for two tonight a..."
    );
}

#[tokio::test]
async fn test_stop_applies_queued_events_then_closes_stream() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());
    let t = Utc::now();

    let call = engine.start_voice_call();
    let sender = call.sender.clone();
    for i in 0..5 {
        sender
            .send(VoiceEvent::final_transcript(
                Role::User,
                format!("turn {i}"),
                t + Duration::seconds(i),
            ))
            .unwrap();
    }
    let summary = call.stop().await.unwrap();

    assert_eq!(summary.ended_by, CallEnd::Stopped);
    assert_eq!(summary.history.len(), 5);
    let contents: Vec<_> = engine
        .active_session()
        .unwrap()
        .messages
        .iter()
        .map(|m| m.content.clone())
        .collect();
    assert_eq!(contents, vec!["turn 0", "turn 1", "turn 2", "turn 3", "turn 4"]);

    assert!(sender.is_closed());
    assert!(sender.send(VoiceEvent::SessionStart).is_err());
}

#[tokio::test]
async fn test_transport_error_ends_call() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());
    let mut rx = engine.subscribe();

    let call = engine.start_voice_call();
    call.sender.send(VoiceEvent::SessionStart).unwrap();
    call.sender
        .send(VoiceEvent::Error {
            message: "socket closed".to_string(),
        })
        .unwrap();
    call.sender
        .send(VoiceEvent::final_transcript(Role::User, "late", Utc::now()))
        .ok();
    let summary = call.join().await.unwrap();

    assert_eq!(summary.ended_by, CallEnd::Failed);
    assert!(!summary.indicators.listening);
    assert_eq!(
        summary.indicators.error.as_deref(),
        Some("Voice input error. Please try again.")
    );
    assert!(engine.active_session().unwrap().messages.is_empty());

    let events = drain_events(&mut rx);
    assert!(events.contains(&EngineEvent::VoiceError {
        message: "Voice input error. Please try again.".to_string()
    }));
    assert_eq!(
        events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::VoiceListening { listening } => Some(*listening),
                _ => None,
            })
            .last(),
        Some(false)
    );
}

#[tokio::test]
async fn test_session_end_finishes_call() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());

    let call = engine.start_voice_call();
    call.sender.send(VoiceEvent::SessionStart).unwrap();
    call.sender.send(VoiceEvent::SpeechStart).unwrap();
    call.sender.send(VoiceEvent::SessionEnd).unwrap();
    let summary = call.join().await.unwrap();

    assert_eq!(summary.ended_by, CallEnd::SessionEnded);
    assert!(!summary.indicators.listening);
    assert!(!summary.indicators.speaking);
}

#[tokio::test]
async fn test_call_stays_bound_to_starting_session() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());
    let first = engine.active_session().unwrap().id;

    let call = engine.start_voice_call();
    assert_eq!(call.session_id(), first);
    let second = engine.new_chat();

    call.sender
        .send(VoiceEvent::final_transcript(Role::User, "still here", Utc::now()))
        .unwrap();
    call.stop().await.unwrap();

    assert_eq!(engine.registry().session(first).unwrap().messages.len(), 1);
    assert!(engine.registry().session(second).unwrap().messages.is_empty());
}

#[tokio::test]
async fn test_pairs_latest_user_turn_with_reply() {
    let (engine, sink) = engine_with(ScriptedBackend::default());
    engine.refresh_voice_settings().await;
    let t = Utc::now();

    let call = engine.start_voice_call();
    let events = [
        VoiceEvent::final_transcript(Role::User, "What is the weather?", t),
        VoiceEvent::final_transcript(Role::User, "In Paris", t + Duration::seconds(1)),
        VoiceEvent::final_transcript(Role::Assistant, "Sunny.", t + Duration::seconds(2)),
        VoiceEvent::final_transcript(Role::Assistant, "Anything else?", t + Duration::seconds(3)),
    ];
    for event in events {
        call.sender.send(event).unwrap();
    }
    let summary = call.stop().await.unwrap();

    assert_eq!(summary.pairs_logged, 1);
    assert_eq!(
        *sink.pairs.lock(),
        vec![("In Paris".to_string(), "Sunny.".to_string())]
    );

    let session = engine.active_session().unwrap();
    assert_eq!(session.messages.len(), 4);
    assert_eq!(session.messages[2].llm.as_deref(), Some("claude"));
    assert!(session.messages[0].llm.is_none());
}

#[tokio::test]
async fn test_late_voice_timestamp_keeps_order() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());
    engine.submit("typed first").unwrap().await.unwrap();

    let call = engine.start_voice_call();
    call.sender
        .send(VoiceEvent::final_transcript(
            Role::User,
            "spoken earlier",
            Utc::now() - Duration::seconds(30),
        ))
        .unwrap();
    call.stop().await.unwrap();

    let session = engine.active_session().unwrap();
    assert_eq!(session.messages.len(), 3);
    assert!(session
        .messages
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn test_assistant_options_follow_refreshed_settings() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());
    let before = engine.assistant_options();
    assert_eq!(before.model.provider, "openai");
    assert!(before
        .system_prompt()
        .contains("This is a placeholder context."));

    let settings = engine.refresh_voice_settings().await;
    assert_eq!(settings.llm, "claude");

    engine.set_voice_id("21m00Tcm4TlvDq8ikWAM");
    let options = engine.assistant_options();
    assert_eq!(options.model.provider, "anthropic");
    assert_eq!(options.voice.voice_id, "21m00Tcm4TlvDq8ikWAM");
    assert!(options.system_prompt().contains("Team handbook"));
}

#[tokio::test]
async fn test_select_voice_by_name_or_id() {
    let (engine, _sink) = engine_with(ScriptedBackend::default());

    let voice = engine.select_voice("rachel").unwrap();
    assert_eq!(voice.id, "21m00Tcm4TlvDq8ikWAM");
    assert_eq!(engine.assistant_options().voice.voice_id, voice.id);

    let err = engine.select_voice("nobody").unwrap_err();
    assert!(matches!(err, contextllm_core::Error::NotFound(_)));
    assert!(engine.select_voice("  ").is_err());
    assert_eq!(engine.voice_settings().voice_id, "21m00Tcm4TlvDq8ikWAM");
}
