//! Event routing integration tests

use std::sync::Arc;

use async_trait::async_trait;

use salescall_config::Settings;
use salescall_core::{CallEndStatus, InboundEvent, OutboundEvent};
use salescall_integrations::{RecordingCalendar, RecordingCrm};
use salescall_llm::ScriptedLlm;
use salescall_pipeline::{PipelineError, Transcriber};
use salescall_rag::SimpleEmbedder;
use salescall_server::{AppState, EventRouter, SessionRegistry};

struct FixedTranscriber(String);

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio: Vec<u8>) -> Result<String, PipelineError> {
        Ok(self.0.clone())
    }
}

fn router_with(llm: Arc<ScriptedLlm>) -> (EventRouter, Arc<RecordingCalendar>, Arc<RecordingCrm>) {
    let calendar = Arc::new(RecordingCalendar::new());
    let crm = Arc::new(RecordingCrm::new());
    let (state, _transcripts) = AppState::new(
        Settings::default(),
        llm,
        Arc::new(FixedTranscriber("hello".to_string())),
        calendar.clone(),
        crm.clone(),
        Arc::new(SimpleEmbedder::default()),
    );
    (EventRouter::new(state), calendar, crm)
}

#[tokio::test]
async fn concurrent_get_or_create_yields_one_session() {
    let registry = Arc::new(SessionRegistry::new("prompt", 100));

    let mut handles = Vec::new();
    for _ in 0..32 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry.get_or_create("CA-same").unwrap()
        }));
    }

    let mut sessions = Vec::new();
    for handle in handles {
        sessions.push(handle.await.unwrap());
    }

    assert_eq!(registry.count(), 1);
    for session in &sessions[1..] {
        assert!(Arc::ptr_eq(&sessions[0], session));
    }
}

#[tokio::test]
async fn call_start_greets_and_registers() {
    let llm = Arc::new(ScriptedLlm::new(vec![]));
    let (router, _, _) = router_with(llm);

    let event = router
        .handle(InboundEvent::CallStart { call_id: "CA1".into() })
        .await
        .unwrap()
        .unwrap();

    match event {
        OutboundEvent::Reply { call_id, is_terminal, .. } => {
            assert_eq!(call_id, "CA1");
            assert!(!is_terminal);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn utterance_round_trip() {
    let llm = Arc::new(ScriptedLlm::new(vec!["We build custom software."]));
    let (router, _, _) = router_with(llm);

    let event = router
        .handle(InboundEvent::Utterance {
            call_id: "CA1".into(),
            transcript_text: "what do you do?".into(),
        })
        .await
        .unwrap()
        .unwrap();

    match event {
        OutboundEvent::Reply { text, is_terminal, .. } => {
            assert_eq!(text, "We build custom software.");
            assert!(!is_terminal);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn knowledge_ingest_replaces_wholesale() {
    let llm = Arc::new(ScriptedLlm::new(vec![]));
    let (state, _transcripts) = AppState::new(
        Settings::default(),
        llm,
        Arc::new(FixedTranscriber("hello".to_string())),
        Arc::new(RecordingCalendar::new()),
        Arc::new(RecordingCrm::new()),
        Arc::new(SimpleEmbedder::default()),
    );
    let router = EventRouter::new(state.clone());

    router
        .handle(InboundEvent::KnowledgeIngest {
            chunks: vec!["We offer round-the-clock support.".into()],
            source_label: "support.pdf".into(),
        })
        .await
        .unwrap();
    assert_eq!(state.knowledge.snapshot().len(), 1);

    // The swap is wholesale: a second ingest replaces the first
    router
        .handle(InboundEvent::KnowledgeIngest {
            chunks: vec![
                "Pricing starts at a flat monthly rate.".into(),
                "Contracts are yearly.".into(),
            ],
            source_label: "pricing.pdf".into(),
        })
        .await
        .unwrap();

    let snapshot = state.knowledge.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.row(0).unwrap().2, "pricing.pdf");
}

#[tokio::test]
async fn call_end_reports_summary_and_evicts() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        "Happy to help.",
        "Caller asked about services, no commitment.\nOutcome: [Rejected]",
    ]));
    let (router, calendar, crm) = router_with(llm);

    router
        .handle(InboundEvent::Utterance {
            call_id: "CA1".into(),
            transcript_text: "what do you do?".into(),
        })
        .await
        .unwrap();

    let event = router
        .handle(InboundEvent::CallEnd { call_id: "CA1".into() })
        .await
        .unwrap()
        .unwrap();

    match event {
        OutboundEvent::CallEnded { status, summary, .. } => {
            assert_eq!(status, CallEndStatus::Success);
            assert!(summary.contains("no commitment"));
        }
        other => panic!("unexpected event: {:?}", other),
    }

    // No booking details were captured, so no external actions fired
    assert_eq!(calendar.invocations(), 0);
    assert_eq!(crm.invocations(), 0);

    // A second call end hits an evicted session
    let event = router
        .handle(InboundEvent::CallEnd { call_id: "CA1".into() })
        .await
        .unwrap()
        .unwrap();
    match event {
        OutboundEvent::CallEnded { status, .. } => assert_eq!(status, CallEndStatus::Error),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn audio_frames_become_turns() {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    let llm = Arc::new(ScriptedLlm::new(vec!["Thanks, noted."]));
    let calendar = Arc::new(RecordingCalendar::new());
    let crm = Arc::new(RecordingCrm::new());

    let mut settings = Settings::default();
    settings.audio.flush_threshold_bytes = 8;

    let (state, transcripts) = AppState::new(
        settings,
        llm,
        Arc::new(FixedTranscriber("I need a mobile app".to_string())),
        calendar,
        crm,
        Arc::new(SimpleEmbedder::default()),
    );
    let router = EventRouter::new(state);

    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::channel(8);
    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::channel(8);
    tokio::spawn(router.run(inbound_rx, transcripts, outbound_tx));

    inbound_tx
        .send(InboundEvent::AudioFrame {
            call_id: "CA1".into(),
            audio_bytes_base64: BASE64.encode([0u8; 16]),
        })
        .await
        .unwrap();

    // The frame crosses the threshold, transcribes, and produces a turn
    let event = tokio::time::timeout(std::time::Duration::from_secs(2), outbound_rx.recv())
        .await
        .unwrap()
        .unwrap();

    match event {
        OutboundEvent::Reply { call_id, text, .. } => {
            assert_eq!(call_id, "CA1");
            assert_eq!(text, "Thanks, noted.");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}
