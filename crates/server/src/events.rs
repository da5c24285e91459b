//! Event routing
//!
//! Translates the typed transport events into engine, pipeline, and
//! lifecycle calls. A transport delivers [`InboundEvent`]s and speaks
//! whatever [`OutboundEvent`]s come back.

use salescall_core::{CallEndStatus, InboundEvent, OutboundEvent};
use salescall_pipeline::Transcript;
use salescall_rag::KnowledgeBase;

use crate::state::AppState;
use crate::ServerError;

/// Greeting spoken when a call connects
const GREETING: &str = "Hello! I'm calling from our company. Is this a good time to talk?";

/// Routes inbound transport events through the core
pub struct EventRouter {
    state: AppState,
}

impl EventRouter {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Handle one inbound event; the returned outbound event, if any,
    /// goes back to the transport.
    pub async fn handle(&self, event: InboundEvent) -> Result<Option<OutboundEvent>, ServerError> {
        match event {
            InboundEvent::CallStart { call_id } => {
                self.state.registry.get_or_create(&call_id)?;
                Ok(Some(OutboundEvent::Reply {
                    call_id,
                    text: GREETING.to_string(),
                    is_terminal: false,
                }))
            }

            InboundEvent::Utterance {
                call_id,
                transcript_text,
            } => {
                let reply = self.utterance(&call_id, &transcript_text).await?;
                Ok(Some(reply))
            }

            InboundEvent::AudioFrame {
                call_id,
                audio_bytes_base64,
            } => {
                // Make sure a session exists before audio accumulates
                self.state.registry.get_or_create(&call_id)?;
                if let Err(e) = self.state.pipeline.ingest(&call_id, &audio_bytes_base64) {
                    tracing::warn!(call_id = %call_id, "Dropping undecodable audio frame: {}", e);
                }
                Ok(None)
            }

            InboundEvent::CallEnd { call_id } => {
                let report = self.call_end(&call_id).await;
                Ok(Some(report))
            }

            InboundEvent::KnowledgeIngest {
                chunks,
                source_label,
            } => {
                let base = KnowledgeBase::from_chunks(
                    chunks,
                    &source_label,
                    self.state.embedder.as_ref(),
                );
                self.state.knowledge.replace(base);
                Ok(None)
            }
        }
    }

    async fn utterance(&self, call_id: &str, text: &str) -> Result<OutboundEvent, ServerError> {
        let session = self.state.registry.get_or_create(call_id)?;
        session.touch();

        // The conversation lock serializes turns for this call
        let mut convo = session.conversation().await;
        let reply = self.state.engine.handle_utterance(&mut convo, text).await;

        Ok(OutboundEvent::Reply {
            call_id: call_id.to_string(),
            text: reply.text,
            is_terminal: reply.is_terminal,
        })
    }

    async fn call_end(&self, call_id: &str) -> OutboundEvent {
        let Some(session) = self.state.registry.get(call_id) else {
            tracing::warn!(call_id, "Call end for unknown session");
            return OutboundEvent::CallEnded {
                call_id: call_id.to_string(),
                status: CallEndStatus::Error,
                summary: "No summary available.".to_string(),
            };
        };

        // Drain any audio still below the flush threshold
        self.state.pipeline.flush(call_id);

        let report = {
            let mut convo = session.conversation().await;
            self.state.lifecycle.on_call_end(&mut convo).await
        };

        self.state.registry.remove(call_id);

        OutboundEvent::CallEnded {
            call_id: call_id.to_string(),
            status: report.status,
            summary: report.summary,
        }
    }

    /// Pump loop: consumes inbound events and completed transcripts,
    /// emitting outbound events on the given channel. Runs until both
    /// inputs close.
    pub async fn run(
        self,
        mut inbound: tokio::sync::mpsc::Receiver<InboundEvent>,
        mut transcripts: tokio::sync::mpsc::Receiver<Transcript>,
        outbound: tokio::sync::mpsc::Sender<OutboundEvent>,
    ) {
        loop {
            tokio::select! {
                event = inbound.recv() => {
                    let Some(event) = event else { break };
                    self.emit(self.handle(event).await, &outbound).await;
                }
                transcript = transcripts.recv() => {
                    let Some(Transcript { call_id, text }) = transcript else { break };
                    let event = InboundEvent::Utterance {
                        call_id,
                        transcript_text: text,
                    };
                    self.emit(self.handle(event).await, &outbound).await;
                }
            }
        }
    }

    async fn emit(
        &self,
        result: Result<Option<OutboundEvent>, ServerError>,
        outbound: &tokio::sync::mpsc::Sender<OutboundEvent>,
    ) {
        match result {
            Ok(Some(event)) => {
                if outbound.send(event).await.is_err() {
                    tracing::warn!("Outbound channel closed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Event handling failed: {}", e),
        }
    }
}
