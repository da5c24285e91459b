//! Application state
//!
//! Wires the collaborators into the core components and shares them
//! across the transport's handlers.

use std::sync::Arc;
use std::time::Duration;

use salescall_agent::{
    ConversationEngine, EngineConfig, LifecycleCoordinator, SummaryConfig, SummaryGenerator,
};
use salescall_config::Settings;
use salescall_core::WorkerPool;
use salescall_integrations::{CalendarIntegration, CrmIntegration};
use salescall_llm::{sales_system_prompt, LlmClient};
use salescall_pipeline::{AudioIngestPipeline, Transcriber, Transcript};
use salescall_rag::{Embedder, KnowledgeStore, Retriever};

use crate::session::SessionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub registry: Arc<SessionRegistry>,
    pub engine: Arc<ConversationEngine>,
    pub lifecycle: Arc<LifecycleCoordinator>,
    pub pipeline: Arc<AudioIngestPipeline>,
    pub knowledge: Arc<KnowledgeStore>,
    pub embedder: Arc<dyn Embedder>,
}

impl AppState {
    /// Build the full component graph from settings and collaborators.
    ///
    /// Returns the state plus the transcript stream the event router
    /// feeds back into the engine.
    pub fn new(
        config: Settings,
        llm: Arc<dyn LlmClient>,
        transcriber: Arc<dyn Transcriber>,
        calendar: Arc<dyn CalendarIntegration>,
        crm: Arc<dyn CrmIntegration>,
        embedder: Arc<dyn Embedder>,
    ) -> (Self, tokio::sync::mpsc::Receiver<Transcript>) {
        let knowledge = Arc::new(KnowledgeStore::new());
        let retriever = Arc::new(Retriever::new(knowledge.clone(), embedder.clone()));

        let system_prompt = sales_system_prompt(&config.company);
        let registry = Arc::new(SessionRegistry::with_config(
            system_prompt,
            config.session.max_sessions,
            Duration::from_secs(config.session.timeout_seconds),
            Duration::from_secs(config.session.cleanup_interval_seconds),
        ));

        let engine = Arc::new(ConversationEngine::new(
            llm.clone(),
            retriever,
            EngineConfig {
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
                retrieval_top_k: config.retrieval.top_k,
                llm_pool_size: config.llm.worker_pool_size,
            },
        ));

        let lifecycle = Arc::new(LifecycleCoordinator::new(
            SummaryGenerator::new(
                llm,
                WorkerPool::new(config.llm.worker_pool_size),
                SummaryConfig {
                    temperature: config.llm.summary_temperature,
                    max_tokens: config.llm.summary_max_tokens,
                },
            ),
            calendar,
            crm,
        ));

        let (pipeline, transcript_rx) = AudioIngestPipeline::new(
            transcriber,
            config.audio.flush_threshold_bytes,
            config.audio.worker_pool_size,
        );

        (
            Self {
                config: Arc::new(config),
                registry,
                engine,
                lifecycle,
                pipeline: Arc::new(pipeline),
                knowledge,
                embedder,
            },
            transcript_rx,
        )
    }
}
