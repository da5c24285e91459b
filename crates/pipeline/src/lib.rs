//! Streaming audio ingestion
//!
//! Buffers inbound audio per call and hands full chunks to the
//! transcription collaborator on a bounded worker pool, so the ingest
//! path never waits on transcription.

pub mod ingest;

pub use ingest::{AudioBuffer, AudioIngestPipeline, Transcriber, Transcript};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Transcript channel closed")]
    ChannelClosed,
}

impl From<PipelineError> for salescall_core::Error {
    fn from(err: PipelineError) -> Self {
        salescall_core::Error::Pipeline(err.to_string())
    }
}
