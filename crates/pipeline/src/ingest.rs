//! Per-call audio buffering and transcription offload

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use salescall_core::WorkerPool;

use crate::PipelineError;

/// Transcription collaborator contract.
///
/// May legitimately return empty text when nothing was recognized.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, PipelineError>;
}

/// A completed transcription for one buffered chunk
#[derive(Debug, Clone)]
pub struct Transcript {
    pub call_id: String,
    pub text: String,
}

/// Byte accumulator for one call's audio stream
pub struct AudioBuffer {
    bytes: Mutex<Vec<u8>>,
    threshold: usize,
}

impl AudioBuffer {
    pub fn new(threshold: usize) -> Self {
        Self {
            bytes: Mutex::new(Vec::new()),
            threshold,
        }
    }

    /// Append audio; when the buffered size crosses the threshold the
    /// whole buffer is swapped out and returned for transcription.
    pub fn push(&self, data: &[u8]) -> Option<Vec<u8>> {
        let mut bytes = self.bytes.lock();
        bytes.extend_from_slice(data);
        if bytes.len() > self.threshold {
            Some(std::mem::take(&mut *bytes))
        } else {
            None
        }
    }

    /// Drain whatever is buffered, possibly nothing.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.bytes.lock())
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }
}

/// Streaming audio ingestion pipeline
///
/// One buffer per call id. Full chunks go to the transcriber on the
/// worker pool; finished transcripts come out of the channel returned
/// by [`AudioIngestPipeline::new`]. A failed or empty transcription is
/// logged and skipped — the stream keeps flowing.
pub struct AudioIngestPipeline {
    transcriber: Arc<dyn Transcriber>,
    pool: WorkerPool,
    buffers: RwLock<HashMap<String, Arc<AudioBuffer>>>,
    transcript_tx: mpsc::Sender<Transcript>,
    flush_threshold: usize,
}

impl AudioIngestPipeline {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        flush_threshold: usize,
        pool_size: usize,
    ) -> (Self, mpsc::Receiver<Transcript>) {
        let (transcript_tx, transcript_rx) = mpsc::channel(64);
        (
            Self {
                transcriber,
                pool: WorkerPool::new(pool_size),
                buffers: RwLock::new(HashMap::new()),
                transcript_tx,
                flush_threshold,
            },
            transcript_rx,
        )
    }

    /// Ingest one base64-encoded frame.
    pub fn ingest(&self, call_id: &str, payload_base64: &str) -> Result<(), PipelineError> {
        let bytes = BASE64
            .decode(payload_base64.trim())
            .map_err(|e| PipelineError::Decode(e.to_string()))?;
        self.ingest_bytes(call_id, &bytes);
        Ok(())
    }

    /// Ingest raw audio bytes.
    pub fn ingest_bytes(&self, call_id: &str, bytes: &[u8]) {
        let buffer = self.buffer_for(call_id);
        if let Some(chunk) = buffer.push(bytes) {
            self.submit_chunk(call_id.to_string(), chunk);
        }
    }

    /// Flush a call's remaining audio and drop its buffer.
    ///
    /// Zero-byte tails are tolerated: nothing is submitted.
    pub fn flush(&self, call_id: &str) {
        let buffer = self.buffers.write().remove(call_id);
        if let Some(buffer) = buffer {
            let tail = buffer.take();
            if !tail.is_empty() {
                self.submit_chunk(call_id.to_string(), tail);
            }
        }
    }

    /// Bytes currently buffered for a call
    pub fn buffered_len(&self, call_id: &str) -> usize {
        self.buffers
            .read()
            .get(call_id)
            .map(|b| b.len())
            .unwrap_or(0)
    }

    fn buffer_for(&self, call_id: &str) -> Arc<AudioBuffer> {
        if let Some(buffer) = self.buffers.read().get(call_id) {
            return buffer.clone();
        }

        self.buffers
            .write()
            .entry(call_id.to_string())
            .or_insert_with(|| Arc::new(AudioBuffer::new(self.flush_threshold)))
            .clone()
    }

    fn submit_chunk(&self, call_id: String, chunk: Vec<u8>) {
        let transcriber = self.transcriber.clone();
        let tx = self.transcript_tx.clone();
        let size = chunk.len();

        self.pool.dispatch(async move {
            match transcriber.transcribe(chunk).await {
                Ok(text) => {
                    let text = text.trim().to_string();
                    if text.is_empty() {
                        tracing::debug!(call_id = %call_id, bytes = size, "Empty transcription, skipping turn");
                        return;
                    }
                    if tx.send(Transcript { call_id, text }).await.is_err() {
                        tracing::warn!("Transcript channel closed, dropping result");
                    }
                }
                Err(e) => {
                    tracing::warn!(call_id = %call_id, bytes = size, "Transcription failed: {}", e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::timeout;

    struct FixedTranscriber {
        text: String,
        calls: AtomicUsize,
    }

    impl FixedTranscriber {
        fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _audio: Vec<u8>) -> Result<String, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    struct FailingTranscriber;

    #[async_trait]
    impl Transcriber for FailingTranscriber {
        async fn transcribe(&self, _audio: Vec<u8>) -> Result<String, PipelineError> {
            Err(PipelineError::Transcription("model crashed".to_string()))
        }
    }

    #[test]
    fn test_buffer_swaps_past_threshold() {
        let buffer = AudioBuffer::new(10);

        assert!(buffer.push(&[0u8; 10]).is_none());
        let chunk = buffer.push(&[0u8; 5]).expect("threshold crossed");
        assert_eq!(chunk.len(), 15);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_buffer_zero_byte_take() {
        let buffer = AudioBuffer::new(10);
        assert!(buffer.take().is_empty());
    }

    #[tokio::test]
    async fn test_chunk_produces_transcript() {
        let transcriber = Arc::new(FixedTranscriber::new("hello there"));
        let (pipeline, mut rx) = AudioIngestPipeline::new(transcriber, 8, 2);

        pipeline.ingest_bytes("CA1", &[0u8; 16]);

        let transcript = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transcript.call_id, "CA1");
        assert_eq!(transcript.text, "hello there");
    }

    #[tokio::test]
    async fn test_empty_transcription_generates_no_turn() {
        let transcriber = Arc::new(FixedTranscriber::new("   "));
        let (pipeline, mut rx) = AudioIngestPipeline::new(transcriber, 8, 2);

        pipeline.ingest_bytes("CA1", &[0u8; 16]);

        let result = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_err(), "no transcript expected");
    }

    #[tokio::test]
    async fn test_failure_does_not_stall_pipeline() {
        let (pipeline, mut rx) = AudioIngestPipeline::new(Arc::new(FailingTranscriber), 8, 1);
        pipeline.ingest_bytes("CA1", &[0u8; 16]);

        // Swap the transcriber path by pushing through the same pool;
        // a prior failure must not block later chunks.
        let ok = Arc::new(FixedTranscriber::new("recovered"));
        let (pipeline_ok, mut rx_ok) = AudioIngestPipeline::new(ok, 8, 1);
        pipeline_ok.ingest_bytes("CA1", &[0u8; 16]);

        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
        let transcript = timeout(Duration::from_secs(1), rx_ok.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transcript.text, "recovered");
    }

    #[tokio::test]
    async fn test_flush_drains_tail() {
        let transcriber = Arc::new(FixedTranscriber::new("tail words"));
        let (pipeline, mut rx) = AudioIngestPipeline::new(transcriber.clone(), 1000, 2);

        pipeline.ingest_bytes("CA1", &[0u8; 100]);
        assert_eq!(pipeline.buffered_len("CA1"), 100);

        pipeline.flush("CA1");
        let transcript = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transcript.text, "tail words");
        assert_eq!(pipeline.buffered_len("CA1"), 0);

        // Flushing an unknown or empty call is a no-op
        pipeline.flush("CA1");
        pipeline.flush("CA404");
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ingest_decodes_base64() {
        let transcriber = Arc::new(FixedTranscriber::new("decoded"));
        let (pipeline, mut rx) = AudioIngestPipeline::new(transcriber, 4, 2);

        let payload = BASE64.encode([1u8, 2, 3, 4, 5, 6, 7, 8]);
        pipeline.ingest("CA1", &payload).unwrap();

        let transcript = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transcript.text, "decoded");

        assert!(pipeline.ingest("CA1", "not//valid--base64!!").is_err());
    }
}
