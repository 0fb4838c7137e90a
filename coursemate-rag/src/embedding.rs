//! Embedding provider trait and the batched, rate-limited embedding driver.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::RagConfig;
use crate::document::{Chunk, ChunkCandidate};
use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends (Gemini, OpenAI, etc.)
/// behind a uniform async interface and map every provider-specific
/// response shape into a plain `Vec<f32>` before returning. Upstream
/// failures surface as [`RagError::EmbeddingProvider`]; a provider must
/// never substitute a zero vector for a failed call.
///
/// # Example
///
/// ```rust,ignore
/// use coursemate_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Short provider name used in logs and errors.
    fn name(&self) -> &str {
        "embedding"
    }
}

/// Chunks that were embedded successfully, plus how many were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedBatch {
    /// Successfully embedded chunks, in candidate order.
    pub chunks: Vec<Chunk>,
    /// Number of candidates whose embedding call failed.
    pub failures: usize,
}

/// Embeds chunk candidates in fixed-size concurrent batches.
///
/// Every request in a batch is issued at once and the batch waits for all
/// of them to settle. The driver then pauses for `batch_delay` before the
/// next batch to stay under upstream rate limits; there is no pause after
/// the last batch. A failed request drops only its own chunk.
#[derive(Debug, Clone, Copy)]
pub struct BatchEmbedder {
    batch_size: usize,
    batch_delay: Duration,
}

impl BatchEmbedder {
    /// Create a new driver.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `batch_size` is zero.
    pub fn new(batch_size: usize, batch_delay: Duration) -> Result<Self> {
        if batch_size == 0 {
            return Err(RagError::Config("embed batch size must be greater than zero".to_string()));
        }
        Ok(Self { batch_size, batch_delay })
    }

    /// Build a driver from the batch settings in `config`.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.embed_batch_size, config.embed_batch_delay())
    }

    /// Embed every candidate, dropping those whose embedding call fails.
    pub async fn embed_all(
        &self,
        provider: &dyn EmbeddingProvider,
        candidates: Vec<ChunkCandidate>,
    ) -> EmbeddedBatch {
        let total = candidates.len();
        let mut embedded = EmbeddedBatch { chunks: Vec::with_capacity(total), failures: 0 };
        let mut processed = 0usize;

        let mut remaining = candidates.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<ChunkCandidate> = remaining.by_ref().take(self.batch_size).collect();
            debug!(provider = provider.name(), batch_size = batch.len(), "embedding batch");

            let results = join_all(batch.iter().map(|c| provider.embed(&c.text))).await;

            for (candidate, result) in batch.into_iter().zip(results) {
                match result {
                    Ok(embedding) if !embedding.is_empty() => {
                        embedded.chunks.push(candidate.with_embedding(embedding));
                        processed += 1;
                        if processed % 10 == 0 {
                            info!(processed, total, "embedding progress");
                        }
                    }
                    Ok(_) => {
                        warn!(
                            provider = provider.name(),
                            page_number = candidate.page_number,
                            "provider returned an empty embedding, dropping chunk"
                        );
                        embedded.failures += 1;
                    }
                    Err(e) => {
                        warn!(
                            provider = provider.name(),
                            page_number = candidate.page_number,
                            error = %e,
                            "embedding failed, dropping chunk"
                        );
                        embedded.failures += 1;
                    }
                }
            }

            if remaining.peek().is_some() && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        embedded
    }
}

impl Default for BatchEmbedder {
    fn default() -> Self {
        let config = RagConfig::default();
        Self { batch_size: config.embed_batch_size, batch_delay: config.embed_batch_delay() }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::Instant;

    use super::*;

    /// Records the time each call arrives and fails texts containing "fail".
    struct RecordingProvider {
        calls: Mutex<Vec<Instant>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl RecordingProvider {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for RecordingProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.lock().unwrap().push(Instant::now());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if text.contains("fail") {
                return Err(RagError::EmbeddingProvider {
                    provider: "recording".into(),
                    message: "rate limited".into(),
                });
            }
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn candidates(texts: &[&str]) -> Vec<ChunkCandidate> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| ChunkCandidate { text: t.to_string(), page_number: i + 1 })
            .collect()
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(BatchEmbedder::new(0, Duration::ZERO).is_err());
    }

    #[tokio::test]
    async fn failed_items_are_dropped_and_order_is_kept() {
        let provider = RecordingProvider::new();
        let embedder = BatchEmbedder::new(2, Duration::ZERO).unwrap();

        let result =
            embedder.embed_all(&provider, candidates(&["one", "fail", "three", "four"])).await;

        assert_eq!(result.failures, 1);
        let pages: Vec<usize> = result.chunks.iter().map(|c| c.page_number).collect();
        assert_eq!(pages, vec![1, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_only_between_batches() {
        let provider = RecordingProvider::new();
        let embedder = BatchEmbedder::new(2, Duration::from_secs(1)).unwrap();
        let start = Instant::now();

        let result = embedder.embed_all(&provider, candidates(&["a", "b", "c", "d", "e"])).await;

        assert_eq!(result.chunks.len(), 5);
        let offsets: Vec<u64> =
            provider.calls.lock().unwrap().iter().map(|t| (*t - start).as_secs()).collect();
        assert_eq!(offsets, vec![0, 0, 1, 1, 2]);
        // Two pauses for three batches, none after the last.
        assert_eq!((Instant::now() - start).as_secs(), 2);
    }

    #[tokio::test]
    async fn requests_within_a_batch_run_concurrently() {
        let provider = RecordingProvider::new();
        let embedder = BatchEmbedder::new(5, Duration::ZERO).unwrap();

        embedder.embed_all(&provider, candidates(&["a", "b", "c", "d", "e", "f"])).await;

        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 5);
    }
}
