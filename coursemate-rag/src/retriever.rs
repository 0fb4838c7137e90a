//! Cosine-similarity retrieval over the chunks of selected documents.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::RagConfig;
use crate::document::RetrievalResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::store::DocumentStore;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Ranks the stored chunks of a set of documents against a query.
///
/// Every call does a full scan over the candidate documents' chunks; there
/// is no index and no caching.
pub struct Retriever {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    document_store: Arc<dyn DocumentStore>,
}

impl Retriever {
    pub fn new(
        config: RagConfig,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        document_store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self { config, embedding_provider, document_store }
    }

    /// Return a reference to the retriever configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the `top_k` chunks most similar to `query`, best first.
    ///
    /// Documents without chunks (still processing or failed) and chunks
    /// without embeddings are skipped. Ties keep store order.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmbeddingProvider`] if the query cannot be embedded.
    /// - [`RagError::NoContent`] if no chunk across the candidates could be
    ///   scored.
    #[instrument(skip_all, fields(document_count = document_ids.len(), top_k))]
    pub async fn retrieve(
        &self,
        query: &str,
        document_ids: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        // 1. Embed the query once
        let query_embedding = self.embedding_provider.embed(query).await?;

        // 2. Load the candidate documents
        let documents = self.document_store.get_documents_by_ids(document_ids).await?;

        // 3. Score every embedded chunk
        let mut scored = Vec::new();
        for document in &documents {
            if document.chunks.is_empty() {
                warn!(document.id = %document.id, "document has no processed chunks, skipping");
                continue;
            }
            for chunk in &document.chunks {
                let Some(embedding) = chunk.embedding.as_deref().filter(|e| !e.is_empty()) else {
                    continue;
                };
                if embedding.len() != query_embedding.len() {
                    debug!(
                        document.id = %document.id,
                        chunk_dims = embedding.len(),
                        query_dims = query_embedding.len(),
                        "embedding dimensions differ from query"
                    );
                }
                scored.push(RetrievalResult {
                    text: chunk.text.clone(),
                    page_number: chunk.page_number,
                    document_id: document.id.clone(),
                    document_title: document.title.clone(),
                    similarity: cosine_similarity(&query_embedding, embedding),
                });
            }
        }

        // 4. Nothing to rank
        if scored.is_empty() {
            return Err(RagError::NoContent);
        }

        // 5. Best first, ties in store order
        let scored_count = scored.len();
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(top_k);

        info!(scored_count, result_count = scored.len(), "retrieval completed");
        Ok(scored)
    }

    /// [`retrieve`](Self::retrieve) with the configured `top_k`.
    pub async fn retrieve_default(
        &self,
        query: &str,
        document_ids: &[String],
    ) -> Result<Vec<RetrievalResult>> {
        self.retrieve(query, document_ids, self.config.top_k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_direction_scores_one() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn opposite_direction_scores_minus_one() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-3.0, 0.0]);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_magnitude_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 1.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn mismatched_lengths_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
