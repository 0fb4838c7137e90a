//! Configuration for indexing and retrieval.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunking::{MIN_CHUNK_CHARS, PAGE_CHUNK_OVERLAP, PAGE_CHUNK_SIZE};
use crate::error::{RagError, Result};

/// Default number of chunks embedded concurrently per batch.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 5;

/// Default pause between embedding batches, in milliseconds.
pub const DEFAULT_EMBED_BATCH_DELAY_MS: u64 = 1000;

/// Default number of chunks returned by a retrieval.
pub const DEFAULT_TOP_K: usize = 5;

/// Tunables shared by the indexer and the retriever.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters when chunking a single page.
    pub page_chunk_size: usize,
    /// Characters each page chunk repeats from the end of the previous one.
    pub page_chunk_overlap: usize,
    /// Trimmed chunks shorter than this are discarded.
    pub min_chunk_chars: usize,
    /// Number of embedding requests issued concurrently.
    pub embed_batch_size: usize,
    /// Pause between embedding batches, in milliseconds.
    pub embed_batch_delay_ms: u64,
    /// Number of results returned by [`Retriever::retrieve_default`](crate::Retriever::retrieve_default).
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            page_chunk_size: PAGE_CHUNK_SIZE,
            page_chunk_overlap: PAGE_CHUNK_OVERLAP,
            min_chunk_chars: MIN_CHUNK_CHARS,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            embed_batch_delay_ms: DEFAULT_EMBED_BATCH_DELAY_MS,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// The pause between embedding batches.
    pub fn embed_batch_delay(&self) -> Duration {
        Duration::from_millis(self.embed_batch_delay_ms)
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `page_chunk_size == 0`
    /// - `page_chunk_overlap >= page_chunk_size`
    /// - `embed_batch_size == 0`
    /// - `top_k == 0`
    pub fn validate(&self) -> Result<()> {
        if self.page_chunk_size == 0 {
            return Err(RagError::Config("page_chunk_size must be greater than zero".to_string()));
        }
        if self.page_chunk_overlap >= self.page_chunk_size {
            return Err(RagError::Config(format!(
                "page_chunk_overlap ({}) must be less than page_chunk_size ({})",
                self.page_chunk_overlap, self.page_chunk_size
            )));
        }
        if self.embed_batch_size == 0 {
            return Err(RagError::Config("embed_batch_size must be greater than zero".to_string()));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the per-page chunk size in characters.
    pub fn page_chunk_size(mut self, size: usize) -> Self {
        self.config.page_chunk_size = size;
        self
    }

    /// Set the per-page chunk overlap in characters.
    pub fn page_chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.page_chunk_overlap = overlap;
        self
    }

    /// Set the minimum trimmed chunk length.
    pub fn min_chunk_chars(mut self, chars: usize) -> Self {
        self.config.min_chunk_chars = chars;
        self
    }

    /// Set how many embedding requests run concurrently.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Set the pause between embedding batches.
    pub fn embed_batch_delay(mut self, delay: Duration) -> Self {
        self.config.embed_batch_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the default number of retrieval results.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
