//! Document indexing orchestrator.
//!
//! The [`DocumentIndexer`] turns an uploaded document into stored,
//! page-tagged chunks with embeddings: read bytes → extract text → chunk
//! pages → embed in batches → replace the document's chunk list.
//!
//! # Example
//!
//! ```rust,ignore
//! use coursemate_rag::{DocumentIndexer, InMemoryDocumentStore, RagConfig, SniffingExtractor};
//!
//! let indexer = Arc::new(
//!     DocumentIndexer::builder()
//!         .config(RagConfig::default())
//!         .embedding_provider(Arc::new(my_embedder))
//!         .document_store(store.clone())
//!         .text_extractor(Arc::new(SniffingExtractor))
//!         .build()?,
//! );
//!
//! // Fire and forget; the document record carries the outcome.
//! indexer.spawn(document.id.clone(), document.source.clone(), None);
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::chunking::PageChunker;
use crate::config::RagConfig;
use crate::document::{DocumentId, IndexOutcome};
use crate::embedding::{BatchEmbedder, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::extract::TextExtractor;
use crate::fetch::{SourceFetcher, is_remote, read_local};
use crate::store::DocumentStore;

/// Indexes documents into a [`DocumentStore`].
///
/// At most one indexing run per document is in flight at a time; a second
/// request for the same document fails with [`RagError::AlreadyIndexing`]
/// without touching the store. Construct one via [`DocumentIndexer::builder()`].
pub struct DocumentIndexer {
    config: RagConfig,
    chunker: PageChunker,
    embedder: BatchEmbedder,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    document_store: Arc<dyn DocumentStore>,
    text_extractor: Arc<dyn TextExtractor>,
    source_fetcher: Option<Arc<dyn SourceFetcher>>,
    in_flight: Mutex<HashSet<DocumentId>>,
}

/// Removes a document from the in-flight set when dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<DocumentId>>,
    document_id: DocumentId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.document_id);
    }
}

impl DocumentIndexer {
    /// Create a new [`DocumentIndexerBuilder`].
    pub fn builder() -> DocumentIndexerBuilder {
        DocumentIndexerBuilder::default()
    }

    /// Return a reference to the indexer configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Whether an indexing run for `document_id` is currently in flight.
    pub fn is_indexing(&self, document_id: &str) -> bool {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).contains(document_id)
    }

    fn begin(&self, document_id: &str) -> Result<InFlightGuard<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(document_id.to_string()) {
            return Err(RagError::AlreadyIndexing(document_id.to_string()));
        }
        Ok(InFlightGuard { in_flight: &self.in_flight, document_id: document_id.to_string() })
    }

    /// Index a document and atomically replace its chunk list.
    ///
    /// `bytes` short-circuits reading from `source`. Individual embedding
    /// failures only drop their own chunk; every other failure is recorded
    /// on the document as its processing error and returned.
    ///
    /// # Errors
    ///
    /// - [`RagError::AlreadyIndexing`] if the document is being indexed.
    /// - [`RagError::Fetch`] if the bytes cannot be read.
    /// - [`RagError::Extraction`] if no text can be extracted.
    /// - Any store error from writing the chunk list.
    #[instrument(skip_all, fields(document.id = %document_id))]
    pub async fn index(
        &self,
        document_id: &str,
        source: &str,
        bytes: Option<Vec<u8>>,
    ) -> Result<IndexOutcome> {
        let _guard = self.begin(document_id)?;

        match self.run(document_id, source, bytes).await {
            Ok(outcome) => {
                info!(
                    chunk_count = outcome.chunk_count,
                    total_pages = outcome.total_pages,
                    dropped = outcome.dropped,
                    "indexed document"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "indexing failed");
                if let Err(store_err) =
                    self.document_store.set_document_error(document_id, &e.to_string()).await
                {
                    error!(error = %store_err, "failed to record processing error");
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        document_id: &str,
        source: &str,
        bytes: Option<Vec<u8>>,
    ) -> Result<IndexOutcome> {
        // 1. Read the raw bytes
        let bytes = match bytes {
            Some(bytes) => bytes,
            None => self.read_source(source).await?,
        };

        // 2. Extract text
        let extracted = self.text_extractor.extract(&bytes).await?;
        if extracted.is_blank() {
            return Err(RagError::Extraction("document contains no extractable text".to_string()));
        }
        let total_pages = extracted.page_count;

        // 3. Chunk page by page
        let candidates = self.chunker.chunk_pages(&extracted.text, total_pages);
        info!(total_pages, candidate_count = candidates.len(), "chunked document");

        // 4. Embed in rate-limited batches
        let embedded =
            self.embedder.embed_all(self.embedding_provider.as_ref(), candidates).await;
        if embedded.chunks.is_empty() {
            warn!(dropped = embedded.failures, "no chunks survived embedding");
        }

        // 5. Replace the chunk list in one write
        let chunk_count = embedded.chunks.len();
        self.document_store
            .update_document_chunks(document_id, embedded.chunks, total_pages)
            .await?;

        Ok(IndexOutcome { success: true, chunk_count, total_pages, dropped: embedded.failures })
    }

    async fn read_source(&self, source: &str) -> Result<Vec<u8>> {
        if is_remote(source) {
            let fetcher = self.source_fetcher.as_ref().ok_or_else(|| {
                RagError::Fetch(format!("no source fetcher configured for {source}"))
            })?;
            fetcher.fetch(source).await
        } else {
            read_local(source).await
        }
    }

    /// Run [`index`](Self::index) on the tokio runtime.
    ///
    /// The handle may be dropped; the outcome is then observable only
    /// through the document record and the logs.
    pub fn spawn(
        self: &Arc<Self>,
        document_id: impl Into<String>,
        source: impl Into<String>,
        bytes: Option<Vec<u8>>,
    ) -> JoinHandle<Result<IndexOutcome>> {
        let indexer = Arc::clone(self);
        let document_id = document_id.into();
        let source = source.into();
        tokio::spawn(async move { indexer.index(&document_id, &source, bytes).await })
    }
}

/// Builder for constructing a [`DocumentIndexer`].
///
/// All fields except `source_fetcher` are required. Without a fetcher,
/// remote sources fail with [`RagError::Fetch`].
#[derive(Default)]
pub struct DocumentIndexerBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    document_store: Option<Arc<dyn DocumentStore>>,
    text_extractor: Option<Arc<dyn TextExtractor>>,
    source_fetcher: Option<Arc<dyn SourceFetcher>>,
}

impl DocumentIndexerBuilder {
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    pub fn document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.document_store = Some(store);
        self
    }

    pub fn text_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.text_extractor = Some(extractor);
        self
    }

    /// Set the fetcher used for `http(s)://` sources.
    pub fn source_fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.source_fetcher = Some(fetcher);
        self
    }

    /// Build the [`DocumentIndexer`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<DocumentIndexer> {
        let config =
            self.config.ok_or_else(|| RagError::Config("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let document_store = self
            .document_store
            .ok_or_else(|| RagError::Config("document_store is required".to_string()))?;
        let text_extractor = self
            .text_extractor
            .ok_or_else(|| RagError::Config("text_extractor is required".to_string()))?;

        Ok(DocumentIndexer {
            chunker: PageChunker::from_config(&config)?,
            embedder: BatchEmbedder::from_config(&config)?,
            config,
            embedding_provider,
            document_store,
            text_extractor,
            source_fetcher: self.source_fetcher,
            in_flight: Mutex::new(HashSet::new()),
        })
    }
}
