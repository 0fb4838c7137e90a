//! # coursemate-rag
//!
//! Document indexing and retrieval for Coursemate: course PDFs and resumes
//! are split into page-tagged chunks, embedded through a pluggable
//! provider, and ranked against questions by cosine similarity.
//!
//! ## Overview
//!
//! - [`PageChunker`] / [`FixedSizeChunker`] - character-window chunking with
//!   approximate page numbers
//! - [`BatchEmbedder`] - rate-limited, concurrent embedding in batches
//! - [`DocumentIndexer`] - fetch → extract → chunk → embed → store, run in
//!   the background with [`DocumentIndexer::spawn`]
//! - [`Retriever`] - top-K chunks across a set of documents
//! - [`ReviewContextAssembler`] - retrieval plus the latest resume review
//! - [`context`] - page-citing prompts and citations
//! - [`ChatHistoryStore`] - per-document chat transcripts
//!
//! ## Feature flags
//!
//! | Feature | Enables |
//! |---------|---------|
//! | `pdf` (default) | [`PdfTextExtractor`] via `pdf-extract` |
//! | `http` | [`HttpSourceFetcher`] for `http(s)://` sources |
//! | `gemini` | [`gemini::GeminiEmbeddingProvider`], [`gemini::GeminiTextGenerator`] |
//! | `openai` | [`openai::OpenAIEmbeddingProvider`], [`openai::OpenAITextGenerator`] |
//! | `postgres` | [`postgres::PostgresDocumentStore`] |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coursemate_rag::{DocumentIndexer, InMemoryDocumentStore, RagConfig, Retriever, SniffingExtractor};
//!
//! let store = Arc::new(InMemoryDocumentStore::new());
//! let embedder = Arc::new(coursemate_rag::gemini::GeminiEmbeddingProvider::from_env()?);
//!
//! let indexer = DocumentIndexer::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(embedder.clone())
//!     .document_store(store.clone())
//!     .text_extractor(Arc::new(SniffingExtractor))
//!     .build()?;
//! indexer.index(&document.id, &document.source, None).await?;
//!
//! let retriever = Retriever::new(RagConfig::default(), embedder, store);
//! let results = retriever.retrieve_default("What is a B-tree?", &[document.id]).await?;
//! ```

pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod generation;
pub mod history;
pub mod indexer;
pub mod inmemory;
pub mod retriever;
pub mod review;
pub mod store;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use chunking::{FixedSizeChunker, PageChunker, chunk_text, split_pages};
pub use config::{RagConfig, RagConfigBuilder};
pub use context::Citation;
pub use document::{
    Chunk, ChunkCandidate, Document, DocumentId, DocumentStatus, IndexOutcome, ResumeMetadata,
    RetrievalResult,
};
pub use embedding::{BatchEmbedder, EmbeddedBatch, EmbeddingProvider};
pub use error::{RagError, Result};
#[cfg(feature = "pdf")]
pub use extract::PdfTextExtractor;
pub use extract::{ExtractedText, PlainTextExtractor, SniffingExtractor, TextExtractor};
#[cfg(feature = "http")]
pub use fetch::HttpSourceFetcher;
pub use fetch::SourceFetcher;
pub use generation::TextGenerator;
pub use history::{ChatMessage, ChatRole};
pub use indexer::{DocumentIndexer, DocumentIndexerBuilder};
pub use inmemory::InMemoryDocumentStore;
pub use retriever::{Retriever, cosine_similarity};
pub use review::{AssembledContext, ReviewContextAssembler, ReviewSummary};
pub use store::{ChatHistoryStore, DocumentStore, ReviewStore};
