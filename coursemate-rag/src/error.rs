//! Error types for the `coursemate-rag` crate.

use thiserror::Error;

/// Errors that can occur while indexing or retrieving documents.
#[derive(Debug, Error)]
pub enum RagError {
    /// The remote (or local) source of a document could not be read.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Text extraction produced no usable text or failed outright.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// An upstream embedding call failed.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingProvider {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// None of the candidate documents has any scorable chunk yet.
    #[error("No processed chunks available. Please wait for document processing to complete.")]
    NoContent,

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An error in the document or review store backend.
    #[error("Store error ({backend}): {message}")]
    Store {
        /// The store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A referenced document does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Another indexing run for the same document is still in flight.
    #[error("Document {0} is already being indexed")]
    AlreadyIndexing(String),

    /// An upstream text-generation call failed.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    #[cfg(any(feature = "gemini", feature = "openai"))]
    pub(crate) fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingProvider { provider: provider.into(), message: message.into() }
    }

    #[cfg(feature = "postgres")]
    pub(crate) fn store(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store { backend: backend.into(), message: message.into() }
    }
}

/// A convenience result type for indexing and retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
