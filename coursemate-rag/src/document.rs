//! Data types for documents, chunks, and retrieval results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque document identifier.
pub type DocumentId = String;

/// Generate a fresh document identifier.
pub fn new_document_id() -> DocumentId {
    uuid::Uuid::new_v4().to_string()
}

/// Candidate context supplied when a resume is uploaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResumeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

/// An uploaded document and the chunks produced by indexing it.
///
/// A document with `processing_error` set never carries chunks, and a
/// document with chunks never carries an error. Both are empty while
/// indexing is in flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    /// Owner. `None` for seeded documents shared with every user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub title: String,
    /// URL or local path the raw bytes can be read from.
    pub source: String,
    #[serde(default)]
    pub total_pages: Option<usize>,
    #[serde(default)]
    pub processing_error: Option<String>,
    #[serde(default)]
    pub is_seeded: bool,
    #[serde(default)]
    pub is_resume: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_metadata: Option<ResumeMetadata>,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Create a freshly uploaded document with no chunks yet.
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: new_document_id(),
            user_id: None,
            title: title.into(),
            source: source.into(),
            total_pages: None,
            processing_error: None,
            is_seeded: false,
            is_resume: false,
            resume_metadata: None,
            chunks: Vec::new(),
            uploaded_at: Utc::now(),
        }
    }

    /// Set the owning user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Mark the document as a resume with the given candidate context.
    pub fn as_resume(mut self, metadata: Option<ResumeMetadata>) -> Self {
        self.is_resume = true;
        self.resume_metadata = metadata;
        self
    }

    /// Derive the user-visible processing state.
    pub fn status(&self) -> DocumentStatus {
        match &self.processing_error {
            Some(message) => DocumentStatus::Failed { message: message.clone() },
            None if self.chunks.is_empty() => DocumentStatus::Processing,
            None => DocumentStatus::Ready,
        }
    }

    /// Whether `user_id` may read this document.
    pub fn is_visible_to(&self, user_id: &str) -> bool {
        self.is_seeded || self.user_id.as_deref() == Some(user_id)
    }
}

/// Processing state shown to users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DocumentStatus {
    /// No chunks and no error yet.
    Processing,
    /// Indexing failed with the stored message.
    Failed { message: String },
    /// Chunks are available for retrieval.
    Ready,
}

/// A page-tagged segment of a document's text with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// 1-based, approximate page number.
    pub page_number: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Whether this chunk carries a non-empty embedding.
    pub fn is_scorable(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// A chunk produced by the chunker, before embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkCandidate {
    pub text: String,
    pub page_number: usize,
}

impl ChunkCandidate {
    /// Attach an embedding, producing a storable [`Chunk`].
    pub fn with_embedding(self, embedding: Vec<f32>) -> Chunk {
        Chunk { text: self.text, page_number: self.page_number, embedding: Some(embedding) }
    }
}

/// A retrieved chunk paired with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pub text: String,
    pub page_number: usize,
    pub document_id: DocumentId,
    pub document_title: String,
    /// Cosine similarity; not clamped.
    pub similarity: f32,
}

/// Summary of one indexing run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexOutcome {
    pub success: bool,
    pub chunk_count: usize,
    pub total_pages: usize,
    /// Candidates dropped because their embedding call failed.
    pub dropped: usize,
}
