//! Persistence traits for documents, resume reviews, and chat history.

use async_trait::async_trait;

use crate::document::{Chunk, Document};
use crate::error::Result;
use crate::history::ChatMessage;
use crate::review::ReviewSummary;

/// A storage backend for [`Document`] records and their chunk lists.
///
/// The chunk list of a document is only ever replaced wholesale, and a
/// replacement must be atomic: readers see either the previous list or
/// the new one, never a mix.
///
/// # Example
///
/// ```rust,ignore
/// use coursemate_rag::{DocumentStore, InMemoryDocumentStore};
///
/// let store = InMemoryDocumentStore::new();
/// store.insert_document(document).await?;
/// store.update_document_chunks(&id, chunks, 12).await?;
/// let docs = store.get_documents_by_ids(&[id]).await?;
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document (or replace one with the same id).
    async fn insert_document(&self, document: Document) -> Result<()>;

    /// Fetch a single document.
    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// Fetch every document whose id is in `ids`. Unknown ids are skipped.
    async fn get_documents_by_ids(&self, ids: &[String]) -> Result<Vec<Document>>;

    /// Documents owned by `user_id` plus seeded documents, newest first.
    async fn list_documents(&self, user_id: &str) -> Result<Vec<Document>>;

    /// Replace the chunk list and page count in one atomic update.
    ///
    /// Clears any previous processing error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`](crate::RagError::NotFound) if the document does not exist.
    async fn update_document_chunks(
        &self,
        id: &str,
        chunks: Vec<Chunk>,
        total_pages: usize,
    ) -> Result<()>;

    /// Record an indexing failure. Leaves the document without chunks.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`](crate::RagError::NotFound) if the document does not exist.
    async fn set_document_error(&self, id: &str, message: &str) -> Result<()>;

    /// Delete a document and its chunks. Returns whether it existed.
    async fn delete_document(&self, id: &str) -> Result<bool>;
}

/// A storage backend for structured resume reviews.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Store a review.
    async fn insert_review(&self, review: ReviewSummary) -> Result<()>;

    /// The most recent review for the document/user pair, by `reviewed_at`.
    async fn latest_review(&self, document_id: &str, user_id: &str)
    -> Result<Option<ReviewSummary>>;

    /// All reviews for the document/user pair, oldest first.
    async fn list_reviews(&self, document_id: &str, user_id: &str) -> Result<Vec<ReviewSummary>>;
}

/// A storage backend for chat transcripts, one per document/user pair.
///
/// Deleting a document through its [`DocumentStore`] also drops every
/// transcript about it.
#[async_trait]
pub trait ChatHistoryStore: Send + Sync {
    /// Append `messages` to the pair's transcript, creating it if needed.
    async fn append_messages(
        &self,
        document_id: &str,
        user_id: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<()>;

    /// The pair's transcript in the order it was written; empty if none.
    async fn chat_history(&self, document_id: &str, user_id: &str) -> Result<Vec<ChatMessage>>;

    /// Remove the pair's transcript. Returns whether one existed.
    async fn clear_chat_history(&self, document_id: &str, user_id: &str) -> Result<bool>;
}
