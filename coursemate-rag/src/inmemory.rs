//! In-memory document, review, and chat-history store.
//!
//! This module provides [`InMemoryDocumentStore`], a store backed by
//! `HashMap`s protected by `tokio::sync::RwLock`s. Chunk lists are swapped
//! under a single write lock, which makes every replacement atomic for
//! concurrent readers. It is suitable for development, testing, and
//! single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};
use crate::history::ChatMessage;
use crate::review::ReviewSummary;
use crate::store::{ChatHistoryStore, DocumentStore, ReviewStore};

/// An in-memory [`DocumentStore`], [`ReviewStore`], and [`ChatHistoryStore`].
///
/// # Example
///
/// ```rust,ignore
/// use coursemate_rag::{InMemoryDocumentStore, DocumentStore};
///
/// let store = InMemoryDocumentStore::new();
/// store.insert_document(document).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, Document>>,
    reviews: RwLock<Vec<ReviewSummary>>,
    /// Keyed by `(document_id, user_id)`.
    chats: RwLock<HashMap<(String, String), Vec<ChatMessage>>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(id: &str) -> RagError {
        RagError::NotFound(id.to_string())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert_document(&self, document: Document) -> Result<()> {
        let mut documents = self.documents.write().await;
        documents.insert(document.id.clone(), document);
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.get(id).cloned())
    }

    async fn get_documents_by_ids(&self, ids: &[String]) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;
        Ok(ids.iter().filter_map(|id| documents.get(id).cloned()).collect())
    }

    async fn list_documents(&self, user_id: &str) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;
        let mut visible: Vec<Document> =
            documents.values().filter(|d| d.is_visible_to(user_id)).cloned().collect();
        visible.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(visible)
    }

    async fn update_document_chunks(
        &self,
        id: &str,
        chunks: Vec<Chunk>,
        total_pages: usize,
    ) -> Result<()> {
        let mut documents = self.documents.write().await;
        let document = documents.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        document.chunks = chunks;
        document.total_pages = Some(total_pages);
        document.processing_error = None;
        Ok(())
    }

    async fn set_document_error(&self, id: &str, message: &str) -> Result<()> {
        let mut documents = self.documents.write().await;
        let document = documents.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        document.processing_error = Some(message.to_string());
        document.chunks.clear();
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let removed = self.documents.write().await.remove(id).is_some();
        if removed {
            self.reviews.write().await.retain(|r| r.document_id != id);
            self.chats.write().await.retain(|(document_id, _), _| document_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl ReviewStore for InMemoryDocumentStore {
    async fn insert_review(&self, review: ReviewSummary) -> Result<()> {
        self.reviews.write().await.push(review);
        Ok(())
    }

    async fn latest_review(
        &self,
        document_id: &str,
        user_id: &str,
    ) -> Result<Option<ReviewSummary>> {
        let reviews = self.reviews.read().await;
        Ok(reviews
            .iter()
            .filter(|r| r.document_id == document_id && r.user_id == user_id)
            .max_by_key(|r| r.reviewed_at)
            .cloned())
    }

    async fn list_reviews(&self, document_id: &str, user_id: &str) -> Result<Vec<ReviewSummary>> {
        let reviews = self.reviews.read().await;
        let mut matching: Vec<ReviewSummary> = reviews
            .iter()
            .filter(|r| r.document_id == document_id && r.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.reviewed_at);
        Ok(matching)
    }
}

#[async_trait]
impl ChatHistoryStore for InMemoryDocumentStore {
    async fn append_messages(
        &self,
        document_id: &str,
        user_id: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<()> {
        let mut chats = self.chats.write().await;
        chats
            .entry((document_id.to_string(), user_id.to_string()))
            .or_default()
            .extend(messages);
        Ok(())
    }

    async fn chat_history(&self, document_id: &str, user_id: &str) -> Result<Vec<ChatMessage>> {
        let chats = self.chats.read().await;
        let key = (document_id.to_string(), user_id.to_string());
        Ok(chats.get(&key).cloned().unwrap_or_default())
    }

    async fn clear_chat_history(&self, document_id: &str, user_id: &str) -> Result<bool> {
        let key = (document_id.to_string(), user_id.to_string());
        Ok(self.chats.write().await.remove(&key).is_some())
    }
}
