//! Resume reviews and the context assembled for resume-aware answers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::document::{DocumentId, RetrievalResult};
use crate::error::Result;
use crate::retriever::Retriever;
use crate::store::{DocumentStore, ReviewStore};

/// A structured resume review, as produced by an external reviewer model.
///
/// Scores are on a 0-100 scale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewSummary {
    pub id: String,
    pub document_id: DocumentId,
    pub user_id: String,
    #[serde(default)]
    pub overall_score: Option<u8>,
    #[serde(default)]
    pub ats_score: Option<u8>,
    #[serde(default)]
    pub content_score: Option<u8>,
    #[serde(default)]
    pub formatting_score: Option<u8>,
    #[serde(default)]
    pub top_strengths: Vec<String>,
    #[serde(default)]
    pub critical_improvements: Vec<String>,
    #[serde(default)]
    pub quick_wins: Vec<String>,
    #[serde(default)]
    pub detailed_feedback: Option<String>,
    #[serde(default)]
    pub target_role: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewSummary {
    /// An empty review of `document_id` for `user_id`, stamped now.
    pub fn new(document_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document_id.into(),
            user_id: user_id.into(),
            overall_score: None,
            ats_score: None,
            content_score: None,
            formatting_score: None,
            top_strengths: Vec::new(),
            critical_improvements: Vec::new(),
            quick_wins: Vec::new(),
            detailed_feedback: None,
            target_role: None,
            reviewed_at: Utc::now(),
        }
    }
}

/// Retrieved chunks plus the latest review of every resume among the
/// candidate documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssembledContext {
    pub chunks: Vec<RetrievalResult>,
    /// In candidate-id order. Resumes without a review are absent.
    pub reviews: Vec<ReviewSummary>,
}

/// Combines similarity retrieval with stored resume reviews.
pub struct ReviewContextAssembler {
    retriever: Arc<Retriever>,
    document_store: Arc<dyn DocumentStore>,
    review_store: Arc<dyn ReviewStore>,
}

impl ReviewContextAssembler {
    pub fn new(
        retriever: Arc<Retriever>,
        document_store: Arc<dyn DocumentStore>,
        review_store: Arc<dyn ReviewStore>,
    ) -> Self {
        Self { retriever, document_store, review_store }
    }

    /// The top `top_k` chunks for `query` across `document_ids`.
    ///
    /// # Errors
    ///
    /// Same as [`Retriever::retrieve`].
    pub async fn assemble_context(
        &self,
        query: &str,
        document_ids: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        self.retriever.retrieve(query, document_ids, top_k).await
    }

    /// The most recent review of `document_id` by `user_id`, if any.
    pub async fn latest_review(
        &self,
        document_id: &str,
        user_id: &str,
    ) -> Result<Option<ReviewSummary>> {
        self.review_store.latest_review(document_id, user_id).await
    }

    /// Retrieval results plus the latest review of each candidate resume.
    ///
    /// # Errors
    ///
    /// Retrieval errors propagate unchanged, including
    /// [`RagError::NoContent`](crate::RagError::NoContent).
    #[instrument(skip_all, fields(document_count = document_ids.len(), user.id = user_id))]
    pub async fn assemble(
        &self,
        query: &str,
        document_ids: &[String],
        user_id: &str,
        top_k: usize,
    ) -> Result<AssembledContext> {
        let chunks = self.assemble_context(query, document_ids, top_k).await?;

        let documents = self.document_store.get_documents_by_ids(document_ids).await?;
        let mut reviews = Vec::new();
        for document in documents.iter().filter(|d| d.is_resume) {
            if let Some(review) = self.latest_review(&document.id, user_id).await? {
                reviews.push(review);
            }
        }

        debug!(chunk_count = chunks.len(), review_count = reviews.len(), "assembled context");
        Ok(AssembledContext { chunks, reviews })
    }
}
