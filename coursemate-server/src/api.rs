//! Request handlers and their JSON shapes.

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Path, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use coursemate_rag::context::{
    Citation, chat_prompt, citations, format_context, resume_chat_prompt,
};
use coursemate_rag::{
    AssembledContext, ChatMessage, Document, DocumentStatus, ResumeMetadata, RetrievalResult,
    ReviewSummary,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the authenticated user's id.
pub const USER_HEADER: &str = "x-user-id";

/// Number of chunks handed to the model when answering a question.
const CHAT_TOP_K: usize = 5;

/// The requesting user, taken from [`USER_HEADER`].
#[derive(Debug, Clone)]
pub struct UserId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| UserId(v.to_string()))
            .ok_or_else(|| ApiError::unauthorized(format!("Missing {USER_HEADER} header")))
    }
}

/// A JSON body whose rejections render as `{"error": ...}`.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::new(rejection.status(), rejection.body_text())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub source: String,
    pub status: DocumentStatus,
    pub total_pages: Option<usize>,
    pub chunk_count: usize,
    pub is_seeded: bool,
    pub is_resume: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_metadata: Option<ResumeMetadata>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Document> for DocumentSummary {
    fn from(d: &Document) -> Self {
        Self {
            id: d.id.clone(),
            title: d.title.clone(),
            source: d.source.clone(),
            status: d.status(),
            total_pages: d.total_pages,
            chunk_count: d.chunks.len(),
            is_seeded: d.is_seeded,
            is_resume: d.is_resume,
            resume_metadata: d.resume_metadata.clone(),
            uploaded_at: d.uploaded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkView {
    pub text: String,
    pub page_number: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub summary: DocumentSummary,
    pub chunks: Vec<ChunkView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    pub title: String,
    pub source: String,
    /// Raw document bytes. When absent, `source` is read only if the
    /// server's source policy admits it.
    #[serde(default)]
    pub content_base64: Option<String>,
    #[serde(default)]
    pub is_resume: bool,
    #[serde(default)]
    pub resume_metadata: Option<ResumeMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    pub document_ids: Vec<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveResponse {
    pub results: Vec<RetrievalResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub document_ids: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewRequest {
    pub overall_score: Option<i64>,
    pub ats_score: Option<i64>,
    pub content_score: Option<i64>,
    pub formatting_score: Option<i64>,
    #[serde(default)]
    pub top_strengths: Vec<String>,
    #[serde(default)]
    pub critical_improvements: Vec<String>,
    #[serde(default)]
    pub quick_wins: Vec<String>,
    pub detailed_feedback: Option<String>,
    pub target_role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeContextRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessage>,
    pub document_title: String,
}

pub async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"coursemate"}))
}

pub async fn list_documents(
    State(state): State<AppState>,
    UserId(user): UserId,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.documents.list_documents(&user).await?;
    let documents: Vec<DocumentSummary> = documents.iter().map(DocumentSummary::from).collect();
    Ok(Json(json!({ "documents": documents })))
}

pub async fn upload_document(
    State(state): State<AppState>,
    UserId(user): UserId,
    ApiJson(request): ApiJson<UploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = request.title.trim();
    let source = request.source.trim();
    if title.is_empty() || source.is_empty() {
        return Err(ApiError::bad_request("Please provide a title and a source"));
    }
    let bytes = request
        .content_base64
        .as_deref()
        .map(|encoded| STANDARD.decode(encoded))
        .transpose()
        .map_err(|e| ApiError::bad_request(format!("content_base64 is not valid base64: {e}")))?;
    if bytes.is_none() {
        state.source_policy.check(source).map_err(|reason| {
            warn!(user = %user, source, "refused upload source");
            ApiError::bad_request(reason)
        })?;
    }

    let mut document = Document::new(title, source).with_user(user);
    if request.is_resume {
        document = document.as_resume(request.resume_metadata);
    }
    let summary = DocumentSummary::from(&document);
    state.documents.insert_document(document.clone()).await?;

    // The document record reports the outcome; the handle is not awaited.
    drop(state.indexer.spawn(document.id.clone(), document.source.clone(), bytes));
    info!(document.id = %document.id, is_resume = document.is_resume, "document uploaded");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Document uploaded successfully. Processing in background.",
            "document": summary,
        })),
    ))
}

/// Load a document the user may read, or 404.
async fn visible_document(state: &AppState, id: &str, user: &str) -> Result<Document, ApiError> {
    match state.documents.get_document(id).await? {
        Some(document) if document.is_visible_to(user) => Ok(document),
        _ => Err(ApiError::not_found("Document not found")),
    }
}

/// Like [`visible_document`], but 400 unless the document is a resume.
async fn visible_resume(state: &AppState, id: &str, user: &str) -> Result<Document, ApiError> {
    let document = visible_document(state, id, user).await?;
    if !document.is_resume {
        return Err(ApiError::bad_request("This document is not marked as a resume"));
    }
    Ok(document)
}

pub async fn get_document(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetail>, ApiError> {
    let document = visible_document(&state, &id, &user).await?;
    let chunks = document
        .chunks
        .iter()
        .map(|c| ChunkView { text: c.text.clone(), page_number: c.page_number })
        .collect();
    Ok(Json(DocumentDetail { summary: DocumentSummary::from(&document), chunks }))
}

pub async fn delete_document(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let document = visible_document(&state, &id, &user).await?;
    if document.is_seeded {
        return Err(ApiError::forbidden("Seeded documents cannot be deleted"));
    }
    state.documents.delete_document(&id).await?;
    info!(document.id = %id, "document deleted");
    Ok(Json(json!({ "message": "Document deleted successfully" })))
}

/// Drop ids the user may not read; 404 when none remain.
async fn accessible_ids(
    state: &AppState,
    ids: &[String],
    user: &str,
) -> Result<Vec<String>, ApiError> {
    let documents = state.documents.get_documents_by_ids(ids).await?;
    let accessible: Vec<String> =
        documents.into_iter().filter(|d| d.is_visible_to(user)).map(|d| d.id).collect();
    if accessible.is_empty() {
        return Err(ApiError::not_found("No accessible documents found"));
    }
    if accessible.len() < ids.len() {
        warn!(requested = ids.len(), accessible = accessible.len(), "ignoring inaccessible ids");
    }
    Ok(accessible)
}

pub async fn retrieve(
    State(state): State<AppState>,
    UserId(user): UserId,
    ApiJson(request): ApiJson<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::bad_request("Please provide a query"));
    }
    if request.document_ids.is_empty() {
        return Err(ApiError::bad_request("Please provide at least one document ID"));
    }
    let ids = accessible_ids(&state, &request.document_ids, &user).await?;
    let top_k = request.top_k.unwrap_or(state.config.top_k);
    let results = state.retriever.retrieve(&request.query, &ids, top_k).await?;
    Ok(Json(RetrieveResponse { results }))
}

pub async fn chat(
    State(state): State<AppState>,
    UserId(user): UserId,
    ApiJson(request): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.document_ids.is_empty() {
        return Err(ApiError::bad_request("Please provide at least one document ID"));
    }
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("Please provide a message"));
    }
    let ids = accessible_ids(&state, &request.document_ids, &user).await?;

    let results = state.retriever.retrieve(message, &ids, CHAT_TOP_K).await?;
    let prompt = chat_prompt(&format_context(&results), message);
    let response = state.generator.complete(&prompt).await?;
    let citations = citations(&results);

    // The transcript lives with the first document asked about.
    let turns = vec![
        ChatMessage::user(message),
        ChatMessage::assistant(response.clone(), citations.clone()),
    ];
    state.chats.append_messages(&ids[0], &user, turns).await?;

    Ok(Json(ChatResponse { response, citations }))
}

pub async fn chat_history(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<Json<ChatHistoryResponse>, ApiError> {
    let document = visible_document(&state, &id, &user).await?;
    let messages = state.chats.chat_history(&id, &user).await?;
    Ok(Json(ChatHistoryResponse { messages, document_title: document.title }))
}

pub async fn clear_chat_history(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    visible_document(&state, &id, &user).await?;
    state.chats.clear_chat_history(&id, &user).await?;
    Ok(Json(json!({ "message": "Chat history cleared successfully" })))
}

pub async fn latest_review(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<Json<ReviewSummary>, ApiError> {
    visible_document(&state, &id, &user).await?;
    state
        .assembler
        .latest_review(&id, &user)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Review not found"))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    visible_document(&state, &id, &user).await?;
    let reviews = state.reviews.list_reviews(&id, &user).await?;
    Ok(Json(json!({ "reviews": reviews })))
}

/// A 0..=100 score, or 400.
fn score(value: Option<i64>) -> Result<Option<u8>, ApiError> {
    value
        .map(|s| {
            u8::try_from(s)
                .ok()
                .filter(|s| *s <= 100)
                .ok_or_else(|| ApiError::bad_request("Scores must be between 0 and 100"))
        })
        .transpose()
}

pub async fn create_review(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let document = visible_resume(&state, &id, &user).await?;

    let mut review = ReviewSummary::new(id, user);
    review.overall_score = score(request.overall_score)?;
    review.ats_score = score(request.ats_score)?;
    review.content_score = score(request.content_score)?;
    review.formatting_score = score(request.formatting_score)?;
    review.top_strengths = request.top_strengths;
    review.critical_improvements = request.critical_improvements;
    review.quick_wins = request.quick_wins;
    review.detailed_feedback = request.detailed_feedback;
    review.target_role = request
        .target_role
        .or_else(|| document.resume_metadata.and_then(|m| m.target_role));

    state.reviews.insert_review(review.clone()).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Review saved successfully", "review": review })),
    ))
}

pub async fn resume_context(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ResumeContextRequest>,
) -> Result<Json<AssembledContext>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::bad_request("Please provide a query"));
    }
    visible_resume(&state, &id, &user).await?;
    let top_k = request.top_k.unwrap_or(state.config.top_k);
    let assembled = state.assembler.assemble(&request.query, &[id], &user, top_k).await?;
    Ok(Json(assembled))
}

pub async fn resume_chat(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ResumeChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("Please provide a message"));
    }
    visible_resume(&state, &id, &user).await?;

    let assembled = state.assembler.assemble(message, &[id], &user, CHAT_TOP_K).await?;
    let prompt = resume_chat_prompt(&assembled, message);
    let response = state.generator.complete(&prompt).await?;
    Ok(Json(ChatResponse { response, citations: citations(&assembled.chunks) }))
}
