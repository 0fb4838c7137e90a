//! Text-generation collaborator used to answer questions over retrieved context.

use async_trait::async_trait;

use crate::error::Result;

/// An opaque `complete(prompt) -> text` language model.
///
/// The indexing and retrieval engine never calls this itself; it exists so
/// that prompt consumers (chat, resume review) can be wired to the same
/// provider configuration as the embedder.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
