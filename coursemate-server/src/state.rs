use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use coursemate_rag::gemini::{GeminiEmbeddingProvider, GeminiTextGenerator, TaskType};
use coursemate_rag::openai::{OpenAIEmbeddingProvider, OpenAITextGenerator};
use coursemate_rag::{
    ChatHistoryStore, DocumentIndexer, DocumentStore, EmbeddingProvider, HttpSourceFetcher,
    InMemoryDocumentStore, RagConfig, Retriever, ReviewContextAssembler, ReviewStore,
    SniffingExtractor, TextGenerator,
};
use tracing::info;

use crate::config::{ProviderKind, ServerConfig, SourcePolicy};

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: RagConfig,
    pub documents: Arc<dyn DocumentStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub chats: Arc<dyn ChatHistoryStore>,
    pub indexer: Arc<DocumentIndexer>,
    pub retriever: Arc<Retriever>,
    pub assembler: Arc<ReviewContextAssembler>,
    pub generator: Arc<dyn TextGenerator>,
    pub cors_origin: Option<HeaderValue>,
    pub source_policy: SourcePolicy,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("source_policy", &self.source_policy)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the engine around one store that holds documents, reviews, and
    /// chat history. Uploads must carry their bytes until a
    /// [`SourcePolicy`] is set.
    pub fn new<S>(
        config: RagConfig,
        store: Arc<S>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn TextGenerator>,
    ) -> coursemate_rag::Result<Self>
    where
        S: DocumentStore + ReviewStore + ChatHistoryStore + 'static,
    {
        let documents: Arc<dyn DocumentStore> = store.clone();
        let reviews: Arc<dyn ReviewStore> = store.clone();
        let chats: Arc<dyn ChatHistoryStore> = store;

        let indexer = DocumentIndexer::builder()
            .config(config.clone())
            .embedding_provider(embedder.clone())
            .document_store(documents.clone())
            .text_extractor(Arc::new(SniffingExtractor))
            .source_fetcher(Arc::new(HttpSourceFetcher::new()))
            .build()?;
        let retriever = Arc::new(Retriever::new(config.clone(), embedder, documents.clone()));
        let assembler = Arc::new(ReviewContextAssembler::new(
            retriever.clone(),
            documents.clone(),
            reviews.clone(),
        ));

        Ok(Self {
            config,
            documents,
            reviews,
            chats,
            indexer: Arc::new(indexer),
            retriever,
            assembler,
            generator,
            cors_origin: None,
            source_policy: SourcePolicy::default(),
        })
    }

    /// Allow uploads without content to name sources this policy admits.
    pub fn with_source_policy(mut self, policy: SourcePolicy) -> Self {
        self.source_policy = policy;
        self
    }

    /// Restrict CORS to a single origin.
    pub fn with_cors_origin(mut self, origin: HeaderValue) -> Self {
        self.cors_origin = Some(origin);
        self
    }

    /// Build the production state: providers from the environment, Postgres
    /// when a database URL is configured, in-memory storage otherwise.
    pub async fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let rag_config = config.rag_config()?;
        let (embedder, generator) = providers(config.embedding_provider)?;

        let state = match &config.database_url {
            Some(url) => connect_postgres(url, rag_config, embedder, generator).await?,
            None => {
                info!("using in-memory document store");
                Self::new(rag_config, Arc::new(InMemoryDocumentStore::new()), embedder, generator)?
            }
        }
        .with_source_policy(config.source_policy());

        match &config.cors_origin {
            Some(origin) => {
                let origin = HeaderValue::from_str(origin)
                    .with_context(|| format!("invalid CORS origin {origin:?}"))?;
                Ok(state.with_cors_origin(origin))
            }
            None => Ok(state),
        }
    }
}

fn providers(
    kind: ProviderKind,
) -> anyhow::Result<(Arc<dyn EmbeddingProvider>, Arc<dyn TextGenerator>)> {
    match kind {
        ProviderKind::Gemini => {
            let embedder = GeminiEmbeddingProvider::from_env()
                .context("configuring Gemini embeddings")?
                .with_task_type(TaskType::SemanticSimilarity);
            let generator =
                GeminiTextGenerator::from_env().context("configuring Gemini generation")?;
            Ok((Arc::new(embedder), Arc::new(generator)))
        }
        ProviderKind::Openai => {
            let embedder =
                OpenAIEmbeddingProvider::from_env().context("configuring OpenAI embeddings")?;
            let generator =
                OpenAITextGenerator::from_env().context("configuring OpenAI generation")?;
            Ok((Arc::new(embedder), Arc::new(generator)))
        }
    }
}

#[cfg(feature = "postgres")]
async fn connect_postgres(
    url: &str,
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn TextGenerator>,
) -> anyhow::Result<AppState> {
    let store = coursemate_rag::postgres::PostgresDocumentStore::connect(url)
        .await
        .context("connecting to PostgreSQL")?;
    info!("using PostgreSQL document store");
    Ok(AppState::new(config, Arc::new(store), embedder, generator)?)
}

#[cfg(not(feature = "postgres"))]
async fn connect_postgres(
    _url: &str,
    _config: RagConfig,
    _embedder: Arc<dyn EmbeddingProvider>,
    _generator: Arc<dyn TextGenerator>,
) -> anyhow::Result<AppState> {
    anyhow::bail!("DATABASE_URL is set but this build lacks the `postgres` feature")
}
