//! End-to-end indexing scenarios against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use coursemate_rag::{
    Document, DocumentIndexer, DocumentStatus, DocumentStore, EmbeddingProvider,
    InMemoryDocumentStore, PlainTextExtractor, RagConfig, RagError, Result,
};
use tokio::sync::Notify;

/// Fails any text containing `FAIL`, embeds everything else to `[1, 0]`.
struct FlakyEmbedder;

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains("FAIL") {
            return Err(RagError::EmbeddingProvider {
                provider: "flaky".to_string(),
                message: "429 Too Many Requests".to_string(),
            });
        }
        Ok(vec![1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Signals `started` on the first call, then waits for `release`.
struct GatedEmbedder {
    started: Notify,
    release: Notify,
}

#[async_trait]
impl EmbeddingProvider for GatedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(vec![0.0, 1.0])
    }

    fn dimensions(&self) -> usize {
        2
    }
}

fn no_delay() -> RagConfig {
    RagConfig::builder().embed_batch_delay(Duration::ZERO).build().unwrap()
}

fn indexer(
    store: Arc<InMemoryDocumentStore>,
    provider: Arc<dyn EmbeddingProvider>,
) -> Arc<DocumentIndexer> {
    Arc::new(
        DocumentIndexer::builder()
            .config(no_delay())
            .embedding_provider(provider)
            .document_store(store)
            .text_extractor(Arc::new(PlainTextExtractor))
            .build()
            .unwrap(),
    )
}

/// One 60-character line per page, separated by form feeds.
fn paged_text(pages: &[&str]) -> Vec<u8> {
    pages.iter().map(|p| format!("{p:-<60}")).collect::<Vec<_>>().join("\x0c").into_bytes()
}

async fn new_document(store: &InMemoryDocumentStore) -> String {
    let document = Document::new("Operating Systems", "os.pdf").with_user("alice");
    let id = document.id.clone();
    store.insert_document(document).await.unwrap();
    id
}

#[tokio::test]
async fn one_failed_embedding_of_ten_keeps_nine_chunks() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let id = new_document(&store).await;
    let pages: Vec<String> = (1..=10)
        .map(|n| {
            if n == 5 { "page 5 FAIL content".to_string() } else { format!("page {n} content") }
        })
        .collect();
    let pages: Vec<&str> = pages.iter().map(String::as_str).collect();

    let outcome = indexer(store.clone(), Arc::new(FlakyEmbedder))
        .index(&id, "os.pdf", Some(paged_text(&pages)))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.chunk_count, 9);
    assert_eq!(outcome.dropped, 1);
    assert_eq!(outcome.total_pages, 10);

    let document = store.get_document(&id).await.unwrap().unwrap();
    assert_eq!(document.status(), DocumentStatus::Ready);
    assert_eq!(document.total_pages, Some(10));
    let pages: Vec<usize> = document.chunks.iter().map(|c| c.page_number).collect();
    assert_eq!(pages, vec![1, 2, 3, 4, 6, 7, 8, 9, 10]);
}

#[tokio::test]
async fn blank_document_records_processing_error() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let id = new_document(&store).await;

    let err = indexer(store.clone(), Arc::new(FlakyEmbedder))
        .index(&id, "os.pdf", Some(b"  \n\x0c \t ".to_vec()))
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::Extraction(_)));
    let document = store.get_document(&id).await.unwrap().unwrap();
    assert!(document.chunks.is_empty());
    assert!(document.total_pages.is_none());
    match document.status() {
        DocumentStatus::Failed { message } => assert!(message.contains("no extractable text")),
        other => panic!("expected failed status, got {other:?}"),
    }
}

#[tokio::test]
async fn every_embedding_failing_still_succeeds_with_no_chunks() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let id = new_document(&store).await;

    let outcome = indexer(store.clone(), Arc::new(FlakyEmbedder))
        .index(&id, "os.pdf", Some(paged_text(&["FAIL one", "FAIL two"])))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.chunk_count, 0);
    assert_eq!(outcome.dropped, 2);
    let document = store.get_document(&id).await.unwrap().unwrap();
    assert_eq!(document.status(), DocumentStatus::Processing);
    assert_eq!(document.processing_error, None);
}

#[tokio::test]
async fn reindexing_replaces_previous_chunks() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let id = new_document(&store).await;
    let indexer = indexer(store.clone(), Arc::new(FlakyEmbedder));

    indexer.index(&id, "os.pdf", Some(paged_text(&["old a", "old b", "old c"]))).await.unwrap();
    indexer.index(&id, "os.pdf", Some(paged_text(&["new only"]))).await.unwrap();

    let document = store.get_document(&id).await.unwrap().unwrap();
    assert_eq!(document.chunks.len(), 1);
    assert!(document.chunks[0].text.starts_with("new only"));
    assert_eq!(document.total_pages, Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_index_of_same_document_is_rejected() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let id = new_document(&store).await;
    let gate = Arc::new(GatedEmbedder { started: Notify::new(), release: Notify::new() });
    let indexer = indexer(store.clone(), gate.clone());

    let first = indexer.spawn(id.clone(), "os.pdf", Some(paged_text(&["only page"])));
    gate.started.notified().await;
    assert!(indexer.is_indexing(&id));

    let err = indexer.index(&id, "os.pdf", Some(paged_text(&["other"]))).await.unwrap_err();
    assert!(matches!(err, RagError::AlreadyIndexing(ref doc) if doc == &id));

    gate.release.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome.chunk_count, 1);
    assert!(!indexer.is_indexing(&id));

    // The rejected run left the winner's result alone.
    let document = store.get_document(&id).await.unwrap().unwrap();
    assert_eq!(document.processing_error, None);
    assert!(document.chunks[0].text.starts_with("only page"));
}

#[tokio::test]
async fn spawned_indexing_reports_through_the_document() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let id = new_document(&store).await;
    let indexer = indexer(store.clone(), Arc::new(FlakyEmbedder));

    let handle = indexer.spawn(id.clone(), "os.pdf", Some(paged_text(&["scheduling", "paging"])));
    handle.await.unwrap().unwrap();

    let document = store.get_document(&id).await.unwrap().unwrap();
    assert_eq!(document.status(), DocumentStatus::Ready);
    assert_eq!(document.chunks.len(), 2);
}

#[tokio::test]
async fn local_source_is_read_from_disk() {
    let path = std::env::temp_dir().join(format!("coursemate-{}.txt", uuid::Uuid::new_v4()));
    std::fs::write(&path, paged_text(&["virtual memory", "file systems", "deadlock"])).unwrap();
    let source = path.to_string_lossy().to_string();

    let store = Arc::new(InMemoryDocumentStore::new());
    let document = Document::new("Local", source.clone());
    let id = document.id.clone();
    store.insert_document(document).await.unwrap();

    let outcome =
        indexer(store.clone(), Arc::new(FlakyEmbedder)).index(&id, &source, None).await.unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(outcome.chunk_count, 3);
    assert_eq!(outcome.total_pages, 3);
}

#[tokio::test]
async fn missing_document_surfaces_not_found() {
    let store = Arc::new(InMemoryDocumentStore::new());

    let err = indexer(store, Arc::new(FlakyEmbedder))
        .index("deleted-meanwhile", "os.pdf", Some(paged_text(&["orphan"])))
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::NotFound(_)));
}
