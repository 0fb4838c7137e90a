//! Retrieval ranking, skipping, and empty-content behaviour.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use coursemate_rag::{
    Chunk, Document, DocumentStore, EmbeddingProvider, InMemoryDocumentStore, RagConfig, RagError,
    Result, Retriever, cosine_similarity,
};
use proptest::prelude::*;

/// Embeds known queries to fixed vectors; anything else fails.
struct LookupEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl LookupEmbedder {
    fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        Self { vectors: entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect() }
    }
}

#[async_trait]
impl EmbeddingProvider for LookupEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors.get(text).cloned().ok_or_else(|| RagError::EmbeddingProvider {
            provider: "lookup".to_string(),
            message: format!("no vector for {text:?}"),
        })
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// A unit vector whose cosine with `[1, 0]` is `similarity`.
fn at_similarity(similarity: f32) -> Vec<f32> {
    vec![similarity, (1.0 - similarity * similarity).sqrt()]
}

fn chunk(text: &str, page_number: usize, embedding: Option<Vec<f32>>) -> Chunk {
    Chunk { text: text.to_string(), page_number, embedding }
}

async fn store_with(documents: Vec<Document>) -> Arc<InMemoryDocumentStore> {
    let store = Arc::new(InMemoryDocumentStore::new());
    for document in documents {
        store.insert_document(document).await.unwrap();
    }
    store
}

fn retriever(store: Arc<InMemoryDocumentStore>) -> Retriever {
    let embedder = LookupEmbedder::new(&[("what is a heap?", vec![1.0, 0.0])]);
    Retriever::new(RagConfig::default(), Arc::new(embedder), store)
}

#[tokio::test]
async fn returns_top_k_by_descending_similarity() {
    let mut doc = Document::new("Data Structures", "ds.pdf");
    doc.chunks = vec![
        chunk("page two text", 2, Some(at_similarity(0.8))),
        chunk("page nine text", 9, Some(at_similarity(0.4))),
        chunk("page four text", 4, Some(at_similarity(0.9))),
    ];
    let id = doc.id.clone();
    let store = store_with(vec![doc]).await;

    let results = retriever(store).retrieve("what is a heap?", &[id.clone()], 2).await.unwrap();

    let pages: Vec<usize> = results.iter().map(|r| r.page_number).collect();
    assert_eq!(pages, vec![4, 2]);
    assert!((results[0].similarity - 0.9).abs() < 1e-5);
    assert!((results[1].similarity - 0.8).abs() < 1e-5);
    assert_eq!(results[0].document_id, id);
    assert_eq!(results[0].document_title, "Data Structures");
}

#[tokio::test]
async fn results_interleave_across_documents() {
    let mut a = Document::new("Algorithms", "a.pdf");
    a.chunks = vec![
        chunk("a9", 1, Some(at_similarity(0.9))),
        chunk("a4", 2, Some(at_similarity(0.4))),
        chunk("a1", 3, Some(at_similarity(0.1))),
    ];
    let mut b = Document::new("Brief notes", "b.pdf");
    b.chunks =
        vec![chunk("b8", 1, Some(at_similarity(0.8))), chunk("b2", 2, Some(at_similarity(0.2)))];
    let ids = vec![a.id.clone(), b.id.clone()];
    let store = store_with(vec![a, b]).await;

    let results = retriever(store).retrieve("what is a heap?", &ids, 3).await.unwrap();

    let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["a9", "b8", "a4"]);
    let titles: Vec<&str> = results.iter().map(|r| r.document_title.as_str()).collect();
    assert_eq!(titles, vec!["Algorithms", "Brief notes", "Algorithms"]);
    for (result, expected) in results.iter().zip([0.9, 0.8, 0.4]) {
        assert!((result.similarity - expected).abs() < 1e-5);
    }
}

#[tokio::test]
async fn unindexed_documents_are_skipped() {
    let pending = Document::new("Still processing", "pending.pdf");
    let mut ready = Document::new("Ready", "ready.pdf");
    ready.chunks = vec![chunk("heaps are trees", 1, Some(at_similarity(0.7)))];
    let ids = vec![pending.id.clone(), ready.id.clone()];
    let store = store_with(vec![pending, ready]).await;

    let results = retriever(store).retrieve("what is a heap?", &ids, 5).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document_title, "Ready");
}

#[tokio::test]
async fn nothing_scorable_is_no_content() {
    let pending = Document::new("Still processing", "pending.pdf");
    let mut unembedded = Document::new("Unembedded", "u.pdf");
    unembedded.chunks = vec![chunk("text", 1, None), chunk("more", 1, Some(Vec::new()))];
    let ids = vec![pending.id.clone(), unembedded.id.clone(), "unknown".to_string()];
    let store = store_with(vec![pending, unembedded]).await;

    let err = retriever(store).retrieve("what is a heap?", &ids, 5).await.unwrap_err();

    assert!(matches!(err, RagError::NoContent));
    assert!(err.to_string().starts_with("No processed chunks available"));
}

#[tokio::test]
async fn top_k_zero_is_empty_but_still_checks_content() {
    let mut doc = Document::new("Doc", "d.pdf");
    doc.chunks = vec![chunk("a", 1, Some(at_similarity(0.5)))];
    let id = doc.id.clone();
    let store = store_with(vec![doc]).await;
    let retriever = retriever(store);

    assert!(retriever.retrieve("what is a heap?", &[id], 0).await.unwrap().is_empty());
    let err = retriever.retrieve("what is a heap?", &[], 0).await.unwrap_err();
    assert!(matches!(err, RagError::NoContent));
}

#[tokio::test]
async fn query_embedding_failure_propagates() {
    let store = store_with(Vec::new()).await;
    let err = retriever(store).retrieve("unknown query", &[], 5).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingProvider { .. }));
}

#[tokio::test]
async fn ties_keep_store_order() {
    let mut doc = Document::new("Doc", "d.pdf");
    doc.chunks = vec![
        chunk("first", 1, Some(vec![0.6, 0.8])),
        chunk("second", 2, Some(vec![0.6, 0.8])),
        chunk("third", 3, Some(vec![0.6, 0.8])),
    ];
    let id = doc.id.clone();
    let store = store_with(vec![doc]).await;

    let results = retriever(store).retrieve_default("what is a heap?", &[id]).await.unwrap();
    let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
}

/// Generate a non-zero embedding of the given dimension.
fn arb_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim)
        .prop_filter("non-zero embedding", |v| v.iter().any(|x| x.abs() > 1e-3))
}

/// **Property 3: Retrieval ordering**
/// *For any* set of embedded chunks spread over two documents, retrieval
/// SHALL return `min(top_k, scored)` results ordered by descending cosine
/// similarity.
mod prop_retrieval_ordering {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            embeddings in proptest::collection::vec(arb_embedding(DIM), 1..30),
            query in arb_embedding(DIM),
            top_k in 1usize..40,
            split in 0usize..30,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                // Page numbers are global indices so results map back to inputs.
                let mut chunks: Vec<Chunk> = embeddings
                    .iter()
                    .enumerate()
                    .map(|(i, e)| chunk(&format!("chunk {i}"), i + 1, Some(e.clone())))
                    .collect();
                let mut second = Document::new("Second", "b.pdf");
                second.chunks = chunks.split_off(split.min(chunks.len()));
                let mut first = Document::new("First", "a.pdf");
                first.chunks = chunks;
                let ids = vec![first.id.clone(), second.id.clone()];
                let store = store_with(vec![first, second]).await;
                let embedder = LookupEmbedder::new(&[("q", query.clone())]);
                let retriever = Retriever::new(RagConfig::default(), Arc::new(embedder), store);
                retriever.retrieve("q", &ids, top_k).await.unwrap()
            });

            prop_assert_eq!(results.len(), top_k.min(embeddings.len()));
            for pair in results.windows(2) {
                prop_assert!(pair[0].similarity >= pair[1].similarity);
            }
            for result in &results {
                let expected = cosine_similarity(&query, &embeddings[result.page_number - 1]);
                prop_assert_eq!(result.similarity, expected);
            }
        }

        #[test]
        fn cosine_is_bounded(a in arb_embedding(DIM), b in arb_embedding(DIM)) {
            let sim = cosine_similarity(&a, &b);
            prop_assert!((-1.0 - 1e-5..=1.0 + 1e-5).contains(&sim));
        }

        #[test]
        fn cosine_with_itself_is_one(v in arb_embedding(DIM)) {
            let sim = cosine_similarity(&v, &v);
            prop_assert!((sim - 1.0).abs() < 1e-4, "self-similarity was {}", sim);
        }
    }
}
