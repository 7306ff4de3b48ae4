//! Index lifecycle through the engine: build, swap, failure, retrieval.

use async_trait::async_trait;
use ragchat_embeddings::{ChunkConfig, Chunker, Embedder, EmbeddingError, EmbeddingResult};
use ragchat_rag::{DirectorySource, Document, DocumentSource, RagEngine, RagError, RagResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::timeout;

const VOCAB: &[&str] = &["fox", "dog", "quick", "lazy", "brown", "jumps", "cat"];

/// Bag-of-words over a fixed vocabulary; can be switched to fail.
#[derive(Default)]
struct KeywordEmbedder {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl KeywordEmbedder {
    fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        VOCAB
            .iter()
            .map(|v| words.iter().filter(|w| *w == v).count() as f32)
            .collect()
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Upstream {
                status: 500,
                body: "model crashed".into(),
            });
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        "keywords"
    }
}

fn engine(embedder: &Arc<KeywordEmbedder>) -> RagEngine {
    RagEngine::new(embedder.clone(), Chunker::new(ChunkConfig::new(900, 120)))
}

fn fox_docs() -> Vec<Document> {
    vec![
        Document::new("A", "The quick brown fox"),
        Document::new("B", "jumps over the lazy dog"),
    ]
}

#[tokio::test]
async fn fox_query_finds_document_a() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let engine = engine(&embedder);

    let index = engine.rebuild(fox_docs()).await.unwrap();
    assert_eq!(index.len(), 2);
    assert!(index.chunks().iter().all(|c| c.chunk.chunk_id == 0));
    assert_eq!(embedder.calls(), 1);

    let hits = engine.search("fox", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.section, "A");
    assert_eq!(hits[0].chunk.text, "The quick brown fox");
    assert!(hits[0].score > 0.0);
}

#[tokio::test]
async fn never_built_is_unavailable_and_empty_is_ready() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let engine = engine(&embedder);

    assert!(!engine.status().await.ready);
    assert!(matches!(
        engine.search("fox", 3).await,
        Err(RagError::RetrievalUnavailable)
    ));

    engine.rebuild(Vec::new()).await.unwrap();
    let status = engine.status().await;
    assert!(status.ready);
    assert_eq!(status.chunks, 0);
    assert_eq!(status.generation, 1);

    assert!(engine.search("fox", 3).await.unwrap().is_empty());
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn blank_query_is_rejected_without_embedding() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let engine = engine(&embedder);
    engine.rebuild(fox_docs()).await.unwrap();
    let before = embedder.calls();

    assert!(matches!(engine.search("   ", 2).await, Err(RagError::EmptyQuery)));
    assert_eq!(embedder.calls(), before);
}

#[tokio::test]
async fn failed_rebuild_keeps_previous_generation() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let engine = engine(&embedder);
    engine.rebuild(fox_docs()).await.unwrap();

    embedder.failing.store(true, Ordering::SeqCst);
    let err = engine
        .rebuild(vec![Document::new("C", "a cat")])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::IndexBuild(EmbeddingError::Upstream { status: 500, .. })));

    let status = engine.status().await;
    assert!(status.ready);
    assert_eq!(status.generation, 1);
    assert_eq!(status.chunks, 2);
    assert!(status.last_error.unwrap().contains("model crashed"));

    // The corpus follows the latest documents even though indexing failed.
    assert_eq!(engine.corpus().await.len(), 1);

    embedder.failing.store(false, Ordering::SeqCst);
    let hits = engine.search("dog", 1).await.unwrap();
    assert_eq!(hits[0].chunk.section, "B");

    engine.rebuild(vec![Document::new("C", "a cat")]).await.unwrap();
    let status = engine.status().await;
    assert_eq!(status.generation, 2);
    assert_eq!(status.chunks, 1);
    assert_eq!(status.last_error, None);
}

#[tokio::test]
async fn reader_keeps_its_generation_across_swap() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let engine = engine(&embedder);
    engine.rebuild(fox_docs()).await.unwrap();

    let held = engine.current().await.unwrap();
    engine.rebuild(vec![Document::new("C", "a cat")]).await.unwrap();

    assert_eq!(held.generation(), 1);
    assert_eq!(held.len(), 2);
    let current = engine.current().await.unwrap();
    assert_eq!(current.generation(), 2);
    assert_eq!(current.len(), 1);
}

#[tokio::test]
async fn concurrent_rebuilds_are_serialized() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let engine = Arc::new(engine(&embedder));

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let docs = vec![Document::new(format!("doc{i}"), "quick fox ".repeat(i + 1))];
            engine.rebuild(docs).await.unwrap().generation()
        }));
    }

    let mut generations = Vec::new();
    for handle in handles {
        generations.push(handle.await.unwrap());
    }
    generations.sort_unstable();
    assert_eq!(generations, (1..=8).collect::<Vec<u64>>());
    assert_eq!(engine.status().await.generation, 8);
    assert_eq!(embedder.calls(), 8);
}

#[tokio::test]
async fn reload_reads_directory_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("02_dog.txt"), "jumps over the lazy dog").unwrap();
    std::fs::write(dir.path().join("01_fox.txt"), "The quick brown fox").unwrap();

    let embedder = Arc::new(KeywordEmbedder::default());
    let engine = engine(&embedder);
    let index = engine.reload(Arc::new(DirectorySource::new(dir.path()))).await.unwrap();

    let sections: Vec<&str> = index.chunks().iter().map(|c| c.chunk.section.as_str()).collect();
    assert_eq!(sections, vec!["01_fox.txt", "02_dog.txt"]);
    assert_eq!(engine.corpus().await.len(), 2);

    let hits = engine.search("lazy dog", 2).await.unwrap();
    assert_eq!(hits[0].chunk.section, "02_dog.txt");
}

#[tokio::test]
async fn k_bounds_hit_count() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let engine = RagEngine::new(embedder.clone(), Chunker::new(ChunkConfig::new(10, 2)));
    engine
        .rebuild(vec![Document::new("long", "the quick brown fox jumps over the lazy dog again")])
        .await
        .unwrap();

    let total = engine.current().await.unwrap().len();
    assert!(total > 3);
    assert_eq!(engine.search("fox", 3).await.unwrap().len(), 3);
    assert_eq!(engine.search("fox", total + 5).await.unwrap().len(), total);
}

/// Keyword embedder that parks any batch mentioning "cat" until released.
#[derive(Default)]
struct GatedEmbedder {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Embedder for GatedEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains("cat")) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(texts.iter().map(|t| KeywordEmbedder::vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        "gated"
    }
}

#[tokio::test]
async fn search_is_served_while_rebuild_is_embedding() {
    let embedder = Arc::new(GatedEmbedder::default());
    let engine = Arc::new(RagEngine::new(
        embedder.clone(),
        Chunker::new(ChunkConfig::new(900, 120)),
    ));
    engine.rebuild(fox_docs()).await.unwrap();

    let rebuild = tokio::spawn({
        let engine = engine.clone();
        async move {
            engine
                .rebuild(vec![Document::new("C", "a cat")])
                .await
                .map(|index| index.generation())
        }
    });
    embedder.entered.notified().await;

    let hits = timeout(Duration::from_secs(2), engine.search("fox", 5))
        .await
        .expect("search waited for the rebuild")
        .unwrap();
    let sections: Vec<&str> = hits.iter().map(|h| h.chunk.section.as_str()).collect();
    assert_eq!(sections, vec!["A", "B"]);
    assert_eq!(engine.current().await.unwrap().generation(), 1);

    embedder.release.notify_one();
    assert_eq!(rebuild.await.unwrap().unwrap(), 2);
    let status = engine.status().await;
    assert_eq!(status.generation, 2);
    assert_eq!(status.chunks, 1);
}

/// Source whose load blocks its thread until the test lets it finish.
struct HeldSource {
    release: std::sync::Mutex<mpsc::Receiver<()>>,
}

impl DocumentSource for HeldSource {
    fn load(&self) -> RagResult<Vec<Document>> {
        self.release
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(5))
            .map_err(|e| RagError::DocumentSource {
                path: "held".into(),
                source: std::io::Error::other(e),
            })?;
        Ok(vec![Document::new("C", "a cat")])
    }

    fn describe(&self) -> String {
        "held source".to_string()
    }
}

#[tokio::test]
async fn reload_does_not_block_the_runtime() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let engine = Arc::new(engine(&embedder));
    engine.rebuild(fox_docs()).await.unwrap();

    let (tx, rx) = mpsc::channel();
    let source = Arc::new(HeldSource {
        release: std::sync::Mutex::new(rx),
    });
    let reload = tokio::spawn({
        let engine = engine.clone();
        async move { engine.reload(source).await.map(|index| index.generation()) }
    });
    // Let the reload start its load on this single-threaded runtime.
    tokio::task::yield_now().await;

    let hits = timeout(Duration::from_secs(2), engine.search("fox", 1))
        .await
        .expect("search stalled behind the document load")
        .unwrap();
    assert_eq!(hits[0].chunk.section, "A");

    tx.send(()).unwrap();
    assert_eq!(reload.await.unwrap().unwrap(), 2);
    assert_eq!(engine.corpus().await[0].name, "C");
}
