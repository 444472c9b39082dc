use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chunkvec_core::{Embedder, Error, Metadata, TextSplitter};
use chunkvec_embed::HashEmbedder;
use chunkvec_text::RecursiveSplitter;
use chunkvec_vector::{SearchOptions, VectorStore};

const DIM: usize = 1024;

/// Wraps the hashing embedder and counts calls per code path.
#[derive(Default)]
struct Counting {
    one: AtomicUsize,
    batch: AtomicUsize,
    batch_async: AtomicUsize,
    short_by: usize,
}

impl Counting {
    fn inner() -> HashEmbedder {
        HashEmbedder::new(DIM).expect("embedder")
    }
}

#[async_trait]
impl Embedder for Counting {
    fn dim(&self) -> usize {
        DIM
    }

    fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.one.fetch_add(1, Ordering::SeqCst);
        Self::inner().embed_one(text)
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.batch.fetch_add(1, Ordering::SeqCst);
        Self::inner().embed_batch(texts)
    }

    async fn embed_batch_async(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.batch_async.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let mut out = Self::inner().embed_batch(texts)?;
        out.truncate(out.len().saturating_sub(self.short_by));
        Ok(out)
    }
}

struct Failing;

impl Embedder for Failing {
    fn dim(&self) -> usize {
        4
    }
    fn embed_one(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("backend unavailable")
    }
    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("backend unavailable")
    }
}

fn pets() -> Vec<String> {
    [
        "I like to eat broccoli and bananas.",
        "I ate a banana and spinach smoothie for breakfast.",
        "Chinchillas and kittens are cute.",
        "My sister adopted a kitten yesterday.",
        "Look at this cute hamster munching on a piece of broccoli.",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

#[tokio::test]
async fn build_issues_exactly_one_batch_call() {
    let embedder = Arc::new(Counting::default());
    let store = VectorStore::new(embedder.clone());
    let texts = pets();

    store.build_from_texts(&texts, None).await.expect("build");

    assert_eq!(embedder.batch_async.load(Ordering::SeqCst), 1);
    assert_eq!(embedder.one.load(Ordering::SeqCst), 0);
    assert_eq!(store.len(), texts.len());
    assert_eq!(store.keys(), texts);
}

#[tokio::test]
async fn retrieve_round_trips_and_overwrites() {
    let store = VectorStore::new(Arc::new(Counting::default()));
    store.build_from_texts(&pets(), None).await.expect("build");

    let key = "I like to eat broccoli and bananas.";
    let built = store.retrieve(key).expect("present");
    assert_eq!(built, Counting::inner().embed_one(key).expect("embed"));

    let replacement = vec![0.5; DIM];
    store.insert(key, replacement.clone(), None);
    assert_eq!(store.retrieve(key), Some(replacement));
    assert_eq!(store.retrieve("never inserted"), None);
}

#[tokio::test]
async fn text_search_finds_shared_words() {
    let embedder = Arc::new(Counting::default());
    let store = VectorStore::new(embedder.clone());
    store.build_from_texts(&pets(), None).await.expect("build");

    let keys = store.search_keys_by_text("My sister adopted a kitten yesterday.", 2).expect("search");
    assert_eq!(keys[0], "My sister adopted a kitten yesterday.");
    assert_eq!(keys.len(), 2);
    assert_eq!(embedder.one.load(Ordering::SeqCst), 1);

    let hits = store
        .search_by_text_async("kitten yesterday sister", 5, &SearchOptions::default())
        .await
        .expect("async search");
    assert_eq!(hits.len(), 5);
    assert_eq!(hits[0].key, "My sister adopted a kitten yesterday.");
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn chunks_keep_their_metadata() {
    let splitter = RecursiveSplitter::new(40, 10).expect("splitter");
    let texts = vec![pets().join("\n"), "Chinchillas and kittens are cute.".to_string()];
    let metadatas = [Metadata::new("notes.txt").with_path("/data/notes.txt"), Metadata::new("short.txt")];
    let chunks = splitter.split_with_metadata(&texts, Some(&metadatas)).expect("split");

    let embedder = Arc::new(Counting::default());
    let store = VectorStore::new(embedder.clone());
    store.build_from_chunks(&chunks).await.expect("build");
    assert_eq!(embedder.batch_async.load(Ordering::SeqCst), 1);

    let hits = store
        .search_by_text_with("hamster broccoli", 1, &SearchOptions::default().with_metadata())
        .expect("search");
    let meta = hits[0].metadata.as_ref().expect("metadata");
    assert_eq!(meta.source, "notes.txt");
    assert!(meta.chunk_index.expect("index") < meta.total_chunks.expect("total"));
}

#[tokio::test]
async fn empty_and_punctuation_chunks_do_not_break_search() {
    let splitter = RecursiveSplitter::new(10, 0).expect("splitter");
    let texts = vec!["alpha\n\n* * *\n\nbeta".to_string(), String::new()];
    let chunks = splitter.split_with_metadata(&texts, None).expect("split");
    let pieces: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(pieces, vec!["alpha", "* * *", "beta", ""]);

    let store = VectorStore::new(Arc::new(Counting::default()));
    store.build_from_chunks(&chunks).await.expect("build");
    assert_eq!(store.len(), 4);

    let hits = store.search_by_text_with("alpha", 2, &SearchOptions::default()).expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].key, "alpha");
    assert_eq!(hits[0].score, 1.0);
    assert_eq!(hits[1].score, 0.0);

    let blank = store.search_by_text("", 1).expect("blank query");
    assert_eq!(blank[0].key, "* * *");
}

#[tokio::test]
async fn metadata_is_attached_per_text() {
    let store = VectorStore::new(Arc::new(Counting::default()));
    let texts = vec!["alpha beta".to_string(), "gamma delta".to_string()];
    let metadatas = [Metadata::new("a"), Metadata::new("b")];
    store.build_from_texts(&texts, Some(&metadatas)).await.expect("build");
    assert_eq!(store.metadata("gamma delta").map(|m| m.source), Some("b".to_string()));
}

#[tokio::test]
async fn mismatched_metadata_is_rejected_before_embedding() {
    let embedder = Arc::new(Counting::default());
    let store = VectorStore::new(embedder.clone());
    let err = store.build_from_texts(&pets(), Some(&[Metadata::new("one")])).await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert_eq!(embedder.batch_async.load(Ordering::SeqCst), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn short_batch_from_embedder_is_an_error() {
    let store = VectorStore::new(Arc::new(Counting { short_by: 1, ..Counting::default() }));
    let err = store.build_from_texts(&pets(), None).await.unwrap_err();
    assert!(matches!(err, Error::Embedding(_)));
    assert!(store.is_empty());
}

#[tokio::test]
async fn embedder_failures_surface_as_embedding_errors() {
    let store = VectorStore::new(Arc::new(Failing));
    let err = store.build_from_texts(&pets(), None).await.unwrap_err();
    assert!(err.to_string().contains("backend unavailable"), "{err}");
    assert!(matches!(store.search_by_text("q", 1), Err(Error::Embedding(_))));
}

#[test]
fn readers_see_old_or_new_during_concurrent_inserts() {
    let store = Arc::new(VectorStore::new(Arc::new(Counting::default())));
    store.insert("k", vec![1.0, 0.0], None);

    let writer = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            for i in 0..500u16 {
                let v = if i % 2 == 0 { vec![0.0, 1.0] } else { vec![1.0, 0.0] };
                store.insert("k", v, None);
                store.insert(format!("extra-{i}"), vec![1.0, 1.0], None);
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let v = store.retrieve("k").expect("k is never removed");
                    assert!(v == vec![1.0, 0.0] || v == vec![0.0, 1.0], "torn read {v:?}");
                    let hits = store.search(&[1.0, 0.0], 3).expect("search");
                    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
                }
            })
        })
        .collect();

    writer.join().expect("writer");
    for r in readers {
        r.join().expect("reader");
    }
    assert_eq!(store.len(), 501);
}

#[tokio::test]
async fn concurrent_async_searches_share_the_store() {
    let store = Arc::new(VectorStore::new(Arc::new(Counting::default())));
    store.build_from_texts(&pets(), None).await.expect("build");

    let queries = ["broccoli", "kitten", "smoothie", "hamster"];
    let searches = queries.iter().map(|q| {
        let store = Arc::clone(&store);
        async move { store.search_by_text_async(q, 1, &SearchOptions::default()).await }
    });
    let results = futures::future::join_all(searches).await;
    for (q, hits) in queries.iter().zip(results) {
        let hits = hits.expect("search");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].key.to_lowercase().contains(q), "{q} -> {}", hits[0].key);
    }
}
