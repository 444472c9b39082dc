use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chunkvec_core::{Chunk, Embedder, Error, Key, Metadata, Result, SearchHit};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::distance::{cosine_similarity, DistanceMeasure};

#[derive(Clone, Copy)]
pub struct SearchOptions {
    pub distance: DistanceMeasure,
    pub with_metadata: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { distance: cosine_similarity, with_metadata: false }
    }
}

impl fmt::Debug for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions").field("with_metadata", &self.with_metadata).finish_non_exhaustive()
    }
}

impl SearchOptions {
    #[must_use]
    pub fn with_metadata(mut self) -> Self {
        self.with_metadata = true;
        self
    }

    #[must_use]
    pub fn distance(mut self, distance: DistanceMeasure) -> Self {
        self.distance = distance;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Record {
    vector: Vec<f32>,
    metadata: Option<Metadata>,
}

/// In-memory key → vector store with ranked similarity search.
///
/// Records keep the position of their first insertion; re-inserting a key
/// replaces vector and metadata in place, so ties keep ranking by original
/// insertion order. Reads and writes go through an `RwLock`: a search that
/// races an insert sees either the old or the new record.
///
/// Numeric errors abort the whole search at the first offending record.
pub struct VectorStore {
    records: RwLock<IndexMap<Key, Record>>,
    embedder: Arc<dyn Embedder>,
}

impl VectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { records: RwLock::new(IndexMap::new()), embedder }
    }

    // every write is a single map operation, so a poisoned map is still consistent
    fn read(&self) -> RwLockReadGuard<'_, IndexMap<Key, Record>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<Key, Record>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `vector` under `key`, replacing any previous record whole.
    /// Dimensionality is checked at search time, not here.
    pub fn insert(&self, key: impl Into<Key>, vector: Vec<f32>, metadata: Option<Metadata>) {
        self.write().insert(key.into(), Record { vector, metadata });
    }

    pub fn retrieve(&self, key: &str) -> Option<Vec<f32>> {
        self.read().get(key).map(|r| r.vector.clone())
    }

    pub fn metadata(&self, key: &str) -> Option<Metadata> {
        self.read().get(key).and_then(|r| r.metadata.clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<Key> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Top `k` records by cosine similarity, without metadata.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.search_with(query, k, &SearchOptions::default())
    }

    /// Up to `k` hits sorted by descending score; equal scores keep insertion
    /// order. Every stored vector must match the query's length.
    pub fn search_with(&self, query: &[f32], k: usize, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let records = self.read();
        let mut scored = Vec::with_capacity(records.len());
        for (key, record) in records.iter() {
            if record.vector.len() != query.len() {
                return Err(Error::DimensionMismatch { expected: query.len(), actual: record.vector.len() });
            }
            let score = (options.distance)(query, &record.vector)?;
            scored.push((key, score, record));
        }

        // stable sort; NaN from a custom measure ranks last
        let rank = |s: f32| if s.is_nan() { f32::NEG_INFINITY } else { s };
        scored.sort_by(|a, b| rank(b.1).total_cmp(&rank(a.1)));
        scored.truncate(k);

        debug!(candidates = records.len(), returned = scored.len(), "vector search");
        Ok(scored
            .into_iter()
            .map(|(key, score, record)| SearchHit {
                key: key.clone(),
                score,
                metadata: if options.with_metadata { record.metadata.clone() } else { None },
            })
            .collect())
    }

    /// Embeds `text` with the blocking single-text path, then searches.
    pub fn search_by_text(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        self.search_by_text_with(text, k, &SearchOptions::default())
    }

    pub fn search_by_text_with(&self, text: &str, k: usize, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let query = self.embedder.embed_one(text).map_err(|e| Error::embedding(&e))?;
        self.search_with(&query, k, options)
    }

    /// Same as [`search_by_text_with`](Self::search_by_text_with) through the
    /// suspending embedding path. Dropping the future cancels the embedding call.
    pub async fn search_by_text_async(&self, text: &str, k: usize, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let query = self.embedder.embed_one_async(text).await.map_err(|e| Error::embedding(&e))?;
        self.search_with(&query, k, options)
    }

    /// Only the matching keys, best first. Keys built from texts are the
    /// texts themselves.
    pub fn search_keys_by_text(&self, text: &str, k: usize) -> Result<Vec<Key>> {
        Ok(self.search_by_text(text, k)?.into_iter().map(|hit| hit.key).collect())
    }

    /// Embeds all `texts` with a single batch call and inserts each vector
    /// under its text. Records become visible once the returned future
    /// resolves; no lock is held while the embedder runs.
    pub async fn build_from_texts(&self, texts: &[String], metadatas: Option<&[Metadata]>) -> Result<()> {
        if let Some(metadatas) = metadatas {
            if metadatas.len() != texts.len() {
                return Err(Error::config(format!(
                    "number of texts ({}) and metadatas ({}) must match",
                    texts.len(),
                    metadatas.len()
                )));
            }
        }
        if texts.is_empty() {
            return Ok(());
        }

        let vectors = self.embed_all(texts).await?;
        let mut records = self.write();
        for (i, (text, vector)) in texts.iter().zip(vectors).enumerate() {
            let metadata = metadatas.map(|m| m[i].clone());
            records.insert(text.clone(), Record { vector, metadata });
        }
        info!(inserted = texts.len(), total = records.len(), "built vectors from texts");
        Ok(())
    }

    /// Batch-embeds chunk texts and stores each chunk keyed by its text with
    /// its metadata attached.
    pub async fn build_from_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embed_all(&texts).await?;
        let mut records = self.write();
        for (chunk, vector) in chunks.iter().zip(vectors) {
            records.insert(chunk.text.clone(), Record { vector, metadata: Some(chunk.metadata.clone()) });
        }
        info!(inserted = chunks.len(), total = records.len(), "built vectors from chunks");
        Ok(())
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.embedder.embed_batch_async(texts).await.map_err(|e| Error::embedding(&e))?;
        if vectors.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}
