use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{Chunk, Document, Metadata};

/// Turns one text into ordered pieces. The binding of provenance metadata is
/// shared by every splitter through the provided methods.
pub trait TextSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;

    fn split_texts(&self, texts: &[String]) -> Vec<String> {
        texts.iter().flat_map(|t| self.split(t)).collect()
    }

    /// Splits every text and tags each piece with its source metadata plus
    /// `chunk_index`/`total_chunks`. Missing metadata becomes
    /// `{source: "document_<i>"}` by input position.
    fn split_with_metadata(&self, texts: &[String], metadatas: Option<&[Metadata]>) -> Result<Vec<Chunk>> {
        let defaults: Vec<Metadata>;
        let metadatas = match metadatas {
            Some(m) => m,
            None => {
                defaults = (0..texts.len()).map(Metadata::positional).collect();
                &defaults
            }
        };
        if texts.len() != metadatas.len() {
            return Err(Error::config(format!(
                "number of texts ({}) and metadatas ({}) must match",
                texts.len(),
                metadatas.len()
            )));
        }

        let mut chunks = Vec::new();
        for (text, metadata) in texts.iter().zip(metadatas) {
            bind(self.split(text), metadata, &mut chunks);
        }
        Ok(chunks)
    }

    /// Same as [`split_with_metadata`](Self::split_with_metadata) for loader output;
    /// documents without metadata get the positional default.
    fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().enumerate().flat_map(|(i, doc)| self.split_document(i, doc)).collect()
    }

    /// Chunks of one document found at `position` among its siblings, which
    /// names it when it carries no metadata.
    fn split_document(&self, position: usize, document: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        match &document.metadata {
            Some(metadata) => bind(self.split(&document.text), metadata, &mut chunks),
            None => bind(self.split(&document.text), &Metadata::positional(position), &mut chunks),
        }
        chunks
    }
}

fn bind(pieces: Vec<String>, metadata: &Metadata, out: &mut Vec<Chunk>) {
    let total = pieces.len();
    out.extend(
        pieces
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk { text, metadata: metadata.for_chunk(index, total) }),
    );
}

/// External embedding model: text in, fixed-length vector out.
///
/// `embed_batch` is its own code path so backends that can batch are called
/// once per batch. The async forms default to the blocking ones; backends that
/// do network I/O should override them.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>>;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    async fn embed_one_async(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_one(text)
    }

    async fn embed_batch_async(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.embed_batch(texts)
    }
}
