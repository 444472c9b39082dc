//! Domain types shared by the splitters and the vector store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Key = String;

/// Provenance attached to a document and to every chunk cut from it.
///
/// - `source`: origin identifier (file name, or `document_<i>` when absent)
/// - `chunk_index`/`total_chunks`: position among sibling chunks, set by the binder
/// - `path`/`num_pages`: loader-specific, optional
/// - `extra`: open extension map, flattened on (de)serialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_pages: Option<usize>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into(), ..Self::default() }
    }

    /// Default provenance for the input at `position`: `document_<position>`.
    pub fn positional(position: usize) -> Self {
        Self::new(format!("document_{position}"))
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Copy of `self` positioned as chunk `index` of `total`.
    #[must_use]
    pub fn for_chunk(&self, index: usize, total: usize) -> Self {
        Self { chunk_index: Some(index), total_chunks: Some(total), ..self.clone() }
    }
}

/// A bounded-size fragment of a source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: Metadata,
}

/// Raw text as produced by a loader, before splitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: Option<Metadata>,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: Option<Metadata>) -> Self {
        Self { text: text.into(), metadata }
    }
}

/// One ranked result from a similarity search.
///
/// `score` is measure-specific but higher is always closer. `metadata` is only
/// populated when the caller asked for it and the record carries some.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub key: Key,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}
