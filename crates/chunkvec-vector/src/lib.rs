//! chunkvec-vector
//!
//! In-memory vector store with ranked similarity search. Records live for the
//! lifetime of the store; there is no persistence and no eviction.

pub mod distance;
pub mod store;

pub use distance::{cosine_similarity, dot_product, DistanceMeasure};
pub use store::{SearchOptions, VectorStore};
