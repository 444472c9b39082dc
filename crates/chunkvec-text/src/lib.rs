//! chunkvec-text
//!
//! Splitters that turn raw text into bounded-size chunks, and a `.txt` loader
//! that produces the documents they consume. Metadata binding comes from
//! [`TextSplitter`] and works with either splitter.

pub mod character;
pub mod loader;
pub mod recursive;

pub use character::{CharacterSplitter, Windows};
pub use chunkvec_core::TextSplitter;
pub use loader::TextFileLoader;
pub use recursive::{RecursiveSplitter, DEFAULT_SEPARATORS};

use chunkvec_core::{Error, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

pub(crate) fn validate(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(Error::config("chunk_size must be greater than zero"));
    }
    if chunk_overlap >= chunk_size {
        return Err(Error::config(format!(
            "chunk_size ({chunk_size}) must be greater than chunk_overlap ({chunk_overlap})"
        )));
    }
    Ok(())
}

/// Length in chars, the unit every size and overlap is measured in.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}
