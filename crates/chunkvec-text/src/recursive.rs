//! Boundary-aware recursive splitter.
//!
//! Text is cut on the highest-priority separator first. Pieces that are still
//! larger than `chunk_size` are cut again with the remaining, lower-priority
//! separators, and the resulting pieces are greedily merged back into chunks
//! of at most `chunk_size` chars with up to `chunk_overlap` chars carried over
//! between neighbours.

use chunkvec_core::{Result, TextSplitter};
use tracing::debug;

use crate::{char_len, validate, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

/// Paragraph, line, sentence, word, then single characters.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl RecursiveSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap, ..Self::default() })
    }

    /// Replaces the separator priority list. Keep `""` last to guarantee
    /// every chunk fits; without it an unbreakable piece is emitted as is.
    #[must_use]
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn separators(&self) -> &[String] {
        &self.separators
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let Some((separator, rest)) = separators.split_first() else {
            return vec![text.to_string()];
        };

        let pieces = split_on(text, separator);
        let fits = pieces.iter().all(|p| char_len(p) <= self.chunk_size);
        if fits || rest.is_empty() {
            return self.merge(&pieces, separator);
        }

        let mut refined: Vec<String> = Vec::with_capacity(pieces.len());
        for piece in pieces {
            if char_len(piece) <= self.chunk_size {
                refined.push(piece.to_string());
            } else {
                debug!(len = char_len(piece), remaining = rest.len(), "re-splitting oversized piece");
                refined.extend(self.split_with(piece, rest));
            }
        }
        self.merge(&refined, separator)
    }

    fn merge<S: AsRef<str>>(&self, pieces: &[S], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        // each accumulated piece counts with one trailing separator
        let mut current_len = 0usize;

        for piece in pieces {
            let piece = piece.as_ref();
            let piece_len = char_len(piece);

            if current_len + piece_len + sep_len > self.chunk_size && !current.is_empty() {
                chunks.push(current.join(separator));

                let keep = self.overlap_tail(&current, sep_len);
                current.drain(..current.len() - keep);
                current_len = joined_len(&current, sep_len);

                // the carried tail must still leave room for the incoming piece
                while !current.is_empty() && current_len + piece_len + sep_len > self.chunk_size {
                    current.remove(0);
                    current_len = joined_len(&current, sep_len);
                }
            }

            current.push(piece);
            current_len += piece_len + sep_len;
        }

        if !current.is_empty() {
            chunks.push(current.join(separator));
        }
        chunks
    }

    /// Number of trailing pieces whose lengths, each with one separator,
    /// stay within `chunk_overlap`.
    fn overlap_tail(&self, pieces: &[&str], sep_len: usize) -> usize {
        let mut total = 0;
        let mut keep = 0;
        for piece in pieces.iter().rev() {
            total += char_len(piece) + sep_len;
            if total > self.chunk_overlap {
                break;
            }
            keep += 1;
        }
        keep
    }
}

impl TextSplitter for RecursiveSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let chunks = self.split_with(text, &self.separators);
        debug!(chars = char_len(text), chunks = chunks.len(), "split text");
        chunks
    }
}

/// `""` splits into single chars; any other separator splits on its literal
/// occurrences, keeping empty pieces.
fn split_on<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
    } else {
        text.split(separator).collect()
    }
}

fn joined_len(pieces: &[&str], sep_len: usize) -> usize {
    pieces.iter().map(|p| char_len(p)).sum::<usize>() + sep_len * pieces.len().saturating_sub(1)
}
