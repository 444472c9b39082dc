use chunkvec_core::{Result, TextSplitter};

use crate::{validate, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

/// Fixed-window splitter: pure offset arithmetic, no boundary awareness.
///
/// Window `i` starts at char `i * (chunk_size - chunk_overlap)` and spans
/// `chunk_size` chars; the last window may be shorter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for CharacterSplitter {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

impl CharacterSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Lazily yields the windows of `text`. Clone the iterator to restart it.
    pub fn windows<'a>(&self, text: &'a str) -> Windows<'a> {
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        Windows { text, offsets, start: 0, size: self.chunk_size, step: self.chunk_size - self.chunk_overlap }
    }
}

impl TextSplitter for CharacterSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        self.windows(text).map(str::to_string).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Windows<'a> {
    text: &'a str,
    // byte offset of every char start, plus the end of the text
    offsets: Vec<usize>,
    start: usize,
    size: usize,
    step: usize,
}

impl<'a> Iterator for Windows<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let chars = self.offsets.len() - 1;
        if self.start >= chars {
            return None;
        }
        let end = (self.start + self.size).min(chars);
        let window = &self.text[self.offsets[self.start]..self.offsets[end]];
        self.start += self.step;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let chars = self.offsets.len() - 1;
        let left = chars.saturating_sub(self.start).div_ceil(self.step);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Windows<'_> {}
