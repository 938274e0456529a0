//! Word-window chunker.
//!
//! Paragraphs are flattened into one whitespace-separated token stream and
//! cut into fixed-size windows that overlap by a configurable number of
//! tokens. Sentence and paragraph boundaries are not preserved.

use crate::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::document::Document;
use crate::error::{RagError, Result};

/// A retrieval unit cut from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source_filename: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker {
    /// Fails unless `overlap < chunk_size`, so the window always advances.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(RagError::InvalidChunking { chunk_size, overlap });
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let joined = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let words: Vec<&str> = joined.split_whitespace().collect();

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += self.step();
        }
        chunks
    }

    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        self.split(&document.content)
            .into_iter()
            .map(|text| Chunk {
                text,
                source_filename: document.filename.clone(),
            })
            .collect()
    }
}
