//! Text Chunker: splits page text into token-bounded, overlapping chunks.
//!
//! Tokens are cl100k_base BPE tokens. Consecutive chunks share exactly
//! `overlap` tokens; only the final chunk may be shorter than `chunk_size`.

use std::ops::Range;

use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::errors::PipelineError;

/// A bounded slice of the source text, addressed by token offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub token_start: usize,
    pub token_end: usize,
}

impl Chunk {
    pub fn token_len(&self) -> usize {
        self.token_end - self.token_start
    }
}

/// Ordered chunks of one job posting.
#[derive(Debug, Clone, Default)]
pub struct ChunkSet {
    chunks: Vec<Chunk>,
}

impl ChunkSet {
    /// Wraps already-cut chunks, renumbering them in order.
    pub fn from_chunks(mut chunks: Vec<Chunk>) -> Self {
        for (index, chunk) in chunks.iter_mut().enumerate() {
            chunk.index = index;
        }
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    /// Chunk bodies in order, ready for embedding.
    pub fn texts(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.text.clone()).collect()
    }
}

pub struct TextChunker {
    bpe: CoreBPE,
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Loads the tokenizer. Fails if the sizes are unusable or the BPE ranks cannot load.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, PipelineError> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(PipelineError::Configuration(format!(
                "invalid chunking: size {chunk_size}, overlap {overlap}"
            )));
        }
        let bpe = cl100k_base()
            .map_err(|e| PipelineError::Configuration(format!("Failed to load tokenizer: {e}")))?;
        Ok(Self {
            bpe,
            chunk_size,
            overlap,
        })
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Splits `text` into overlapping chunks. Blank text yields an empty set.
    pub fn chunk(&self, text: &str) -> ChunkSet {
        if text.trim().is_empty() {
            return ChunkSet::default();
        }

        let tokens = self.bpe.encode_ordinary(text);
        // A window boundary can fall inside a multi-byte character; those tokens
        // decode to U+FFFD instead of failing the whole chunk.
        let decode = |window: Range<usize>| -> String {
            let slice = &tokens[window];
            match self.bpe.decode(slice.to_vec()) {
                Ok(text) => text,
                Err(_) => slice
                    .iter()
                    .map(|token| {
                        self.bpe
                            .decode(vec![*token])
                            .unwrap_or_else(|_| char::REPLACEMENT_CHARACTER.to_string())
                    })
                    .collect(),
            }
        };

        let chunks: Vec<Chunk> = token_windows(tokens.len(), self.chunk_size, self.overlap)
            .into_iter()
            .enumerate()
            .map(|(index, window)| Chunk {
                index,
                token_start: window.start,
                token_end: window.end,
                text: decode(window),
            })
            .collect();

        ChunkSet::from_chunks(chunks)
    }
}

/// Token ranges covering `0..total` in windows of `size` that advance by `size - overlap`.
pub fn token_windows(total: usize, size: usize, overlap: usize) -> Vec<Range<usize>> {
    let mut windows = Vec::new();
    if total == 0 || size == 0 || overlap >= size {
        return windows;
    }

    let step = size - overlap;
    let mut start = 0;
    loop {
        let end = (start + size).min(total);
        windows.push(start..end);
        if end >= total {
            break;
        }
        start += step;
    }
    windows
}
