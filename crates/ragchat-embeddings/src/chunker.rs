//! Text chunking for embedding.
//!
//! Documents are split into fixed-size, overlapping windows measured in
//! characters. Windows always start and end on `char` boundaries.

use tracing::warn;

/// Chunking configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum chunk size in characters.
    pub size: usize,
    /// Characters shared between consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: 900,
            overlap: 120,
        }
    }
}

impl ChunkConfig {
    /// Create a config with the given size and overlap.
    pub fn new(size: usize, overlap: usize) -> Self {
        Self { size, overlap }
    }

    /// Window size actually used. Zero is treated as one.
    pub fn effective_size(&self) -> usize {
        self.size.max(1)
    }

    /// Overlap actually used: clamped to `size - 1` so every window advances.
    pub fn effective_overlap(&self) -> usize {
        self.overlap.min(self.effective_size() - 1)
    }
}

/// Text chunker.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    /// Create a new chunker with config.
    pub fn new(config: ChunkConfig) -> Self {
        if config.overlap >= config.effective_size() {
            warn!(
                size = config.size,
                overlap = config.overlap,
                "chunk overlap >= size, clamping overlap to {}",
                config.effective_overlap()
            );
        }
        Self { config }
    }

    /// The configuration this chunker was built with.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Split text into chunks.
    ///
    /// Leading and trailing whitespace is trimmed first; blank input yields
    /// no chunks. Every chunk but the last has exactly `size` characters.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char, plus the end of the text.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_len = bounds.len() - 1;

        let size = self.config.effective_size();
        let overlap = self.config.effective_overlap();

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < char_len {
            let end = (start + size).min(char_len);
            chunks.push(Chunk {
                text: text[bounds[start]..bounds[end]].to_string(),
                start: bounds[start],
                end: bounds[end],
                index: chunks.len(),
            });

            if end == char_len {
                break;
            }
            start = end - overlap;
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkConfig::default())
    }
}

/// A chunk of text with position info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text.
    pub text: String,
    /// Start byte offset in the trimmed text.
    pub start: usize,
    /// End byte offset in the trimmed text.
    pub end: usize,
    /// Chunk index, 0-based.
    pub index: usize,
}

impl Chunk {
    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
