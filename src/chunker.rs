// src/chunker.rs
// Pure, deterministic text chunking: a couple of free functions plus
// inline `#[cfg(test)]` coverage, no service state.

/// Default overlap between consecutive chunks, in Unicode scalar values.
pub const DEFAULT_OVERLAP: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Target chunk size in code points. Spec bounds this to 200–500.
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 400,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkerConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.clamp(200, 500),
            overlap,
        }
    }
}

/// Splits `text` into overlapping, Unicode-safe chunks of `config.chunk_size`
/// code points with `config.overlap` code points of overlap between
/// consecutive chunks. Each chunk is trimmed of leading/trailing whitespace.
/// Empty input yields zero chunks.
pub fn chunk_text(text: &str, config: ChunkerConfig) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let runes: Vec<char> = text.chars().collect();
    let n = runes.len();
    let stride = config.chunk_size.saturating_sub(config.overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + config.chunk_size).min(n);
        let slice: String = runes[start..end].iter().collect();
        let trimmed = slice.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        if end >= n {
            break;
        }
        start += stride;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_zero_chunks() {
        assert_eq!(chunk_text("", ChunkerConfig::default()).len(), 0);
    }

    #[test]
    fn exact_chunk_size_yields_one_chunk() {
        let cfg = ChunkerConfig::new(200, 50);
        let text: String = "a".repeat(200);
        let chunks = chunk_text(&text, cfg);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chars().count(), 200);
    }

    #[test]
    fn overlap_is_unicode_safe() {
        // Multi-byte codepoints throughout; must never panic on a split boundary.
        let text: String = "héllo wörld 日本語テキスト".repeat(40);
        let cfg = ChunkerConfig::new(200, 50);
        let chunks = chunk_text(&text, cfg);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.chars().count() <= 200);
        }
    }

    #[test]
    fn chunks_overlap_by_configured_amount() {
        let cfg = ChunkerConfig::new(200, 50);
        let text: String = (0..1000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunk_text(&text, cfg);
        assert!(chunks.len() > 1);
        // second chunk's first 50 chars equal first chunk's trailing run,
        // modulo trimming — check containment instead of exact equality.
        let first_tail: String = chunks[0].chars().rev().take(10).collect();
        let first_tail: String = first_tail.chars().rev().collect();
        assert!(chunks[1].contains(&first_tail) || chunks[0].len() < 60);
    }

    #[test]
    fn pure_function_is_deterministic() {
        let cfg = ChunkerConfig::new(250, 30);
        let text = "the quick brown fox jumps over the lazy dog ".repeat(30);
        assert_eq!(chunk_text(&text, cfg), chunk_text(&text, cfg));
    }
}
