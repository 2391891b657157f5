//! Text chunking with overlap for embedding.
//!
//! Chunks end on the strongest natural boundary found near the size limit
//! (paragraph, line, sentence, word) and only fall back to a hard cut when
//! none exists. Every chunk after the first begins with exactly `overlap`
//! characters copied from the end of its predecessor, so stripping that
//! prefix and concatenating gives back the original text.

use crate::error::ChunkError;
use crate::models::{Chunk, IndexingConfig};
use crate::utils::text::has_content;

/// Text chunker that splits documents into overlapping chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    /// Maximum chunk length in characters
    max_size: usize,
    /// Characters shared between adjacent chunks
    overlap: usize,
}

impl TextChunker {
    pub fn new(max_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if overlap >= max_size {
            return Err(ChunkError::InvalidOverlap { max_size, overlap });
        }
        Ok(Self { max_size, overlap })
    }

    pub fn from_config(config: &IndexingConfig) -> Result<Self, ChunkError> {
        Self::new(config.chunk_size as usize, config.chunk_overlap as usize)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunks of at most `max_size` characters.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            if total - start <= self.max_size {
                chunks.push(chars[start..].iter().collect());
                break;
            }

            let target_end = start + self.max_size;
            let end = self.find_break_point(&chars, start, target_end);
            chunks.push(chars[start..end].iter().collect());

            // end > start + overlap, so start strictly advances
            start = end - self.overlap;
        }

        chunks
    }

    /// Chunk one document of a source, numbering chunks from `first_ordinal`.
    ///
    /// Whitespace-only pieces are dropped; ordinals stay contiguous.
    pub fn chunk(&self, source_id: &str, text: &str, first_ordinal: u32) -> Vec<Chunk> {
        self.split(text)
            .into_iter()
            .filter(|piece| has_content(piece))
            .zip(first_ordinal..)
            .map(|(text, ordinal)| Chunk {
                text,
                source_id: source_id.to_string(),
                ordinal,
            })
            .collect()
    }

    /// Pick the exclusive end of the chunk starting at `start`.
    ///
    /// Candidates lie in the last fifth of the window, but never inside the
    /// overlap prefix.
    fn find_break_point(&self, chars: &[char], start: usize, target_end: usize) -> usize {
        let floor = (start + self.overlap + 1).max(target_end.saturating_sub(self.max_size / 5));

        let mut last_paragraph = None;
        let mut last_newline = None;
        let mut last_sentence = None;
        let mut last_space = None;

        for end in floor..=target_end {
            let last = chars[end - 1];
            let before = end.checked_sub(2).map(|i| chars[i]);

            if last == '\n' {
                if before == Some('\n') {
                    last_paragraph = Some(end);
                }
                last_newline = Some(end);
            } else if last.is_whitespace() {
                if matches!(before, Some('.' | '!' | '?')) {
                    last_sentence = Some(end);
                }
                last_space = Some(end);
            }
        }

        last_paragraph
            .or(last_newline)
            .or(last_sentence)
            .or(last_space)
            .unwrap_or(target_end)
    }
}

/// Convenience wrapper validating parameters on every call.
pub fn split(text: &str, max_size: usize, overlap: usize) -> Result<Vec<String>, ChunkError> {
    Ok(TextChunker::new(max_size, overlap)?.split(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    fn reconstruct(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    // Deterministic pseudo-random prose with mixed boundaries.
    fn sample_text(seed: u64, words: usize) -> String {
        let vocab = [
            "docker", "container", "image", "volume", "the", "a", "network", "überprüfung",
            "compose", "registry", "naïve", "kubernetes",
        ];
        let mut state = seed;
        let mut out = String::new();
        for i in 0..words {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let pick = (state >> 33) as usize;
            out.push_str(vocab[pick % vocab.len()]);
            match pick % 17 {
                0 => out.push_str(".\n\n"),
                1 | 2 => out.push_str(". "),
                3 => out.push('\n'),
                _ if i + 1 < words => out.push(' '),
                _ => {}
            }
        }
        out
    }

    #[test]
    fn test_empty_input() {
        let chunker = TextChunker::new(100, 10).unwrap();
        assert!(chunker.split("").is_empty());
        assert!(chunker.split("   \n\n  ").is_empty());
    }

    #[test]
    fn test_small_input_single_chunk() {
        let chunker = TextChunker::new(1000, 200).unwrap();
        let chunks = chunker.split("Hello, world!");
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_invalid_overlap() {
        assert_eq!(
            TextChunker::new(100, 100),
            Err(ChunkError::InvalidOverlap {
                max_size: 100,
                overlap: 100
            })
        );
        assert!(split("text", 10, 20).is_err());
        assert!(TextChunker::new(100, 0).is_ok());
    }

    #[test]
    fn test_hard_cut_document_of_2500_chars() {
        let text = "x".repeat(2500);
        let chunks = split(&text, 1000, 200).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(char_len(&chunks[0]), 1000);
        assert_eq!(char_len(&chunks[1]), 1000);
        assert_eq!(char_len(&chunks[2]), 900);

        let tail: String = chunks[0].chars().skip(800).collect();
        assert!(chunks[1].starts_with(&tail));
    }

    #[test]
    fn test_word_document_of_2500_chars() {
        let text = "word ".repeat(500);
        assert_eq!(char_len(&text), 2500);
        let chunks = split(&text, 1000, 200).unwrap();

        assert_eq!(chunks.len(), 3);
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let tail: String = prev[prev.len() - 200..].iter().collect();
            assert!(pair[1].starts_with(&tail));
        }
        // word boundary, not mid-word
        assert!(chunks[0].ends_with(' '));
        assert_eq!(reconstruct(&chunks, 200), text);
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let mut text = "a".repeat(85);
        text.push_str("\n\n");
        text.push_str(&"b ".repeat(40));
        let chunks = split(&text, 100, 10).unwrap();

        assert!(chunks[0].ends_with("\n\n"));
        assert_eq!(char_len(&chunks[0]), 87);
    }

    #[test]
    fn test_prefers_sentence_over_space() {
        let text = format!("{}. {} {}", "a".repeat(85), "bb".repeat(3), "c".repeat(100));
        let chunks = split(&text, 100, 10).unwrap();

        assert!(chunks[0].ends_with(". "));
    }

    #[test]
    fn test_chunks_never_exceed_max_size() {
        for (max, overlap) in [(50, 0), (64, 16), (100, 99), (300, 50), (1000, 200)] {
            let text = sample_text(max as u64, 600);
            let chunks = split(&text, max, overlap).unwrap();
            for chunk in &chunks {
                assert!(char_len(chunk) <= max, "chunk longer than {max}");
            }
        }
    }

    #[test]
    fn test_reconstruction_loses_nothing() {
        for seed in 0..8u64 {
            for (max, overlap) in [(40, 0), (80, 20), (200, 199), (512, 64), (1000, 200)] {
                let text = sample_text(seed, 400);
                let chunks = split(&text, max, overlap).unwrap();
                let rebuilt = reconstruct(&chunks, overlap);

                let expected: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                let actual: String = rebuilt.chars().filter(|c| !c.is_whitespace()).collect();
                assert_eq!(actual, expected, "seed={seed} max={max} overlap={overlap}");
                assert_eq!(rebuilt, text);
            }
        }
    }

    #[test]
    fn test_multibyte_text_is_split_on_chars() {
        let text = "ü".repeat(250);
        let chunks = split(&text, 100, 20).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(char_len(&chunks[0]), 100);
        assert_eq!(reconstruct(&chunks, 20), text);
    }

    #[test]
    fn test_deterministic() {
        let text = sample_text(42, 500);
        assert_eq!(split(&text, 300, 60).unwrap(), split(&text, 300, 60).unwrap());
    }

    #[test]
    fn test_chunk_assigns_ordinals() {
        let chunker = TextChunker::new(100, 10).unwrap();
        let text = "z".repeat(250);
        let chunks = chunker.chunk("doc.txt", &text, 7);

        let ordinals: Vec<u32> = chunks.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![7, 8, 9]);
        assert!(chunks.iter().all(|c| c.source_id == "doc.txt"));
    }

    #[test]
    fn test_chunk_skips_whitespace_only_pieces() {
        let text = "a\n\n\n\n\n\nb";
        let pieces = split(text, 3, 1).unwrap();
        assert!(pieces.iter().any(|p| p.trim().is_empty()));
        assert_eq!(reconstruct(&pieces, 1), text);

        let chunks = TextChunker::new(3, 1).unwrap().chunk("gaps.txt", text, 0);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| !c.text.trim().is_empty()));
        let ordinals: Vec<u32> = chunks.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, (0..chunks.len() as u32).collect::<Vec<_>>());
    }
}
