use crate::error::IngestError;
use crate::extractor::PageText;
use crate::models::Chunk;
use tracing::debug;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Window geometry for the chunker. `overlap < size` is enforced at
/// construction so a window always advances.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self, IngestError> {
        if size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if overlap >= size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {overlap} must be smaller than chunk size {size}"
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn stride(&self) -> usize {
        self.size - self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Splits page texts into overlapping fixed-size windows. Windows are
/// measured in Unicode scalar values, never bytes. Chunks never span two
/// pages; the final window of a page is truncated to the remaining text.
/// Chunk indices increase monotonically across the whole document.
pub fn chunk_pages(pages: &[PageText], config: ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut cursor = 0u64;

    for page in pages {
        if page.text.trim().is_empty() {
            debug!(page = page.number, "page has no extractable text, skipping");
            continue;
        }

        let chars: Vec<char> = page.text.chars().collect();
        let mut start = 0;
        loop {
            let end = (start + config.size).min(chars.len());
            chunks.push(Chunk {
                chunk_index: cursor,
                page: page.number,
                text: chars[start..end].iter().collect(),
            });
            cursor += 1;

            if end == chars.len() {
                break;
            }
            start += config.stride();
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::{chunk_pages, ChunkingConfig};
    use crate::extractor::PageText;

    fn page(number: u32, text: impl Into<String>) -> PageText {
        PageText {
            number,
            text: text.into(),
        }
    }

    fn repeated(length: usize) -> String {
        let alphabet = "abcdefghijklmnopqrstuvwxyz";
        alphabet.chars().cycle().take(length).collect()
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(ChunkingConfig::new(0, 0).is_err());
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        assert!(ChunkingConfig::new(500, 500).is_err());
        assert!(ChunkingConfig::new(500, 600).is_err());
        assert!(ChunkingConfig::new(500, 100).is_ok());
    }

    #[test]
    fn short_page_yields_one_untruncated_chunk() {
        let config = ChunkingConfig::new(500, 100).expect("valid config");
        let text = repeated(450);
        let chunks = chunk_pages(&[page(1, text.clone())], config);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn two_page_document_chunks_with_exact_boundaries() {
        let config = ChunkingConfig::new(500, 100).expect("valid config");
        let first = repeated(450);
        let second = repeated(900);
        let chunks = chunk_pages(&[page(1, first.clone()), page(2, second.clone())], config);

        assert_eq!(chunks.len(), 3);

        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[0].text, first);

        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[1].page, 2);
        assert_eq!(chunks[1].text, second[0..500]);

        assert_eq!(chunks[2].chunk_index, 2);
        assert_eq!(chunks[2].page, 2);
        assert_eq!(chunks[2].text, second[400..900]);
    }

    #[test]
    fn overlapping_windows_reconstruct_the_page() {
        let config = ChunkingConfig::new(20, 4).expect("valid config");
        let text = repeated(73);
        let chunks = chunk_pages(&[page(1, text.clone())], config);

        let mut rebuilt = chunks[0].text.clone();
        for chunk in &chunks[1..] {
            rebuilt.push_str(&chunk.text[config.overlap()..]);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn empty_pages_produce_no_chunks() {
        let config = ChunkingConfig::default();
        let chunks = chunk_pages(
            &[page(1, ""), page(2, "   \n\t "), page(3, "actual text")],
            config,
        );

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page, 3);
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn indices_are_monotonic_across_pages() {
        let config = ChunkingConfig::new(10, 2).expect("valid config");
        let chunks = chunk_pages(
            &[page(1, repeated(25)), page(2, repeated(5)), page(3, repeated(12))],
            config,
        );

        let indices: Vec<u64> = chunks.iter().map(|chunk| chunk.chunk_index).collect();
        let expected: Vec<u64> = (0..chunks.len() as u64).collect();
        assert_eq!(indices, expected);
    }

    #[test]
    fn multibyte_text_is_split_on_character_boundaries() {
        let config = ChunkingConfig::new(500, 100).expect("valid config");
        let text: String = std::iter::repeat('é').take(600).collect();
        let chunks = chunk_pages(&[page(1, text)], config);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text.chars().count(), 500);
        assert_eq!(chunks[1].text.chars().count(), 200);
    }
}
