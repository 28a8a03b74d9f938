use serde_json::Value;

use super::loader::PageText;
use crate::model::Chunk;

/// Separators tried in order: paragraph, line, then sentence terminators.
pub const SEPARATORS: &[&str] = &["\n\n", "\n", ".", "!", "?"];

pub const DEFAULT_MAX_CHARS: usize = 1000;

/// Recursive splitter with no overlap.
///
/// Text is cut at the coarsest separator present, and adjacent pieces are merged back
/// up to `max_chars`. A piece still over the limit is split again with the next
/// separator; a run with no separator left is cut at the character limit. Separators
/// stay attached to the piece they end. Lengths are counted in characters.
#[derive(Debug, Clone)]
pub struct Chunker {
    max_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS)
    }
}

impl Chunker {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.split_into(text, SEPARATORS, &mut out);
        out
    }

    /// Chunks for every page, in order. Page metadata is copied to each chunk, plus
    /// its position in the document as `chunk_index`.
    pub fn split_pages(&self, pages: &[PageText]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in pages {
            for text in self.split_text(&page.text) {
                let mut metadata = page.metadata.clone();
                metadata.insert("chunk_index".to_string(), Value::from(chunks.len()));
                chunks.push(Chunk::new(text).with_metadata(metadata));
            }
        }
        tracing::debug!(chunks = chunks.len(), max_chars = self.max_chars, "document chunked");
        chunks
    }

    fn split_into(&self, text: &str, separators: &[&str], out: &mut Vec<String>) {
        let Some(pos) = separators.iter().position(|s| text.contains(s)) else {
            self.hard_split(text, out);
            return;
        };
        let separator = separators[pos];
        let finer = &separators[pos + 1..];

        let mut pending: Vec<&str> = Vec::new();
        for piece in text.split_inclusive(separator) {
            if char_len(piece) <= self.max_chars {
                pending.push(piece);
            } else {
                self.merge(&pending, out);
                pending.clear();
                self.split_into(piece, finer, out);
            }
        }
        self.merge(&pending, out);
    }

    fn merge(&self, pieces: &[&str], out: &mut Vec<String>) {
        let mut current = String::new();
        let mut current_len = 0;
        for piece in pieces {
            let len = char_len(piece);
            if current_len + len > self.max_chars && !current.is_empty() {
                push_trimmed(&current, out);
                current.clear();
                current_len = 0;
            }
            current.push_str(piece);
            current_len += len;
        }
        push_trimmed(&current, out);
    }

    fn hard_split(&self, text: &str, out: &mut Vec<String>) {
        let chars: Vec<char> = text.chars().collect();
        for window in chars.chunks(self.max_chars) {
            push_trimmed(&window.iter().collect::<String>(), out);
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_trimmed(text: &str, out: &mut Vec<String>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;

    #[test]
    fn short_text_is_one_chunk() {
        let chunker = Chunker::default();
        assert_eq!(chunker.split_text("  전투 시스템 개요  "), vec!["전투 시스템 개요"]);
    }

    #[test]
    fn empty_text_gives_no_chunks() {
        assert!(Chunker::default().split_text(" \n\n ").is_empty());
    }

    #[test]
    fn paragraphs_are_merged_up_to_the_limit() {
        let chunker = Chunker::new(12);
        let chunks = chunker.split_text("aaaa\n\nbbbb\n\ncccccccc");
        assert_eq!(chunks, vec!["aaaa\n\nbbbb", "cccccccc"]);
    }

    #[test]
    fn oversize_paragraph_falls_back_to_sentences() {
        let chunker = Chunker::new(10);
        let chunks = chunker.split_text("가나다라마. 바사아자차! 카타파하?");
        assert_eq!(chunks, vec!["가나다라마.", "바사아자차!", "카타파하?"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn run_without_separators_is_cut_at_the_limit() {
        let chunker = Chunker::new(4);
        let chunks = chunker.split_text("가나다라마바사아자");
        assert_eq!(chunks, vec!["가나다라", "마바사아", "자"]);
    }

    #[test]
    fn no_chunk_exceeds_the_limit() {
        let text = "첫 문단입니다. 스킬은 세 개까지 장착합니다!\n\n".repeat(40);
        let chunker = Chunker::new(50);
        for chunk in chunker.split_text(&text) {
            assert!(chunk.chars().count() <= 50, "{:?}", chunk);
        }
    }

    #[test]
    fn pages_pass_metadata_to_chunks() {
        let mut metadata = Metadata::new();
        metadata.insert("page".to_string(), Value::from(2));
        let pages = vec![PageText {
            text: "aaaa\n\nbbbb".to_string(),
            metadata,
        }];
        let chunks = Chunker::new(4).split_pages(&pages);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].metadata["page"], Value::from(2));
        assert_eq!(chunks[1].metadata["chunk_index"], Value::from(1));
    }
}
