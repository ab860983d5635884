//! Sentence-based text chunking with overlap.

use regex::Regex;

/// Splits text into sentence-aligned chunks of bounded size.
pub struct SentenceChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    sentence_end: Regex,
}

impl SentenceChunker {
    /// `chunk_size` and `chunk_overlap` are measured in characters.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let sentence_end = Regex::new(r"[.!?]\s+").expect("Invalid regex");
        Self {
            chunk_size,
            chunk_overlap,
            sentence_end,
        }
    }

    /// Split into sentences, keeping the terminal punctuation.
    fn sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut start = 0;
        for m in self.sentence_end.find_iter(text) {
            // The punctuation is a single ASCII byte.
            let end = m.start() + 1;
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = m.end();
        }
        let rest = text[start..].trim();
        if !rest.is_empty() {
            sentences.push(rest);
        }
        sentences
    }

    /// Chunk `text`. Consecutive chunks share trailing sentences totalling at
    /// most `chunk_overlap` characters. A single sentence longer than
    /// `chunk_size` becomes its own chunk.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let sentences = self.sentences(text.trim());
        let mut chunks = Vec::new();
        let mut i = 0;

        while i < sentences.len() {
            let mut current: Vec<&str> = Vec::new();
            let mut size = 0;

            for sentence in &sentences[i..] {
                let added = sentence.chars().count() + usize::from(!current.is_empty());
                if size + added > self.chunk_size && !current.is_empty() {
                    break;
                }
                current.push(sentence);
                size += added;
            }

            chunks.push(current.join(" "));

            if i + current.len() >= sentences.len() {
                break;
            }

            let mut overlap_size = 0;
            let mut overlap_count = 0;
            for (k, sentence) in current.iter().enumerate().rev() {
                let len = sentence.chars().count() + usize::from(k + 1 < current.len());
                if overlap_size + len > self.chunk_overlap {
                    break;
                }
                overlap_size += len;
                overlap_count += 1;
            }

            i = (i + current.len() - overlap_count).max(i + 1);
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_no_chunks() {
        let chunker = SentenceChunker::new(100, 10);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n ").is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = SentenceChunker::new(800, 100);
        let chunks = chunker.chunk("First sentence. Second one! Third?");
        assert_eq!(chunks, vec!["First sentence. Second one! Third?"]);
    }

    #[test]
    fn test_sentences_keep_punctuation_and_decimals() {
        let chunker = SentenceChunker::new(800, 0);
        let sentences = chunker.sentences("Version 3.5 is out. Is it good?  Yes!");
        assert_eq!(sentences, vec!["Version 3.5 is out.", "Is it good?", "Yes!"]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let chunker = SentenceChunker::new(30, 0);
        let text = "Alpha beta gamma delta. Epsilon zeta eta theta. Iota kappa lambda mu.";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 30));
        assert_eq!(chunks[0], "Alpha beta gamma delta.");
    }

    #[test]
    fn test_overlap_repeats_trailing_sentences() {
        let chunker = SentenceChunker::new(40, 20);
        let text = "One two three. Four five six. Seven eight nine. Ten eleven.";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks[0], "One two three. Four five six.");
        assert!(chunks[1].starts_with("Four five six."));
        assert!(chunks.last().unwrap().ends_with("Ten eleven."));
    }

    #[test]
    fn test_long_sentence_is_its_own_chunk() {
        let chunker = SentenceChunker::new(10, 5);
        let chunks = chunker.chunk("This sentence is far longer than ten characters. Short.");
        assert_eq!(chunks[0], "This sentence is far longer than ten characters.");
        assert_eq!(chunks[1], "Short.");
    }
}
