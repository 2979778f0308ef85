//! Per-chunk metadata generation (C5).

use std::collections::HashMap;

use ingest_core::ChunkMetadata;

const MAX_KEYWORDS: usize = 8;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "might", "shall", "can", "need",
    "must", "it", "its", "this", "that", "these", "those", "i", "you", "he", "she", "we", "they",
    "me", "him", "her", "us", "them", "my", "your", "his", "our", "their", "what", "which",
    "who", "whom", "when", "where", "why", "how", "all", "each", "every", "both", "few", "more",
    "most", "other", "some", "such", "no", "not", "only", "own", "same", "so", "than", "too",
    "very", "just", "because", "as", "until", "while", "about", "between", "through", "during",
    "before", "after", "above", "below", "up", "down", "out", "off", "over", "under", "again",
    "further", "then", "once", "here", "there", "also", "if", "into",
];

/// Lowercase alphabetic runs of length >= 3, in appearance order.
fn extract_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for ch in text.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_alphabetic() {
            current.push(ch.to_ascii_lowercase());
        } else if !current.is_empty() {
            if current.len() >= 3 {
                words.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
    }
    words
}

/// Top-N most frequent non-stop-word tokens, ties broken by first appearance.
#[must_use]
pub fn extract_keywords(text: &str) -> Vec<String> {
    let words = extract_words(text);
    let is_stop_word = |w: &str| STOP_WORDS.contains(&w);

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for w in &words {
        if is_stop_word(w) {
            continue;
        }
        let entry = counts.entry(w.as_str()).or_insert(0);
        if *entry == 0 {
            order.push(w.as_str());
        }
        *entry += 1;
    }

    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().take(MAX_KEYWORDS).map(str::to_string).collect()
}

/// Build the metadata object for a chunk: keywords plus, for table chunks,
/// the preserved `table.format` field.
#[must_use]
pub fn generate_chunk_metadata(text: &str, is_table: bool) -> ChunkMetadata {
    let keywords = extract_keywords(text);
    let metadata = ChunkMetadata::new(keywords);
    if is_table { metadata.with_table_format("markdown") } else { metadata }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_stop_words_and_short_tokens() {
        let kws = extract_keywords("the cat sat on a mat and an ox");
        assert!(!kws.contains(&"the".to_string()));
        assert!(!kws.contains(&"on".to_string()));
        assert!(kws.contains(&"cat".to_string()));
    }

    #[test]
    fn ranks_by_frequency_most_common_first() {
        let kws = extract_keywords("rust rust rust wasm wasm embedding");
        assert_eq!(kws.first().unwrap(), "rust");
    }

    #[test]
    fn caps_at_eight_keywords() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let kws = extract_keywords(text);
        assert!(kws.len() <= 8);
    }

    #[test]
    fn table_chunks_carry_format_metadata() {
        let meta = generate_chunk_metadata("| a | b |\n| --- | --- |\n| 1 | 2 |", true);
        assert_eq!(meta.table.unwrap().format, "markdown");
    }

    #[test]
    fn reserved_v2_slots_are_always_empty() {
        let meta = generate_chunk_metadata("some text here", false);
        assert_eq!(meta.summary, "");
        assert!(meta.hypothetical_questions.is_empty());
    }
}
