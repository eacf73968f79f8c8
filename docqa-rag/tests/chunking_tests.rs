//! Property tests for the word and recursive chunkers.

use docqa_rag::{Chunker, RecursiveChunker, WordChunker, chunk_words, clean_text};
use proptest::prelude::*;

/// Text made of short words separated by whitespace runs drawn from `separators`.
fn arb_text_with(separators: &'static str) -> impl Strategy<Value = String> {
    proptest::collection::vec(("[a-zA-Z0-9é]{1,8}", separators), 0..60)
        .prop_map(|parts| parts.into_iter().map(|(w, sep)| format!("{w}{sep}")).collect())
}

fn arb_text() -> impl Strategy<Value = String> {
    arb_text_with("[ \t\n]{1,3}")
}

mod prop_word_chunker {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn rejoining_reproduces_normalized_words(text in arb_text(), size in 1usize..12) {
            let chunks = chunk_words(&text, size).unwrap();
            let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
            prop_assert_eq!(chunks.join(" "), normalized);
        }

        #[test]
        fn chunk_count_is_ceiling_of_words_over_size(text in arb_text(), size in 1usize..12) {
            let word_count = text.split_whitespace().count();
            let chunks = chunk_words(&text, size).unwrap();
            prop_assert_eq!(chunks.len(), word_count.div_ceil(size));
            for chunk in &chunks {
                let words = chunk.split(' ').count();
                prop_assert!(words >= 1 && words <= size);
            }
        }
    }
}

mod prop_recursive_chunker {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn chunks_fit_and_are_never_empty(
            text in arb_text(),
            size in 4usize..40,
            overlap_ratio in 0usize..4,
        ) {
            let overlap = size * overlap_ratio / 4;
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            for chunk in chunker.chunk(&text) {
                prop_assert!(!chunk.is_empty());
                prop_assert!(chunk.chars().count() <= size, "{:?} exceeds {}", chunk, size);
            }
        }

        #[test]
        fn every_word_survives(text in arb_text_with("[ \n]{1,3}"), size in 8usize..40) {
            let chunker = RecursiveChunker::new(size, 0).unwrap();
            let joined = chunker.chunk(&text).join(" ");
            for word in text.split_whitespace() {
                prop_assert!(joined.contains(word));
            }
        }
    }
}

mod prop_clean_text {
    use super::*;

    proptest! {
        #[test]
        fn cleaning_is_idempotent(text in "[a-z <>padEOS\t\n]{0,60}") {
            let once = clean_text(&text);
            prop_assert_eq!(clean_text(&once), once);
        }
    }
}

#[test]
fn word_chunker_is_usable_as_trait_object() {
    let chunker: Box<dyn Chunker> = Box::new(WordChunker::new(3).unwrap());
    assert_eq!(chunker.chunk("a b c d"), vec!["a b c", "d"]);
}
