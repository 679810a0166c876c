use std::fs;
use std::path::Path;

use log::{debug, info};
use smallvec::SmallVec;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::symbol::{Alphabet, Symbol};
use crate::MAX_WORD_LENGTH;

/// A word spelled out as symbols.
pub type Word = SmallVec<[Symbol; MAX_WORD_LENGTH]>;

/// The filtered, sorted and deduplicated words loaded from a word-list file. Both dictionary
/// indexes are built from the same `WordList`, so they agree on which words exist.
#[derive(Debug, Clone)]
pub struct WordList {
    /// Words bucketed by length, each bucket sorted in alphabet order.
    words_by_length: Vec<Vec<Word>>,
    word_count: usize,
}

impl WordList {
    /// Parse a word list, one word per line. Lines are trimmed, lowercased and NFC-normalized;
    /// anything empty, too long, or containing a character outside the alphabet is skipped.
    pub fn parse(contents: &str, alphabet: &Alphabet) -> WordList {
        let mut words_by_length: Vec<Vec<Word>> = (0..=MAX_WORD_LENGTH).map(|_| vec![]).collect();
        let mut rejected = 0;

        for line in contents.lines() {
            let normalized: String = line.trim().to_lowercase().nfc().collect();
            if normalized.is_empty() {
                continue;
            }

            match spell(&normalized, alphabet) {
                Some(word) if word.len() <= MAX_WORD_LENGTH => words_by_length[word.len()].push(word),
                _ => {
                    debug!("Skipping word list entry {:?}", line);
                    rejected += 1;
                }
            }
        }

        let mut word_count = 0;
        for bucket in &mut words_by_length {
            bucket.sort_unstable();
            bucket.dedup();
            word_count += bucket.len();
        }

        if rejected > 0 {
            info!("Skipped {} invalid word list entries", rejected);
        }

        WordList { words_by_length, word_count }
    }

    /// Read and parse a word-list file.
    pub fn load(path: impl AsRef<Path>, alphabet: &Alphabet) -> Result<WordList> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let word_list = WordList::parse(&contents, alphabet);
        info!("Loaded {} words from {}", word_list.len(), path.display());
        Ok(word_list)
    }

    pub fn len(&self) -> usize {
        self.word_count
    }

    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }

    /// All words of the given length, sorted.
    pub fn words_of_length(&self, length: usize) -> &[Word] {
        self.words_by_length.get(length).map_or(&[][..], Vec::as_slice)
    }

    /// The longest length that has any words.
    pub fn max_length(&self) -> usize {
        self.words_by_length.iter().rposition(|bucket| !bucket.is_empty()).unwrap_or(0)
    }
}

/// Convert a string into symbols, or `None` if any character isn't in the alphabet.
pub fn spell(word: &str, alphabet: &Alphabet) -> Option<Word> {
    word.chars().map(|c| alphabet.symbol(c)).collect()
}
