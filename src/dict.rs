use bit_set::BitSet;
use instant::{Duration, Instant};
use rand::seq::SliceRandom;
use rand::Rng;
use smallvec::{smallvec, SmallVec};

use crate::config::IndexKind;
use crate::symbol::{Symbol, SymbolSet};
use crate::word_list::{Word, WordList};
use crate::{MAX_ALPHABET_SIZE, MAX_WORD_LENGTH};

/// A partially filled word: `Some` for fixed letters, `None` for open positions.
pub type Pattern = SmallVec<[Option<Symbol>; MAX_WORD_LENGTH]>;

/// Answers the question the search asks at every cell: which letters can go at position `pos` of
/// a word shaped like `pattern`?
pub trait DictIndex {
    /// Return the set of letters found at `pos` in any word of length `pattern.len()` that agrees
    /// with every fixed letter of `pattern`. The letter at `pos` itself is ignored. Returns the
    /// empty set if no word matches.
    fn find_possible(&self, pattern: &[Option<Symbol>], pos: usize) -> SymbolSet;
}

/// Build the requested kind of index over a word list.
pub fn build_index(kind: IndexKind, word_list: &WordList) -> Box<dyn DictIndex> {
    match kind {
        IndexKind::Indexed => Box::new(LetterIndex::new(word_list)),
        IndexKind::Sorted => Box::new(SortedIndex::new(word_list)),
    }
}

/// Per-length part of a `LetterIndex`.
#[derive(Debug, Clone)]
struct LengthIndex {
    /// `words_by_letter[pos][symbol]` holds the ids of the words with `symbol` at `pos`.
    words_by_letter: Vec<Vec<BitSet>>,

    /// Every letter that occurs at each position, used when nothing is fixed yet.
    letters_by_pos: Vec<SymbolSet>,
}

/// Index keyed on (length, position, letter). A query intersects the candidate words for each
/// fixed letter, then checks which letters at the target position still have a candidate.
#[derive(Debug, Clone)]
pub struct LetterIndex {
    lengths: Vec<LengthIndex>,
}

impl LetterIndex {
    pub fn new(word_list: &WordList) -> LetterIndex {
        let lengths = (0..=word_list.max_length())
            .map(|length| {
                let mut index = LengthIndex {
                    words_by_letter: (0..length)
                        .map(|_| (0..MAX_ALPHABET_SIZE).map(|_| BitSet::new()).collect())
                        .collect(),
                    letters_by_pos: vec![SymbolSet::EMPTY; length],
                };

                for (word_id, word) in word_list.words_of_length(length).iter().enumerate() {
                    for (pos, &symbol) in word.iter().enumerate() {
                        index.words_by_letter[pos][symbol.id()].insert(word_id);
                        index.letters_by_pos[pos].insert(symbol);
                    }
                }

                index
            })
            .collect();

        LetterIndex { lengths }
    }
}

impl DictIndex for LetterIndex {
    fn find_possible(&self, pattern: &[Option<Symbol>], pos: usize) -> SymbolSet {
        let Some(index) = self.lengths.get(pattern.len()) else {
            return SymbolSet::EMPTY;
        };
        if pos >= pattern.len() {
            return SymbolSet::EMPTY;
        }

        let mut candidates: Option<BitSet> = None;
        for (other_pos, slot) in pattern.iter().enumerate() {
            let Some(symbol) = slot else { continue };
            if other_pos == pos {
                continue;
            }

            let words = &index.words_by_letter[other_pos][symbol.id()];
            candidates = Some(match candidates.take() {
                None => words.clone(),
                Some(mut candidates) => {
                    candidates.intersect_with(words);
                    candidates
                }
            });
        }

        match candidates {
            None => index.letters_by_pos[pos],
            Some(candidates) => index.letters_by_pos[pos]
                .iter()
                .filter(|symbol| !candidates.is_disjoint(&index.words_by_letter[pos][symbol.id()]))
                .collect(),
        }
    }
}

/// Index over sorted word buckets. The fixed prefix of a pattern narrows the bucket to a range
/// by binary search; the rest of the pattern is checked word by word.
#[derive(Debug, Clone)]
pub struct SortedIndex {
    words_by_length: Vec<Vec<Word>>,
}

impl SortedIndex {
    pub fn new(word_list: &WordList) -> SortedIndex {
        SortedIndex {
            words_by_length: (0..=word_list.max_length())
                .map(|length| word_list.words_of_length(length).to_vec())
                .collect(),
        }
    }
}

impl DictIndex for SortedIndex {
    fn find_possible(&self, pattern: &[Option<Symbol>], pos: usize) -> SymbolSet {
        let Some(words) = self.words_by_length.get(pattern.len()) else {
            return SymbolSet::EMPTY;
        };
        if pos >= pattern.len() {
            return SymbolSet::EMPTY;
        }

        let prefix_len = pattern
            .iter()
            .enumerate()
            .position(|(other_pos, slot)| other_pos == pos || slot.is_none())
            .unwrap_or(pattern.len());
        let prefix: SmallVec<[Symbol; MAX_WORD_LENGTH]> =
            pattern[..prefix_len].iter().flatten().copied().collect();

        let start = words.partition_point(|word| word[..prefix_len] < prefix[..]);
        let end = start + words[start..].partition_point(|word| word[..prefix_len] == prefix[..]);

        let mut result = SymbolSet::EMPTY;
        for word in &words[start..end] {
            let matches = pattern
                .iter()
                .zip(word)
                .enumerate()
                .skip(prefix_len)
                .all(|(other_pos, (slot, &symbol))| {
                    other_pos == pos || slot.map_or(true, |fixed| fixed == symbol)
                });

            if matches {
                result.insert(word[pos]);
            }
        }
        result
    }
}

/// Time an index on random-order fills: for each word length, positions are visited in shuffled
/// order and each is set to the lowest admissible letter until a query comes back empty.
pub fn bench_index<R: Rng + ?Sized>(index: &dyn DictIndex, rounds: usize, rng: &mut R) -> Duration {
    let start = Instant::now();
    let mut order: Vec<usize> = Vec::with_capacity(MAX_WORD_LENGTH);

    for _ in 0..rounds {
        for length in 1..=MAX_WORD_LENGTH {
            let mut pattern: Pattern = smallvec![None; length];
            order.clear();
            order.extend(0..length);
            order.shuffle(rng);

            for &pos in &order {
                match index.find_possible(&pattern, pos).pop_lowest() {
                    Some(symbol) => pattern[pos] = Some(symbol),
                    None => break,
                }
            }
        }
    }

    start.elapsed()
}

#[cfg(test)]
mod tests {
    use super::{bench_index, build_index, DictIndex, LetterIndex, SortedIndex};
    use crate::config::IndexKind;
    use crate::symbol::{Alphabet, Symbol, SymbolSet};
    use crate::word_list::WordList;
    use proptest::collection::vec;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn brute_force(word_list: &WordList, pattern: &[Option<Symbol>], pos: usize) -> SymbolSet {
        word_list
            .words_of_length(pattern.len())
            .iter()
            .filter(|word| {
                pattern.iter().zip(word.iter()).enumerate().all(|(other_pos, (slot, &symbol))| {
                    other_pos == pos || slot.map_or(true, |fixed| fixed == symbol)
                })
            })
            .map(|word| word[pos])
            .collect()
    }

    fn pattern(alphabet: &Alphabet, template: &str) -> Vec<Option<Symbol>> {
        template.chars().map(|c| alphabet.symbol(c)).collect()
    }

    #[test]
    fn test_find_possible() {
        let alphabet = Alphabet::default();
        let word_list = WordList::parse("cat\ncar\ncot\ntea\nten\nab\nba\n", &alphabet);

        for kind in [IndexKind::Indexed, IndexKind::Sorted] {
            let index = build_index(kind, &word_list);
            let set = |template: &str, pos: usize| {
                alphabet.format_set(index.find_possible(&pattern(&alphabet, template), pos))
            };

            assert_eq!(set("---", 0), "{ct}");
            assert_eq!(set("c--", 1), "{ao}");
            assert_eq!(set("c-t", 1), "{ao}");
            assert_eq!(set("--r", 1), "{a}");
            assert_eq!(set("t-n", 1), "{e}");
            assert_eq!(set("x--", 1), "{}");
            assert_eq!(set("a-", 1), "{b}");
            // The letter already at the queried position doesn't constrain the answer.
            assert_eq!(set("cot", 1), "{ao}");
            assert_eq!(set("----", 0), "{}");
            assert_eq!(set("", 0), "{}");
            assert_eq!(set("ab", 2), "{}");
        }
    }

    #[test]
    fn test_empty_word_list() {
        let word_list = WordList::parse("", &Alphabet::default());
        let letter_index = LetterIndex::new(&word_list);
        let sorted_index = SortedIndex::new(&word_list);

        assert!(letter_index.find_possible(&[None, None], 0).is_empty());
        assert!(sorted_index.find_possible(&[None, None], 1).is_empty());
    }

    #[test]
    fn test_bench_index_runs() {
        let alphabet = Alphabet::default();
        let word_list = WordList::parse("cat\ncar\ncot\ntea\nten\nab\nba\n", &alphabet);
        let mut rng = StdRng::seed_from_u64(7);

        bench_index(&LetterIndex::new(&word_list), 2, &mut rng);
        bench_index(&SortedIndex::new(&word_list), 2, &mut rng);
    }

    #[derive(Clone, Debug)]
    struct Query {
        words: Vec<String>,
        pattern: Vec<Option<u8>>,
        pos: usize,
    }

    prop_compose! {
        fn query()(words in vec("[a-d]{1,5}", 0..40), length in 1usize..6)
            (pattern in vec(prop::option::of(0u8..4), length), pos in 0..length, words in Just(words))
            -> Query {
            Query { words, pattern, pos }
        }
    }

    proptest! {
        #[test]
        fn test_indexes_match_brute_force(q in query()) {
            let alphabet = Alphabet::default();
            let word_list = WordList::parse(&q.words.join("\n"), &alphabet);
            let pattern: Vec<Option<Symbol>> =
                q.pattern.iter().map(|slot| slot.map(Symbol::new)).collect();

            let expected = brute_force(&word_list, &pattern, q.pos);
            assert_eq!(LetterIndex::new(&word_list).find_possible(&pattern, q.pos), expected);
            assert_eq!(SortedIndex::new(&word_list).find_possible(&pattern, q.pos), expected);
        }
    }
}
