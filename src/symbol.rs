use std::fmt::{Debug, Formatter};
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use crate::error::{Error, Result};
use crate::MAX_ALPHABET_SIZE;

/// One letter of the alphabet, identified by its position in the `Alphabet`. Lower ids are tried
/// first during the search.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u8);

impl Symbol {
    pub fn new(id: u8) -> Symbol {
        debug_assert!((id as usize) < MAX_ALPHABET_SIZE);
        Symbol(id)
    }

    pub fn id(self) -> usize {
        self.0 as usize
    }

    pub fn bit(self) -> SymbolSet {
        SymbolSet(1 << self.0)
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// What a cell currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Empty,
    Outside,
    Letter(Symbol),
}

impl CellState {
    pub fn letter(self) -> Option<Symbol> {
        match self {
            CellState::Letter(symbol) => Some(symbol),
            _ => None,
        }
    }
}

/// The ordered set of letters words may be built from. At most 32 letters, so that a set of them
/// fits in a `u32`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
}

impl Alphabet {
    /// Build an alphabet from the given letters, in the given order. Letters are lowercased.
    pub fn new(letters: &str) -> Result<Alphabet> {
        let mut chars: Vec<char> = vec![];
        for c in letters.chars().flat_map(char::to_lowercase) {
            if !c.is_alphabetic() {
                return Err(Error::format(format!("Alphabet contains non-letter '{c}'")));
            }
            if chars.contains(&c) {
                return Err(Error::format(format!("Alphabet contains '{c}' twice")));
            }
            chars.push(c);
        }

        if chars.is_empty() {
            return Err(Error::format("Alphabet must have at least one letter"));
        }
        if chars.len() > MAX_ALPHABET_SIZE {
            return Err(Error::format(format!(
                "Alphabet has {} letters, at most {MAX_ALPHABET_SIZE} are supported",
                chars.len()
            )));
        }

        Ok(Alphabet { chars })
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Look up the symbol for a character, case-insensitively.
    pub fn symbol(&self, c: char) -> Option<Symbol> {
        let mut lower = c.to_lowercase();
        let c = lower.next()?;
        if lower.next().is_some() {
            return None;
        }
        self.chars.iter().position(|&a| a == c).map(|id| Symbol::new(id as u8))
    }

    pub fn char(&self, symbol: Symbol) -> char {
        self.chars[symbol.id()]
    }

    /// The set containing every letter of this alphabet.
    pub fn all(&self) -> SymbolSet {
        SymbolSet::all(self.len())
    }

    /// Render a set as `{abc}`.
    pub fn format_set(&self, set: SymbolSet) -> String {
        let letters: String = set.iter().map(|symbol| self.char(symbol)).collect();
        format!("{{{letters}}}")
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Alphabet { chars: ('a'..='z').collect() }
    }
}

/// A set of symbols stored as a bitmask, bit `n` standing for `Symbol(n)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymbolSet(u32);

impl SymbolSet {
    pub const EMPTY: SymbolSet = SymbolSet(0);

    pub fn from_bits(bits: u32) -> SymbolSet {
        SymbolSet(bits)
    }

    /// The set of the first `len` symbols.
    pub fn all(len: usize) -> SymbolSet {
        if len >= 32 {
            SymbolSet(u32::MAX)
        } else {
            SymbolSet((1 << len) - 1)
        }
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn contains(self, symbol: Symbol) -> bool {
        self.0 & symbol.bit().0 != 0
    }

    pub fn insert(&mut self, symbol: Symbol) {
        self.0 |= symbol.bit().0;
    }

    pub fn remove(&mut self, symbol: Symbol) {
        self.0 &= !symbol.bit().0;
    }

    /// Take the lowest symbol out of the set.
    pub fn pop_lowest(&mut self) -> Option<Symbol> {
        if self.0 == 0 {
            return None;
        }
        let id = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Some(Symbol(id as u8))
    }

    /// Iterate from the lowest symbol upwards.
    pub fn iter(self) -> SymbolSetIter {
        SymbolSetIter(self)
    }
}

impl Debug for SymbolSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymbolSet({:#b})", self.0)
    }
}

impl BitOr for SymbolSet {
    type Output = SymbolSet;

    fn bitor(self, rhs: SymbolSet) -> SymbolSet {
        SymbolSet(self.0 | rhs.0)
    }
}

impl BitOrAssign for SymbolSet {
    fn bitor_assign(&mut self, rhs: SymbolSet) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for SymbolSet {
    type Output = SymbolSet;

    fn bitand(self, rhs: SymbolSet) -> SymbolSet {
        SymbolSet(self.0 & rhs.0)
    }
}

impl BitAndAssign for SymbolSet {
    fn bitand_assign(&mut self, rhs: SymbolSet) {
        self.0 &= rhs.0;
    }
}

/// Complement over all 32 possible symbols; intersect with `Alphabet::all` to stay inside an
/// alphabet.
impl Not for SymbolSet {
    type Output = SymbolSet;

    fn not(self) -> SymbolSet {
        SymbolSet(!self.0)
    }
}

impl FromIterator<Symbol> for SymbolSet {
    fn from_iter<T: IntoIterator<Item = Symbol>>(iter: T) -> Self {
        let mut set = SymbolSet::EMPTY;
        for symbol in iter {
            set.insert(symbol);
        }
        set
    }
}

impl IntoIterator for SymbolSet {
    type Item = Symbol;
    type IntoIter = SymbolSetIter;

    fn into_iter(self) -> SymbolSetIter {
        self.iter()
    }
}

pub struct SymbolSetIter(SymbolSet);

impl Iterator for SymbolSetIter {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        self.0.pop_lowest()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.0.len();
        (len, Some(len))
    }
}
