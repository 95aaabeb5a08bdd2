// Copyright (c) 2018 Fabian Schuiki

//! Character sets.
//!
//! A `CharSet` is a bit vector over the character alphabet of a grammar, which
//! is the range `0..=MAX_CHAR`. It is used for character class declarations and
//! as the label of every automaton transition.

use std::fmt;

use bit_set::BitSet;

/// The largest character code a grammar may mention.
pub const MAX_CHAR: u32 = 0xFFFF;

/// A set of characters.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct CharSet {
    bits: BitSet,
}

impl CharSet {
    /// Create an empty set.
    pub fn new() -> CharSet {
        CharSet { bits: BitSet::new() }
    }

    /// Create a set containing a single character.
    pub fn single(ch: u32) -> CharSet {
        let mut s = CharSet::new();
        s.insert(ch);
        s
    }

    /// Create a set containing all characters from `lo` to `hi` inclusive.
    pub fn range(lo: u32, hi: u32) -> CharSet {
        let mut s = CharSet::new();
        for ch in lo..hi.saturating_add(1) {
            s.insert(ch);
        }
        s
    }

    /// Create a set containing the entire alphabet.
    pub fn full() -> CharSet {
        let mut s = CharSet::new();
        s.fill();
        s
    }

    /// Add the entire alphabet to the set.
    pub fn fill(&mut self) {
        self.bits.reserve_len(MAX_CHAR as usize + 1);
        for ch in 0..MAX_CHAR + 1 {
            self.bits.insert(ch as usize);
        }
    }

    /// Add a character. Characters beyond `MAX_CHAR` are ignored.
    pub fn insert(&mut self, ch: u32) {
        if ch <= MAX_CHAR {
            self.bits.insert(ch as usize);
        }
    }

    /// Whether the set contains a character.
    pub fn contains(&self, ch: u32) -> bool {
        self.bits.contains(ch as usize)
    }

    /// Add all characters of another set.
    pub fn union_with(&mut self, other: &CharSet) {
        self.bits.union_with(&other.bits);
    }

    /// Remove all characters of another set.
    pub fn subtract(&mut self, other: &CharSet) {
        self.bits.difference_with(&other.bits);
    }

    /// Keep only the characters that are also in another set.
    pub fn intersect_with(&mut self, other: &CharSet) {
        self.bits.intersect_with(&other.bits);
    }

    /// Whether the two sets share a character.
    pub fn intersects(&self, other: &CharSet) -> bool {
        !self.bits.is_disjoint(&other.bits)
    }

    /// Whether every character of `other` is in this set.
    pub fn includes(&self, other: &CharSet) -> bool {
        other.bits.is_subset(&self.bits)
    }

    /// The number of characters in the set.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The smallest character in the set.
    pub fn first(&self) -> Option<u32> {
        self.bits.iter().next().map(|c| c as u32)
    }

    /// Iterate over the characters in ascending order.
    pub fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = u32> + 'a> {
        Box::new(self.bits.iter().map(|c| c as u32))
    }

    /// The set as a list of maximal inclusive ranges, in ascending order.
    pub fn ranges(&self) -> Vec<(u32, u32)> {
        let mut ranges: Vec<(u32, u32)> = Vec::new();
        for ch in self.iter() {
            if let Some(last) = ranges.last_mut() {
                if last.1 + 1 == ch {
                    last.1 = ch;
                    continue;
                }
            }
            ranges.push((ch, ch));
        }
        ranges
    }
}

/// Render a character the way it would appear in a grammar.
pub fn char_repr(ch: u32) -> String {
    match ch {
        0x5C => "'\\\\'".into(),
        0x27 => "'\\''".into(),
        0x0A => "'\\n'".into(),
        0x0D => "'\\r'".into(),
        0x09 => "'\\t'".into(),
        0x20..=0x7E => format!("'{}'", ch as u8 as char),
        _ => format!("'\\u{:04x}'", ch),
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (lo, hi) in self.ranges() {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            if lo == hi {
                write!(f, "{}", char_repr(lo))?;
            } else {
                write!(f, "{}..{}", char_repr(lo), char_repr(hi))?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{}}}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges() {
        let mut s = CharSet::range('a' as u32, 'c' as u32);
        s.insert('x' as u32);
        s.insert('_' as u32);
        assert_eq!(
            s.ranges(),
            vec![(0x5F, 0x5F), (0x61, 0x63), (0x78, 0x78)]
        );
        assert_eq!(format!("{}", s), "'_' 'a'..'c' 'x'");
    }

    #[test]
    fn algebra() {
        let letters = CharSet::range('a' as u32, 'z' as u32);
        let vowels = {
            let mut s = CharSet::new();
            for c in "aeiou".chars() {
                s.insert(c as u32);
            }
            s
        };
        let mut consonants = letters.clone();
        consonants.subtract(&vowels);
        assert_eq!(consonants.len(), 21);
        assert!(letters.includes(&vowels));
        assert!(!consonants.intersects(&vowels));
        let mut both = consonants.clone();
        both.union_with(&vowels);
        assert_eq!(both, letters);
        let mut common = letters.clone();
        common.intersect_with(&vowels);
        assert_eq!(common, vowels);
        assert_eq!(vowels.first(), Some('a' as u32));
    }

    #[test]
    fn full_set() {
        let mut s = CharSet::full();
        assert_eq!(s.len(), MAX_CHAR as usize + 1);
        s.subtract(&CharSet::single('"' as u32));
        assert!(!s.contains('"' as u32));
        assert_eq!(s.ranges(), vec![(0, 0x21), (0x23, MAX_CHAR)]);
    }

    #[test]
    fn equality_ignores_capacity() {
        let mut a = CharSet::full();
        a.intersect_with(&CharSet::single(7));
        assert_eq!(a, CharSet::single(7));
    }
}
