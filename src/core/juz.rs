//! The juz table.
//!
//! The corpus is split into 30 juz of roughly equal length. Each juz is
//! identified by the verse it starts on and runs up to the verse before
//! the next juz starts.

use serde::Serialize;

use crate::core::chapters::{self, TOTAL_VERSES};

/// Number of juz in the corpus.
pub const JUZ_COUNT: u8 = 30;

/// `(chapter, verse)` on which each juz starts.
const STARTS: [(u16, u16); JUZ_COUNT as usize] = [
    (1, 1),
    (2, 142),
    (2, 253),
    (3, 93),
    (4, 24),
    (4, 148),
    (5, 82),
    (6, 111),
    (7, 88),
    (8, 41),
    (9, 93),
    (11, 6),
    (12, 53),
    (15, 1),
    (17, 1),
    (18, 75),
    (21, 1),
    (23, 1),
    (25, 21),
    (27, 56),
    (29, 46),
    (33, 31),
    (36, 28),
    (39, 32),
    (41, 47),
    (46, 1),
    (51, 31),
    (58, 1),
    (67, 1),
    (78, 1),
];

/// A single juz, located by corpus-wide verse positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Juz {
    /// Juz number, 1-based.
    pub number: u8,
    /// Chapter the juz starts in.
    pub start_chapter: u16,
    /// Verse the juz starts on.
    pub start_verse: u16,
    /// Position of the first verse in the corpus, 1-based.
    pub first: u32,
    /// Position of the last verse in the corpus, inclusive.
    pub last: u32,
}

impl Juz {
    /// Number of verses in this juz.
    pub fn verses(&self) -> u32 {
        self.last - self.first + 1
    }
}

/// Corpus-wide position of `verse` in `chapter`, 1-based.
///
/// Returns `None` if the chapter is unknown or the verse is outside it.
pub fn verse_position(chapter: u16, verse: u16) -> Option<u32> {
    let ch = chapters::chapter(chapter)?;
    if verse == 0 || verse > ch.verses {
        return None;
    }
    let preceding: u32 = (1..chapter)
        .filter_map(chapters::chapter)
        .map(|c| c.verses as u32)
        .sum();
    Some(preceding + verse as u32)
}

/// Look up a juz by number.
pub fn juz(number: u8) -> Option<Juz> {
    let index = (number as usize).checked_sub(1)?;
    let &(start_chapter, start_verse) = STARTS.get(index)?;
    let first = verse_position(start_chapter, start_verse)?;
    let last = match STARTS.get(index + 1) {
        Some(&(chapter, verse)) => verse_position(chapter, verse)? - 1,
        None => TOTAL_VERSES,
    };
    Some(Juz {
        number,
        start_chapter,
        start_verse,
        first,
        last,
    })
}

/// Iterate over all juz in order.
pub fn all() -> impl Iterator<Item = Juz> {
    (1..=JUZ_COUNT).filter_map(juz)
}

/// The juz containing `verse` of `chapter`.
pub fn juz_of(chapter: u16, verse: u16) -> Option<Juz> {
    let position = verse_position(chapter, verse)?;
    all().find(|j| j.first <= position && position <= j.last)
}
