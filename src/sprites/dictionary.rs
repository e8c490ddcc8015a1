use super::{RecencyWindow, Sprite};
use smallvec::SmallVec;
use std::{collections::HashMap, fmt};

type Frequency = u64;

/// Useful occurrences of each byte value, most frequent first.
///
/// An occurrence is useful when the byte could not be coded from the recency
/// window: it is the first byte of a sprite, or it is not one of the last
/// four distinct bytes of its sprite. Equal counts are ordered by byte value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteRanking(Vec<(u8, Frequency)>);

impl ByteRanking {
    pub fn for_sprites<'a, I>(sprites: I) -> Self
    where
        I: IntoIterator<Item = &'a Sprite>,
    {
        let mut counts: HashMap<u8, Frequency> = HashMap::new();

        for sprite in sprites {
            let mut window = RecencyWindow::new();
            for (i, &byte) in sprite.bytes().iter().enumerate() {
                if i == 0 || !window.contains(byte) {
                    *counts.entry(byte).or_insert(0) += 1;
                }
                window.push(byte);
            }
        }

        let mut ranked: Vec<(u8, Frequency)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Self(ranked)
    }

    pub fn entries(&self) -> &[(u8, Frequency)] {
        &self.0
    }

    pub fn occurrences(&self, byte: u8) -> Frequency {
        self.0
            .iter()
            .find(|(b, _)| *b == byte)
            .map_or(0, |&(_, n)| n)
    }
}

/// The corpus wide table of common bytes.
///
/// The first [`HEAD_LEN`](DecodeTable::HEAD_LEN) entries are coded with a
/// single nibble, the next [`BODY_LEN`](DecodeTable::BODY_LEN) with two.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DecodeTable(SmallVec<[u8; 0x60]>);

impl DecodeTable {
    pub const HEAD_LEN: usize = 4;
    pub const BODY_LEN: usize = 80;
    pub const MAX_LEN: usize = Self::HEAD_LEN + Self::BODY_LEN;

    /// Take the top of a ranking.
    pub fn from_ranking(ranking: &ByteRanking) -> Self {
        Self(
            ranking
                .entries()
                .iter()
                .take(Self::MAX_LEN)
                .map(|&(b, _)| b)
                .collect(),
        )
    }

    /// Rebuild a table from its stored bytes, ignoring anything past
    /// [`MAX_LEN`](DecodeTable::MAX_LEN).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().take(Self::MAX_LEN).copied().collect())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, entry: usize) -> Option<u8> {
        self.0.get(entry).copied()
    }

    pub fn head(&self) -> &[u8] {
        &self.0[..Self::HEAD_LEN.min(self.0.len())]
    }

    pub fn body(&self) -> &[u8] {
        &self.0[Self::HEAD_LEN.min(self.0.len())..]
    }

    pub fn head_index(&self, byte: u8) -> Option<usize> {
        self.head().iter().position(|&b| b == byte)
    }

    pub fn body_index(&self, byte: u8) -> Option<usize> {
        self.body().iter().position(|&b| b == byte)
    }
}

impl fmt::Display for DecodeTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "head {:02x?} body {:02x?}", self.head(), self.body())
    }
}
