//! Sprites, sprite corpora, and their dictionary compression.
//!
//! ## Compressed Sprite Stream
//! Every sprite in a corpus is compressed into a stream of 4 bit codes, two
//! codes to a byte with the first code in the low nibble. Each code produces
//! one byte of the sprite:
//!
//! | Code       | Byte |
//! | ---------- | ---- |
//! | `0`..`3`   | the byte in that slot of the recency window |
//! | `4`        | the latest byte rotated left by one bit |
//! | `5`        | the latest byte rotated right by one bit |
//! | `6`..`9`   | decode table entry `code - 6` |
//! | `10`..`14` | decode table entry `4 + (code - 10) * 16 + next code` |
//! | `15`       | literal: the next code is the low nibble, then the high nibble |
//!
//! A `0`..`3` code as the first code of a sprite instead marks a raw sprite:
//! every byte follows as a low and high nibble pair.
//!
//! The recency window holds the last four distinct bytes produced, oldest in
//! slot 0, and starts as four zero bytes at the start of every sprite. A byte
//! is only added if it differs from the newest slot.
//!
//! The decode table is a frequency ranked list of up to 84 bytes, common to
//! the whole corpus. A shortcut table records where every
//! [`shortcut_interval`](CompressorSettings::shortcut_interval)th sprite
//! starts, as a byte offset with bit 15 set when the sprite starts in the
//! high nibble of that byte.
//!
//! Sprites are ordered enemy frames first (16×16), then background tiles and
//! font glyphs (8×8). A 16×16 row is stored as its low byte then its high
//! byte, where the high byte holds the left half of the row.
use crate::errors::SpriteError;
use std::fmt;

pub mod decode;
pub mod dictionary;
pub mod encode;

pub use self::{
    decode::SpriteDecoder,
    dictionary::DecodeTable,
    encode::{CompressedSprites, CompressorSettings, SpriteCompressor},
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SpriteSize {
    /// 8×8 background tiles and font glyphs
    Tile,
    /// 16×16 enemy frames
    Large,
}

impl SpriteSize {
    pub const fn width(self) -> usize {
        match self {
            Self::Tile => 8,
            Self::Large => 16,
        }
    }

    pub const fn height(self) -> usize {
        self.width()
    }

    pub const fn byte_len(self) -> usize {
        self.height() * self.width() / 8
    }

    fn bytes_per_row(self) -> usize {
        self.width() / 8
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Sprite {
    pub name: String,
    size: SpriteSize,
    bytes: Vec<u8>,
}

impl Sprite {
    /// Build a sprite from its stored bytes.
    pub fn from_bytes<S: Into<String>>(name: S, size: SpriteSize, bytes: Vec<u8>) -> Result<Self, SpriteError> {
        let name = name.into();
        if bytes.len() != size.byte_len() {
            return Err(SpriteError::BadSize {
                name,
                expected: size.byte_len(),
                found: bytes.len(),
            });
        }
        Ok(Self { name, size, bytes })
    }

    /// Build a sprite from pixel rows, where bit `width - 1` is the leftmost pixel.
    pub fn from_rows<S: Into<String>>(name: S, size: SpriteSize, rows: &[u16]) -> Result<Self, SpriteError> {
        let name = name.into();
        if rows.len() != size.height() {
            return Err(SpriteError::BadSize {
                name,
                expected: size.byte_len(),
                found: rows.len() * size.bytes_per_row(),
            });
        }
        if let Some(row) = rows.iter().position(|&r| (r as u32) >> size.width() != 0) {
            return Err(SpriteError::RowTooWide { name, row });
        }

        let bytes = row_bytes(size, rows);
        Ok(Self { name, size, bytes })
    }

    #[inline]
    pub fn size(&self) -> SpriteSize {
        self.size
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn row(&self, index: usize) -> u16 {
        match self.size {
            SpriteSize::Tile => self.bytes[index] as u16,
            SpriteSize::Large => u16::from_le_bytes([self.bytes[2 * index], self.bytes[2 * index + 1]]),
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.size.height()).map(move |i| self.row(i))
    }

    /// The frame flipped left to right, as the game derives reverse frames.
    pub fn mirrored(&self) -> Self {
        let shift = 16 - self.size.width() as u32;
        let rows: Vec<u16> = self.rows().map(|r| r.reverse_bits() >> shift).collect();

        Self {
            name: self.name.clone(),
            size: self.size,
            bytes: row_bytes(self.size, &rows),
        }
    }
}

fn row_bytes(size: SpriteSize, rows: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(size.byte_len());
    for row in rows {
        let [lo, hi] = row.to_le_bytes();
        bytes.push(lo);
        if size.bytes_per_row() == 2 {
            bytes.push(hi);
        }
    }
    bytes
}

/// Draws the sprite as rows of `.` and `#`.
impl fmt::Display for Sprite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let width = self.size.width();
        for row in self.rows() {
            for bit in (0..width).rev() {
                let c = if row >> bit & 1 == 1 { '#' } else { '.' };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// The animation frames of one enemy.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct EnemySprites {
    pub name: String,
    /// the game also draws mirrored copies of the frames
    pub reverse: bool,
    pub frames: Vec<Sprite>,
}

impl EnemySprites {
    /// Entry in the enemy frame count table: bit 7 marks reversible enemies.
    pub fn frame_entry(&self) -> u8 {
        (self.frames.len() as u8 & 0x7f) | if self.reverse { 0x80 } else { 0 }
    }
}

/// Where the 16×16 sprites stop in a flattened corpus.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct SpriteLayout {
    /// number of leading 16×16 sprites
    pub large: usize,
    /// index of the first font sprite
    pub first_font: usize,
    pub total: usize,
}

impl SpriteLayout {
    pub fn size_of(&self, index: usize) -> SpriteSize {
        if index < self.large {
            SpriteSize::Large
        } else {
            SpriteSize::Tile
        }
    }
}

/// All the sprites of a game.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct SpriteCorpus {
    pub enemies: Vec<EnemySprites>,
    pub backgrounds: Vec<Sprite>,
    pub fonts: Vec<Sprite>,
}

impl SpriteCorpus {
    /// Every sprite in stream order: enemy frames, backgrounds, then fonts.
    pub fn iter(&self) -> impl Iterator<Item = &Sprite> {
        self.enemies
            .iter()
            .flat_map(|e| e.frames.iter())
            .chain(self.backgrounds.iter())
            .chain(self.fonts.iter())
    }

    pub fn len(&self) -> usize {
        self.num_enemy_sprites() + self.backgrounds.len() + self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_enemy_sprites(&self) -> usize {
        self.enemies.iter().map(|e| e.frames.len()).sum()
    }

    pub fn first_font_sprite(&self) -> usize {
        self.num_enemy_sprites() + self.backgrounds.len()
    }

    pub fn layout(&self) -> SpriteLayout {
        SpriteLayout {
            large: self.num_enemy_sprites(),
            first_font: self.first_font_sprite(),
            total: self.len(),
        }
    }

    /// 0-based index used by room tile sprite fields
    pub fn background_index(&self, name: &str) -> Option<usize> {
        self.backgrounds.iter().position(|s| s.name == name)
    }

    /// 1-based index used by room enemy sprite fields
    pub fn enemy_index(&self, name: &str) -> Option<usize> {
        self.enemies.iter().position(|e| e.name == name).map(|i| i + 1)
    }

    /// Check that every sprite has the size its position in the stream implies.
    pub fn check_layout(&self) -> Result<(), SpriteError> {
        let layout = self.layout();
        match self
            .iter()
            .enumerate()
            .find(|(i, s)| s.size() != layout.size_of(*i))
        {
            Some((i, _)) => Err(SpriteError::Layout(i)),
            None => Ok(()),
        }
    }
}

// nibble codes, see the module docs
pub(crate) const ROLL_LEFT: u8 = 4;
pub(crate) const ROLL_RIGHT: u8 = 5;
pub(crate) const HEAD_CODE: u8 = 6;
pub(crate) const BODY_CODE: u8 = 10;
pub(crate) const LITERAL: u8 = 15;
pub(crate) const BODY_ROW: usize = 16;

/// The last four distinct bytes produced while coding one sprite.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub(crate) struct RecencyWindow([u8; RecencyWindow::SLOTS]);

impl RecencyWindow {
    pub const SLOTS: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, slot: usize) -> u8 {
        self.0[slot]
    }

    pub fn latest(&self) -> u8 {
        self.0[Self::SLOTS - 1]
    }

    pub fn find(&self, byte: u8) -> Option<usize> {
        self.0.iter().position(|&b| b == byte)
    }

    pub fn contains(&self, byte: u8) -> bool {
        self.find(byte).is_some()
    }

    pub fn push(&mut self, byte: u8) {
        if byte != self.latest() {
            self.0.rotate_left(1);
            self.0[Self::SLOTS - 1] = byte;
        }
    }
}
