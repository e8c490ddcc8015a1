use super::{
    dictionary::{ByteRanking, DecodeTable},
    RecencyWindow, SpriteCorpus, SpriteDecoder, SpriteLayout, BODY_CODE, BODY_ROW, HEAD_CODE,
    LITERAL, ROLL_LEFT, ROLL_RIGHT,
};
use crate::errors::{JswError, SpriteError};
use bitstream_io::{BitWriter, LittleEndian};
use smallvec::SmallVec;
use std::{collections::BTreeMap, io::Write};

type LogWtr<'a> = &'a mut dyn Write;
type Nibbles = SmallVec<[u8; 0x60]>;

/// Tunable parts of the compressed sprite format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressorSettings {
    /// A shortcut table entry is recorded for every `shortcut_interval`th sprite.
    pub shortcut_interval: usize,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            shortcut_interval: 8,
        }
    }
}

/// Everything the game needs to decompress a sprite corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CompressedSprites {
    /// Frame count per enemy, bit 7 set for reversible enemies
    pub enemy_frames: Vec<u8>,
    pub table: DecodeTable,
    /// Start of every `interval`th sprite: a byte offset into `data`, with
    /// bit 15 set when the sprite starts in the high nibble of that byte.
    pub shortcuts: Vec<u16>,
    pub data: Vec<u8>,
    pub interval: usize,
    pub layout: SpriteLayout,
}

impl CompressedSprites {
    pub const HIGH_NIBBLE: u16 = 0x8000;

    pub fn len(&self) -> usize {
        self.layout.total
    }

    pub fn is_empty(&self) -> bool {
        self.layout.total == 0
    }

    /// The byte offset and nibble position at which sprite group `group` starts
    pub fn shortcut(&self, group: usize) -> Option<(usize, bool)> {
        self.shortcuts.get(group).map(|&s| {
            (
                (s & !Self::HIGH_NIBBLE) as usize,
                s & Self::HIGH_NIBBLE != 0,
            )
        })
    }
}

/// Compress a [`SpriteCorpus`] into a [`CompressedSprites`].
///
/// By default every sprite is decoded again once the corpus is compressed and
/// compared against its source. Turn this off with [`verify(false)`].
/// ```
/// # use jsw_data::{SpriteCompressor, SpriteCorpus, sprites::{Sprite, SpriteSize}};
/// # fn main() -> Result<(), jsw_data::JswError> {
/// let mut corpus = SpriteCorpus::default();
/// let floor = [0xff, 0x81, 0x42, 0x24, 0x18, 0x18, 0x00, 0xff];
/// corpus.backgrounds.push(Sprite::from_bytes("floor", SpriteSize::Tile, floor.to_vec())?);
///
/// let packed = SpriteCompressor::for_corpus(&corpus)
///     .shortcut_interval(4)
///     .with_logging(&mut ::std::io::sink())
///     .compress()?;
/// assert_eq!(packed.shortcuts.len(), 1);
/// # Ok(())
/// # }
/// ```
///
/// [`verify(false)`]: SpriteCompressor::verify
pub struct SpriteCompressor<'a> {
    corpus: &'a SpriteCorpus,
    settings: CompressorSettings,
    verify: bool,
    log: Option<LogWtr<'a>>,
}

impl<'a> SpriteCompressor<'a> {
    #[inline]
    pub fn for_corpus(corpus: &'a SpriteCorpus) -> Self {
        Self {
            corpus,
            settings: CompressorSettings::default(),
            verify: true,
            log: None,
        }
    }

    #[inline]
    pub fn with_settings(&mut self, settings: CompressorSettings) -> &mut Self {
        self.settings = settings;
        self
    }

    #[inline]
    pub fn shortcut_interval(&mut self, interval: usize) -> &mut Self {
        self.settings.shortcut_interval = interval;
        self
    }

    /// Decode every sprite after compression and fail with
    /// [`SpriteError::Mismatch`] if any differs from its source.
    #[inline]
    pub fn verify(&mut self, verify: bool) -> &mut Self {
        self.verify = verify;
        self
    }

    /// Write the decode table, code histograms, and raw sprites to `log`.
    #[inline]
    pub fn with_logging<L: Write>(&mut self, log: &'a mut L) -> &mut Self {
        self.log = Some(log as LogWtr<'a>);
        self
    }

    pub fn compress(&mut self) -> Result<CompressedSprites, JswError> {
        do_compress(self)
    }
}

/// Statistics gathered for the log
#[derive(Debug, Default)]
struct LogFreq {
    first_code: BTreeMap<u8, u32>,
    size: BTreeMap<usize, u32>,
}

fn do_compress(opts: &mut SpriteCompressor<'_>) -> Result<CompressedSprites, JswError> {
    let corpus = opts.corpus;
    let interval = opts.settings.shortcut_interval;
    if interval == 0 {
        return Err(SpriteError::ZeroInterval.into());
    }
    corpus.check_layout()?;

    let ranking = ByteRanking::for_sprites(corpus.iter());
    let table = DecodeTable::from_ranking(&ranking);
    let mut log = opts.log.as_mut().map(|l| (l, LogFreq::default()));

    if let Some((wtr, _)) = &mut log {
        writeln!(
            wtr,
            "# Decode Table\n{} distinct bytes, {} kept",
            ranking.entries().len(),
            table.len()
        )?;
        for (i, &(byte, n)) in ranking.entries().iter().take(table.len()).enumerate() {
            writeln!(wtr, "{:2}: {:08b} x{}", i, byte, n)?;
        }
    }

    let mut nibbles: Vec<u8> = Vec::new();
    let mut shortcuts = Vec::with_capacity(corpus.len() / interval + 1);

    for (i, sprite) in corpus.iter().enumerate() {
        if i % interval == 0 {
            let offset = nibbles.len() / 2;
            if offset >= CompressedSprites::HIGH_NIBBLE as usize {
                return Err(SpriteError::ShortcutOverflow(offset).into());
            }
            let high = if nibbles.len() % 2 == 1 {
                CompressedSprites::HIGH_NIBBLE
            } else {
                0
            };
            shortcuts.push(offset as u16 | high);
        }

        let (codes, raw) = code_sprite(sprite.bytes(), &table);

        if let Some((wtr, freq)) = &mut log {
            *freq.first_code.entry(codes[0]).or_insert(0) += 1;
            *freq.size.entry(codes.len()).or_insert(0) += 1;
            if raw {
                writeln!(wtr, "sprite {} ({:?}) stored raw", i, sprite.name)?;
            }
        }

        nibbles.extend_from_slice(&codes);
    }

    if let Some((wtr, freq)) = &mut log {
        writeln!(wtr, "# First Codes\n{:?}", freq.first_code)?;
        writeln!(wtr, "# Sprite Sizes (nibbles)\n{:?}", freq.size)?;
        writeln!(wtr, "{} sprites in {} bytes", corpus.len(), (nibbles.len() + 1) / 2)?;
    }

    let compressed = CompressedSprites {
        enemy_frames: corpus.enemies.iter().map(|e| e.frame_entry()).collect(),
        table,
        shortcuts,
        data: pack_nibbles(&nibbles)?,
        interval,
        layout: corpus.layout(),
    };

    if opts.verify {
        SpriteDecoder::new(&compressed).verify(corpus)?;
    }

    Ok(compressed)
}

/// Code one sprite, falling back to a raw dump when coding does not pay.
/// Returns the codes and whether the sprite was stored raw.
fn code_sprite(bytes: &[u8], table: &DecodeTable) -> (Nibbles, bool) {
    let mut codes = Nibbles::new();
    let mut window = RecencyWindow::new();

    for (i, &byte) in bytes.iter().enumerate() {
        let latest = window.latest();

        // a leading recency code would read as the raw marker
        if let Some(slot) = window.find(byte).filter(|_| i > 0) {
            codes.push(slot as u8);
        } else if let Some(entry) = table.head_index(byte) {
            codes.push(HEAD_CODE + entry as u8);
        } else if let Some(entry) = table.body_index(byte) {
            codes.push(BODY_CODE + (entry / BODY_ROW) as u8);
            codes.push((entry % BODY_ROW) as u8);
        } else if byte == latest.rotate_left(1) {
            codes.push(ROLL_LEFT);
        } else if byte == latest.rotate_right(1) {
            codes.push(ROLL_RIGHT);
        } else {
            codes.extend_from_slice(&[LITERAL, byte & 0xf, byte >> 4]);
        }

        window.push(byte);
    }

    if codes.len() > 1 + 2 * bytes.len() {
        codes.clear();
        codes.push(0);
        for &byte in bytes {
            codes.extend_from_slice(&[byte & 0xf, byte >> 4]);
        }
        (codes, true)
    } else {
        (codes, false)
    }
}

/// Pack codes two to a byte, the first in the low nibble.
fn pack_nibbles(nibbles: &[u8]) -> Result<Vec<u8>, JswError> {
    let mut data = Vec::with_capacity((nibbles.len() + 1) / 2);
    let mut wtr = BitWriter::endian(&mut data, LittleEndian);
    for &n in nibbles {
        wtr.write(4, n)?;
    }
    wtr.byte_align()?;

    Ok(data)
}
