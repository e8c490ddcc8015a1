use super::{
    dictionary::DecodeTable, CompressedSprites, RecencyWindow, SpriteCorpus, SpriteSize,
    BODY_CODE, BODY_ROW, HEAD_CODE, LITERAL, ROLL_LEFT, ROLL_RIGHT,
};
use crate::errors::{JswError, SpriteError};
use bitstream_io::{BitReader, LittleEndian};
use std::io::{Cursor, Write};

type LogWtr<'a> = &'a mut dyn Write;
type NibbleReader<'d> = BitReader<Cursor<&'d [u8]>, LittleEndian>;

/// Decompress sprites out of a [`CompressedSprites`].
///
/// Single sprites are found through the shortcut table, so only the sprites
/// between the nearest shortcut and the requested one are decoded.
/// ```
/// # use jsw_data::{SpriteCompressor, SpriteCorpus, SpriteDecoder, sprites::{Sprite, SpriteSize}};
/// # fn main() -> Result<(), jsw_data::JswError> {
/// # let mut corpus = SpriteCorpus::default();
/// # for b in 0..20u8 {
/// #     corpus.fonts.push(Sprite::from_bytes("", SpriteSize::Tile, vec![b; 8])?);
/// # }
/// let packed = SpriteCompressor::for_corpus(&corpus).compress()?;
/// let glyph = SpriteDecoder::new(&packed).decode(17)?;
/// assert_eq!(glyph, vec![17; 8]);
/// # Ok(())
/// # }
/// ```
pub struct SpriteDecoder<'a> {
    sprites: &'a CompressedSprites,
    log: Option<LogWtr<'a>>,
}

impl<'a> SpriteDecoder<'a> {
    #[inline]
    pub fn new(sprites: &'a CompressedSprites) -> Self {
        Self { sprites, log: None }
    }

    /// Write every decoded sprite to `log`.
    #[inline]
    pub fn with_logging<W: Write>(&mut self, wtr: &'a mut W) -> &mut Self {
        self.log = Some(wtr as LogWtr);
        self
    }

    /// Decode sprite `index` by seeking to the shortcut for its group.
    pub fn decode(&mut self, index: usize) -> Result<Vec<u8>, JswError> {
        let CompressedSprites {
            table,
            data,
            interval,
            layout,
            ..
        } = self.sprites;

        if index >= layout.total {
            return Err(SpriteError::OutOfRange {
                index,
                count: layout.total,
            }
            .into());
        }
        if *interval == 0 {
            return Err(SpriteError::ZeroInterval.into());
        }

        let group = index / interval;
        let first = group * interval;
        let (offset, high) = self
            .sprites
            .shortcut(group)
            .ok_or(SpriteError::MissingShortcut(group))?;
        let start = data
            .get(offset..)
            .ok_or(SpriteError::Truncated { index: first })?;

        let mut rdr = BitReader::endian(Cursor::new(start), LittleEndian);
        if high {
            next_code(&mut rdr, first)?;
        }

        for skipped in first..index {
            decode_sprite(&mut rdr, table, layout.size_of(skipped), skipped)?;
        }
        let bytes = decode_sprite(&mut rdr, table, layout.size_of(index), index)?;

        if let Some(wtr) = self.log.as_mut() {
            writeln!(
                wtr,
                "sprite {} (shortcut {} at {:04x}{}): {:02x?}",
                index,
                group,
                offset,
                if high { "+" } else { "" },
                bytes
            )?;
        }

        Ok(bytes)
    }

    /// Decode every sprite in order, starting from the front of the stream.
    pub fn decode_all(&mut self) -> Result<Vec<Vec<u8>>, JswError> {
        let CompressedSprites {
            table, data, layout, ..
        } = self.sprites;

        let mut rdr = BitReader::endian(Cursor::new(&data[..]), LittleEndian);
        let mut sprites = Vec::with_capacity(layout.total);
        for index in 0..layout.total {
            let bytes = decode_sprite(&mut rdr, table, layout.size_of(index), index)?;
            if let Some(wtr) = self.log.as_mut() {
                writeln!(wtr, "sprite {}: {:02x?}", index, bytes)?;
            }
            sprites.push(bytes);
        }

        Ok(sprites)
    }

    /// Decode every sprite of `corpus` by index and compare it with its source.
    pub fn verify(&mut self, corpus: &SpriteCorpus) -> Result<(), JswError> {
        if corpus.len() != self.sprites.len() {
            return Err(SpriteError::OutOfRange {
                index: corpus.len(),
                count: self.sprites.len(),
            }
            .into());
        }

        for (index, sprite) in corpus.iter().enumerate() {
            let found = self.decode(index)?;
            if found != sprite.bytes() {
                return Err(SpriteError::Mismatch {
                    index,
                    expected: sprite.bytes().to_vec(),
                    found,
                }
                .into());
            }
        }

        Ok(())
    }
}

fn next_code(rdr: &mut NibbleReader<'_>, index: usize) -> Result<u8, SpriteError> {
    rdr.read::<u8>(4)
        .map_err(|_| SpriteError::Truncated { index })
}

fn lookup(table: &DecodeTable, entry: usize, index: usize) -> Result<u8, SpriteError> {
    table.get(entry).ok_or(SpriteError::TableIndex {
        index,
        entry,
        len: table.len(),
    })
}

fn decode_sprite(
    rdr: &mut NibbleReader<'_>,
    table: &DecodeTable,
    size: SpriteSize,
    index: usize,
) -> Result<Vec<u8>, SpriteError> {
    let len = size.byte_len();
    let mut bytes = Vec::with_capacity(len);

    let mut code = next_code(rdr, index)?;
    if (code as usize) < RecencyWindow::SLOTS {
        for _ in 0..len {
            let lo = next_code(rdr, index)?;
            let hi = next_code(rdr, index)?;
            bytes.push(lo | hi << 4);
        }
        return Ok(bytes);
    }

    let mut window = RecencyWindow::new();
    loop {
        let byte = match code {
            0..=3 => window.slot(code as usize),
            ROLL_LEFT => window.latest().rotate_left(1),
            ROLL_RIGHT => window.latest().rotate_right(1),
            HEAD_CODE..=9 => lookup(table, (code - HEAD_CODE) as usize, index)?,
            BODY_CODE..=14 => {
                let sub = next_code(rdr, index)? as usize;
                let entry = DecodeTable::HEAD_LEN + (code - BODY_CODE) as usize * BODY_ROW + sub;
                lookup(table, entry, index)?
            }
            LITERAL => {
                let lo = next_code(rdr, index)?;
                let hi = next_code(rdr, index)?;
                lo | hi << 4
            }
            _ => return Err(SpriteError::Truncated { index }),
        };

        bytes.push(byte);
        window.push(byte);
        if bytes.len() == len {
            return Ok(bytes);
        }
        code = next_code(rdr, index)?;
    }
}
