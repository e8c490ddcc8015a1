//! Assembler source for the room and sprite tables.
//!
//! The game is built from `!byte` tables between labelled sections. Rooms are
//! written as
//! ```text
//! room_data_address_low_table
//!     !byte <room_00_data
//! room_data_address_high_table
//!     !byte >room_00_data
//! room_data
//! room_00_data
//!     !byte $05, $a0
//! room_data_end
//! ```
//! and compressed sprites as the `enemy_sprites_frames`,
//! `sprite_decode_table`, `shortcut_table_low`, `shortcut_table_high` and
//! `sprite_data` sections plus a handful of `name = value` constants.
//!
//! The readers accept what the writers produce, ignoring comments, and
//! return the raw tables so they can be decoded and verified.
use crate::{
    errors::{JswError, ParseError, ParseErrorKind, SpriteError},
    format::{Room, RoomSchema},
    room::encode_rooms,
    sprites::{CompressedSprites, DecodeTable, SpriteLayout},
};
use std::{collections::HashMap, io::Write};

const RULE: &str =
    "; ***************************************************************************************";
const BYTES_PER_LINE: usize = 16;

/// Write `values` as `!byte` lines of up to 16 entries.
fn write_byte_lines<W: Write>(wtr: &mut W, values: &[u8]) -> Result<(), JswError> {
    for line in values.chunks(BYTES_PER_LINE) {
        let hex: Vec<String> = line.iter().map(|b| format!("${:02x}", b)).collect();
        writeln!(wtr, "    !byte {}", hex.join(", "))?;
    }
    Ok(())
}

/// Encode `rooms` and write the room address tables and room records.
///
/// Rooms must be in number order from room 0, as for
/// [`encode_rooms`](crate::room::encode_rooms).
pub fn write_room_table<W: Write>(
    wtr: &mut W,
    rooms: &[Room],
    schema: RoomSchema,
) -> Result<(), JswError> {
    let records = encode_rooms(rooms, schema)?;

    writeln!(wtr, "; Table of room addresses ({} rooms)", schema)?;
    writeln!(wtr)?;
    writeln!(wtr, "; Dec Hex  Name")?;
    writeln!(wtr, "; {}", "-".repeat(87))?;
    for room in rooms {
        writeln!(
            wtr,
            "; {:>3} ${:02x}  {}",
            room.number, room.number, room.title.text
        )?;
    }
    writeln!(wtr, "; ")?;
    writeln!(wtr, "{}", RULE)?;
    writeln!(wtr)?;

    writeln!(wtr, "room_data_address_low_table")?;
    for room in rooms {
        writeln!(wtr, "    !byte <room_{:02x}_data", room.number)?;
    }
    writeln!(wtr)?;
    writeln!(wtr, "room_data_address_high_table")?;
    for room in rooms {
        writeln!(wtr, "    !byte >room_{:02x}_data", room.number)?;
    }
    writeln!(wtr)?;

    writeln!(wtr, "{}", RULE)?;
    writeln!(wtr, "room_data")?;
    for (room, record) in rooms.iter().zip(&records) {
        writeln!(wtr, "room_{:02x}_data", room.number)?;
        write_byte_lines(wtr, record)?;
        writeln!(wtr)?;
    }
    writeln!(wtr, "room_data_end")?;

    Ok(())
}

/// Write the compressed sprite sections.
pub fn write_sprite_tables<W: Write>(
    wtr: &mut W,
    sprites: &CompressedSprites,
) -> Result<(), JswError> {
    writeln!(wtr, "{}", RULE)?;
    writeln!(wtr, "; number of frames for each enemy sprite")?;
    writeln!(wtr, "enemy_sprites_frames")?;
    // enemy sets are 1-based, entry 0 is never read
    let mut frames = vec![0x08];
    frames.extend_from_slice(&sprites.enemy_frames);
    write_byte_lines(wtr, &frames)?;
    writeln!(wtr, "enemy_sprites_frames_end")?;
    writeln!(wtr)?;

    writeln!(wtr, "; offset to start frame for each enemy sprite")?;
    writeln!(wtr, "enemy_sprites_frame_offsets")?;
    let mut offsets = vec![0u8];
    let mut total = 0u8;
    for entry in &sprites.enemy_frames {
        offsets.push(total);
        total = total.wrapping_add(entry & 0x7f);
    }
    write_byte_lines(wtr, &offsets)?;
    writeln!(wtr, "enemy_sprites_frame_offsets_end")?;
    writeln!(wtr)?;
    writeln!(wtr, "num_enemy_sprites = {}", sprites.layout.large)?;
    writeln!(wtr)?;

    writeln!(wtr, "{}", RULE)?;
    writeln!(wtr, "sprite_decode_table")?;
    for byte in sprites.table.as_bytes() {
        let bits: String = (0..8)
            .rev()
            .map(|bit| if byte >> bit & 1 == 1 { '#' } else { '.' })
            .collect();
        writeln!(wtr, "    !byte %{}", bits)?;
    }
    writeln!(wtr, "sprite_decode_table_end")?;
    writeln!(wtr)?;

    writeln!(wtr, "shortcut_interval = {}", sprites.interval)?;
    writeln!(wtr)?;
    writeln!(wtr, "shortcut_table_low")?;
    for entry in &sprites.shortcuts {
        writeln!(wtr, "    !byte <(sprite_data + ${:04x})", entry)?;
    }
    writeln!(wtr, "shortcut_table_high")?;
    for entry in &sprites.shortcuts {
        writeln!(wtr, "    !byte >(sprite_data + ${:04x})", entry)?;
    }
    writeln!(wtr)?;

    writeln!(wtr, "sprite_data")?;
    for byte in &sprites.data {
        writeln!(wtr, "    !byte ${:02x}", byte)?;
    }
    writeln!(wtr, "sprite_data_end")?;
    writeln!(wtr)?;
    writeln!(wtr, "; Sprites: {} bytes", sprites.data.len())?;
    writeln!(wtr, "first_sprite_of_font = {}", sprites.layout.first_font)?;
    writeln!(wtr, "total_sprites = {}", sprites.layout.total)?;

    Ok(())
}

/// Read the records between `room_data` and `room_data_end`, in label order.
pub fn read_room_table(text: &str) -> Result<Vec<Vec<u8>>, JswError> {
    let listing = Listing::parse(text)?;

    let start = listing.position("room_data")?;
    let end = listing.position("room_data_end")?;

    listing.sections[start + 1..end.max(start + 1)]
        .iter()
        .filter(|s| s.name.starts_with("room_") && s.name.ends_with("_data"))
        .map(|s| s.bytes().map_err(JswError::from))
        .collect()
}

/// Read the compressed sprite sections back into [`CompressedSprites`].
pub fn read_sprite_tables(text: &str) -> Result<CompressedSprites, JswError> {
    let listing = Listing::parse(text)?;

    let mut enemy_frames = listing.section("enemy_sprites_frames")?.bytes()?;
    if !enemy_frames.is_empty() {
        enemy_frames.remove(0);
    }

    let table = DecodeTable::from_bytes(&listing.section("sprite_decode_table")?.bytes()?);

    let low = listing.section("shortcut_table_low")?.addresses(true)?;
    let high = listing.section("shortcut_table_high")?.addresses(false)?;
    if low.len() != high.len() {
        return Err(SpriteError::MissingShortcut(low.len().min(high.len())).into());
    }
    let mut shortcuts = Vec::with_capacity(low.len());
    for ((line, lo), (_, hi)) in low.into_iter().zip(high) {
        if lo != hi {
            return Err(ParseErrorKind::Unknown {
                what: "shortcut pair",
                value: format!("${:04x} / ${:04x}", lo, hi),
            }
            .at(line, "")
            .into());
        }
        shortcuts.push(lo);
    }

    let data = listing.section("sprite_data")?.bytes()?;

    Ok(CompressedSprites {
        enemy_frames,
        table,
        shortcuts,
        data,
        interval: listing.constant("shortcut_interval")?,
        layout: SpriteLayout {
            large: listing.constant("num_enemy_sprites")?,
            first_font: listing.constant("first_sprite_of_font")?,
            total: listing.constant("total_sprites")?,
        },
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Byte(u8),
    /// `<expr` or `>expr`
    Address { low: bool, expr: String },
}

#[derive(Debug, Default)]
struct Section {
    name: String,
    operands: Vec<(usize, Operand)>,
}

impl Section {
    fn bytes(&self) -> Result<Vec<u8>, ParseError> {
        self.operands
            .iter()
            .map(|(line, op)| match op {
                Operand::Byte(b) => Ok(*b),
                Operand::Address { expr, .. } => Err(ParseErrorKind::Unknown {
                    what: "byte",
                    value: expr.clone(),
                }
                .at(*line, expr)),
            })
            .collect()
    }

    /// The offsets of `<(sprite_data + $oooo)` style operands.
    fn addresses(&self, want_low: bool) -> Result<Vec<(usize, u16)>, ParseError> {
        self.operands
            .iter()
            .map(|(line, op)| {
                let bad = |expr: &str| {
                    ParseErrorKind::Unknown {
                        what: "shortcut",
                        value: expr.to_string(),
                    }
                    .at(*line, expr)
                };
                match op {
                    Operand::Address { low, expr } if *low == want_low => expr
                        .strip_prefix("(sprite_data")
                        .and_then(|e| e.strip_suffix(')'))
                        .and_then(|e| e.trim().strip_prefix('+'))
                        .and_then(|e| e.trim().strip_prefix('$'))
                        .and_then(|hex| u16::from_str_radix(hex, 16).ok())
                        .map(|offset| (*line, offset))
                        .ok_or_else(|| bad(expr)),
                    Operand::Address { expr, .. } => Err(bad(expr)),
                    Operand::Byte(b) => Err(bad(&format!("${:02x}", b))),
                }
            })
            .collect()
    }
}

/// Labelled sections and constants of an assembler source.
#[derive(Debug, Default)]
struct Listing {
    sections: Vec<Section>,
    constants: HashMap<String, usize>,
}

impl Listing {
    fn parse(text: &str) -> Result<Self, ParseError> {
        let mut listing = Listing::default();

        for (i, raw) in text.lines().enumerate() {
            let n = i + 1;
            let code = raw.split(';').next().unwrap_or("");
            let line = code.trim();
            if line.is_empty() {
                continue;
            }
            let at = |kind: ParseErrorKind| kind.at(n, raw);

            if let Some(values) = line.strip_prefix("!byte") {
                let section = listing
                    .sections
                    .last_mut()
                    .ok_or_else(|| at(ParseErrorKind::OutsideBlock))?;
                for value in values.split(',') {
                    let op = operand(value.trim()).map_err(at)?;
                    section.operands.push((n, op));
                }
            } else if let Some((name, value)) = line.split_once('=') {
                let value = number(value.trim()).map_err(at)?;
                listing.constants.insert(name.trim().to_string(), value);
            } else if is_label(line) && !code.starts_with(char::is_whitespace) {
                listing.sections.push(Section {
                    name: line.to_string(),
                    operands: Vec::new(),
                });
            } else {
                return Err(at(ParseErrorKind::Unrecognised));
            }
        }

        Ok(listing)
    }

    fn position(&self, name: &'static str) -> Result<usize, SpriteError> {
        self.sections
            .iter()
            .position(|s| s.name == name)
            .ok_or(SpriteError::MissingSection(name))
    }

    fn section(&self, name: &'static str) -> Result<&Section, SpriteError> {
        self.position(name).map(|i| &self.sections[i])
    }

    fn constant(&self, name: &'static str) -> Result<usize, SpriteError> {
        self.constants
            .get(name)
            .copied()
            .ok_or(SpriteError::MissingSection(name))
    }
}

fn is_label(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `123` or `$7b`
fn number(s: &str) -> Result<usize, ParseErrorKind> {
    let parsed = match s.strip_prefix('$') {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| ParseErrorKind::Number(s.to_string()))
}

fn operand(s: &str) -> Result<Operand, ParseErrorKind> {
    if let Some(expr) = s.strip_prefix('<') {
        return Ok(Operand::Address {
            low: true,
            expr: expr.trim().to_string(),
        });
    }
    if let Some(expr) = s.strip_prefix('>') {
        return Ok(Operand::Address {
            low: false,
            expr: expr.trim().to_string(),
        });
    }

    let value = if let Some(bits) = s.strip_prefix('%') {
        if bits.len() != 8 {
            return Err(ParseErrorKind::Number(s.to_string()));
        }
        bits.chars().try_fold(0usize, |acc, c| match c {
            '#' | '1' => Ok(acc << 1 | 1),
            '.' | '0' => Ok(acc << 1),
            _ => Err(ParseErrorKind::Number(s.to_string())),
        })?
    } else {
        number(s)?
    };

    if value > 0xff {
        return Err(ParseErrorKind::Number(s.to_string()));
    }
    Ok(Operand::Byte(value as u8))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        errors::{RecordError, RoomError},
        format::{Arrow, Enemy},
        sprites::{EnemySprites, Sprite, SpriteCompressor, SpriteCorpus, SpriteSize},
    };

    fn rooms() -> Vec<Room> {
        let mut title = Room::new(0);
        title.arrows[1] = Some(Arrow { y: 3, timing: 1 });

        let mut hall = Room::new(1);
        hall.title.text = "The Hall".into();
        hall.items = vec![false; 9];
        hall.enemies = vec![Enemy::default(); 3];

        vec![title, hall]
    }

    #[test]
    fn room_table_round_trip() -> Result<(), JswError> {
        let rooms = rooms();
        let mut out = Vec::new();
        write_room_table(&mut out, &rooms, RoomSchema::Extended)?;
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("    !byte <room_01_data\n"));
        assert!(text.contains(";   1 $01  The Hall\n"));
        assert_eq!(
            read_room_table(&text)?,
            encode_rooms(&rooms, RoomSchema::Extended)?
        );
        Ok(())
    }

    #[test]
    fn rooms_out_of_order_are_not_written() {
        let mut rooms = rooms();
        rooms.swap(0, 1);
        let mut out = Vec::new();
        match write_room_table(&mut out, &rooms, RoomSchema::Extended) {
            Err(JswError::Room(RoomError { room: 1, source })) => {
                assert_eq!(source, RecordError::OutOfOrder { position: 0 })
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn long_records_wrap() -> Result<(), JswError> {
        let mut out = Vec::new();
        write_byte_lines(&mut out, &[0xab; 20])?;
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].matches('$').count(), 16);
        assert_eq!(lines[1], "    !byte $ab, $ab, $ab, $ab");
        Ok(())
    }

    fn corpus() -> SpriteCorpus {
        let frame = |seed: u8| {
            let bytes = (0..32).map(|i| if i % 3 == 0 { seed } else { 0 }).collect();
            Sprite::from_bytes("", SpriteSize::Large, bytes).unwrap()
        };
        let tile = |seed: u8| {
            Sprite::from_bytes("", SpriteSize::Tile, vec![seed, 0, seed, 0xff, 0, 0, seed, 1])
                .unwrap()
        };
        SpriteCorpus {
            enemies: vec![
                EnemySprites {
                    name: "a".into(),
                    reverse: true,
                    frames: vec![frame(0x18), frame(0x3c)],
                },
                EnemySprites {
                    name: "b".into(),
                    reverse: false,
                    frames: vec![frame(0x7e)],
                },
            ],
            backgrounds: (0..10).map(tile).collect(),
            fonts: (0x40..0x48).map(tile).collect(),
        }
    }

    #[test]
    fn sprite_tables_round_trip() -> Result<(), JswError> {
        let corpus = corpus();
        let packed = SpriteCompressor::for_corpus(&corpus)
            .shortcut_interval(4)
            .compress()?;

        let mut out = Vec::new();
        write_sprite_tables(&mut out, &packed)?;
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("    !byte $08, $82, $01\n"));
        assert!(text.contains("    !byte $00, $00, $02\n"));
        assert!(text.contains("num_enemy_sprites = 3\n"));
        assert!(text.contains("first_sprite_of_font = 13\n"));
        assert!(text.contains("total_sprites = 21\n"));
        assert!(text.contains("    !byte <(sprite_data + $0000)\n"));

        assert_eq!(read_sprite_tables(&text)?, packed);
        Ok(())
    }

    #[test]
    fn binary_operands() {
        assert_eq!(operand("%##......"), Ok(Operand::Byte(0xc0)));
        assert_eq!(operand("%00000101"), Ok(Operand::Byte(0x05)));
        assert_eq!(operand("$1f"), Ok(Operand::Byte(0x1f)));
        assert_eq!(operand("200"), Ok(Operand::Byte(200)));
        assert!(operand("%##").is_err());
        assert!(operand("$100").is_err());
    }

    #[test]
    fn missing_sections() {
        let text = "sprite_decode_table\n    !byte $01\nsprite_decode_table_end\n";
        assert!(matches!(
            read_sprite_tables(text),
            Err(JswError::Sprite(SpriteError::MissingSection("enemy_sprites_frames")))
        ));
        assert!(matches!(
            read_room_table(text),
            Err(JswError::Sprite(SpriteError::MissingSection("room_data")))
        ));
    }

    #[test]
    fn stray_bytes_are_rejected() {
        match read_room_table("    !byte $01\n") {
            Err(JswError::Parse(e)) => {
                assert_eq!(e.line, 1);
                assert_eq!(e.kind, ParseErrorKind::OutsideBlock);
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
    }
}
