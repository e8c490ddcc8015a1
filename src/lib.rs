//! Level data tools for Jet Set Willy style platform games.
//!
//! The game stores its rooms as bit packed records and its sprites as a
//! dictionary compressed nibble stream, both embedded in the assembler source
//! as `!byte` tables. This crate converts between those tables and an
//! editable text format:
//!
//! * [`room`] encodes and decodes room records through a [`BitChannel`],
//!   in either [`RoomSchema`].
//! * [`sprites`] compresses a [`SpriteCorpus`] with [`SpriteCompressor`] and
//!   reads single sprites back with [`SpriteDecoder`].
//! * [`text`] parses and writes the text format.
//! * [`asm`] writes and reads the assembler tables.
//!
//! ```
//! use jsw_data::{decode_rooms, encode_rooms, text, RoomSchema};
//!
//! let doc = text::parse(
//!     "Room 0\nRoom 1\n    Title: tab 4, \"The Attic\"\n",
//!     RoomSchema::Extended,
//! )
//! .unwrap();
//!
//! let records = encode_rooms(&doc.rooms, RoomSchema::Extended).unwrap();
//! assert_eq!(decode_rooms(&records, RoomSchema::Extended).unwrap(), doc.rooms);
//! ```
pub mod asm;
pub mod bits;
pub mod errors;
pub mod format;
pub mod room;
pub mod sprites;
pub mod text;

pub use crate::{
    bits::BitChannel,
    errors::{JswError, ParseError, RoomError, SpriteError},
    format::{Room, RoomSchema},
    room::{decode_room, decode_rooms, encode_room, encode_rooms},
    sprites::{
        CompressedSprites, CompressorSettings, DecodeTable, SpriteCompressor, SpriteCorpus,
        SpriteDecoder,
    },
    text::{Document, TextParser},
};
