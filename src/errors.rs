use std::io;
use thiserror::Error;

/// Top-level error for every encode, decode, and parse operation in the crate.
#[derive(Error, Debug)]
pub enum JswError {
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Sprite(#[from] SpriteError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Failures of the raw bit channel.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitError {
    #[error("bit stream exhausted: requested {requested} bits, {available} available")]
    Exhausted { requested: u32, available: usize },

    #[error("value {value} does not fit in {width} bits")]
    Overflow { value: u32, width: u32 },

    #[error("field width {0} is wider than 32 bits")]
    InvalidWidth(u32),
}

/// A [`BitError`] tagged with the name of the field being read or written.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("field '{field}': {source}")]
pub struct FieldError {
    pub field: &'static str,
    #[source]
    pub source: BitError,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TitleError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("title has {0} characters, at most {max} fit", max = crate::room::MAX_TITLE_LEN)]
    TooLong(usize),

    #[error("character {ch:?} at position {pos} cannot be encoded in a title")]
    Unsupported { ch: char, pos: usize },

    #[error("character {ch:?} at position {pos} must be {expected}")]
    Capitalisation {
        ch: char,
        pos: usize,
        expected: &'static str,
    },

    #[error("title runs past {max} characters", max = crate::room::MAX_TITLE_LEN)]
    Overrun,

    #[error("extended records cannot hold an empty title outside room 0")]
    Empty,

    #[error("title needs {0} tokens, at most {max} fit", max = crate::room::title::MAX_TITLE_TOKENS)]
    TooManyTokens(usize),

    #[error("title token {0:#04x} is wider than 5 bits")]
    BadToken(u8),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("reserved tile command: escape tier {tier}, symbol {symbol}")]
    Reserved { tier: u8, symbol: u8 },

    #[error("tile kind {code} is not defined by this schema")]
    UnknownTile { code: u8 },

    #[error("tile kind {0:?} is not defined by this schema")]
    UnsupportedTile(crate::format::TileKind),

    #[error("point lists hold 1 to 16 tiles, found {0}")]
    PointCount(usize),
}

/// Errors for a single room record, before the room number is attached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("title: {0}")]
    Title(#[from] TitleError),

    #[error("tile commands: {0}")]
    Command(#[from] CommandError),

    #[error("{what}: {count} entries, at most {max} fit")]
    TooMany {
        what: &'static str,
        count: usize,
        max: usize,
    },

    #[error("{0} is not stored by this schema")]
    NotInSchema(&'static str),

    #[error("room 0 carries only enemies and arrows, but {0} was set")]
    LayoutOnTitleScreen(&'static str),

    #[error("{0} bytes left over after the record")]
    TrailingBytes(usize),

    #[error("room is at position {position} of the table, rooms are stored in number order from 0")]
    OutOfOrder { position: usize },
}

/// A [`RecordError`] located at a particular room.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("room {room}: {source}")]
pub struct RoomError {
    pub room: u8,
    #[source]
    pub source: RecordError,
}

impl RoomError {
    pub(crate) fn at(room: u8) -> impl FnOnce(RecordError) -> Self {
        move |source| Self { room, source }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpriteError {
    #[error("compressed sprite data ended early while decoding sprite {index}")]
    Truncated { index: usize },

    #[error("sprite {index} refers to decode table entry {entry}, but the table has {len}")]
    TableIndex {
        index: usize,
        entry: usize,
        len: usize,
    },

    #[error("sprite {index} is out of range: there are {count} sprites")]
    OutOfRange { index: usize, count: usize },

    #[error("no shortcut entry for sprite group {0}")]
    MissingShortcut(usize),

    #[error("sprite data is {0} bytes, too large for 15 bit shortcut offsets")]
    ShortcutOverflow(usize),

    #[error("sprite {name:?} has {found} bytes, expected {expected}")]
    BadSize {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("row {row} of sprite {name:?} is wider than the sprite")]
    RowTooWide { name: String, row: usize },

    #[error("16x16 sprites must precede 8x8 sprites, but sprite {0} breaks the order")]
    Layout(usize),

    #[error("shortcut interval must be at least 1")]
    ZeroInterval,

    #[error("self-check failed: sprite {index} decodes to {found:02x?}, expected {expected:02x?}")]
    Mismatch {
        index: usize,
        expected: Vec<u8>,
        found: Vec<u8>,
    },

    #[error("assembler section '{0}' is missing")]
    MissingSection(&'static str),
}

/// A line of the text interchange format (or assembler source) that
/// could not be understood.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind} in {text:?}")]
pub struct ParseError {
    pub line: usize,
    pub text: String,
    #[source]
    pub kind: ParseErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("no grammar rule matches")]
    Unrecognised,

    #[error("line is outside of any room or sprite block")]
    OutsideBlock,

    #[error("bad number '{0}'")]
    Number(String),

    #[error("unknown {what} '{value}'")]
    Unknown { what: &'static str, value: String },

    #[error("enemy field before any 'Enemy:' line")]
    NoEnemy,

    #[error("'cancel' needs the room palette to be set first")]
    NoPalette,

    #[error("sprite row of width {found} does not fit a {expected} pixel sprite")]
    RowWidth { expected: usize, found: usize },

    #[error("sprite row before any sprite header")]
    NoSprite,

    #[error("sprite {name:?} has {found} rows, expected {expected}")]
    RowCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("sprite {0:?} is not defined")]
    UnresolvedSprite(String),

    #[error("enemy sprite {0:?} is not defined")]
    UnresolvedEnemy(String),

    #[error("sprite index {index} does not fit in {width} bits")]
    IndexRange { index: usize, width: u32 },

    #[error("duplicate room {0}")]
    DuplicateRoom(u8),

    #[error("a room has two arrow slots")]
    ExtraArrow,
}

impl ParseErrorKind {
    pub(crate) fn at(self, line: usize, text: &str) -> ParseError {
        ParseError {
            line,
            text: text.to_string(),
            kind: self,
        }
    }
}
