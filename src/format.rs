//! The room data model and the layout of a binary room record.
//!
//! A room record is a run of bit fields pushed through a [`BitChannel`] in a
//! fixed order and padded to a whole byte at the end. There is no length
//! prefix: a decoder knows where each field ends only because it reads the
//! same widths in the same order. Two generations of the record exist,
//! selected by [`RoomSchema`].
//!
//! ## Extended Record
//! | Field                 | Bits           | Notes |
//! | --------------------- | :------------: | ----- |
//! | item count            | 4              | |
//! | item collected flags  | 1 per item     | |
//! | exits                 | 4 × 6          | left, right, up, down |
//! | conveyor direction    | 1              | 0 = left, 1 = right |
//! | slope direction       | 1              | 0 = `/`, 1 = `\` |
//! | rope present          | 1              | |
//! | tile colours          | 6 × (2 + 2)    | foreground then background for scenery, deadly, conveyor, slope, wall, platform |
//! | tile sprites          | 7 × 8          | item, scenery, deadly, conveyor, slope, wall, platform |
//! | palette               | 4 × 3          | entry 3 first, down to entry 0 |
//! | palette change count  | 4              | |
//! | palette changes       | count × (4 + 5)| row, then `logical + 4 * physical` |
//! | title tab             | 4              | |
//! | title length          | 5              | token count − 1 |
//! | title                 | 5 per token    | |
//! | tile commands         | variable       | ends with the end command |
//! | enemy count           | 3              | |
//! | enemies               | count × 32     | see below |
//! | arrows                | 2 × (1 [+ 4 + 1]) | presence, then Y and timing |
//!
//! ## Classic Record
//! The classic record has no scenery tile, no background colours and no
//! palette changes, and gives arrows a wider timing index:
//!
//! | Field         | Bits       | Notes |
//! | ------------- | :--------: | ----- |
//! | tile colours  | 5 × 2      | deadly, conveyor, slope, wall, platform |
//! | tile sprites  | 6 × 8      | item, deadly, conveyor, slope, wall, platform |
//! | title         | 5 per token | ends with the end token, no length |
//! | arrows        | 2 × (1 [+ 4 + 3]) | |
//!
//! Every other field is the same as the extended record. Neither record has
//! room for an item tile colour.
//!
//! Room 0 is the title screen. Its record holds only the enemy count, the
//! enemies and the arrows.
//!
//! The game's own extended encoder also writes any room with an empty title
//! this way. Nothing in the record marks the skipped layout, so such a record
//! cannot be read back; extended rooms other than room 0 must have a title.
//!
//! ## Enemies
//! | Field        | Bits | Notes |
//! | ------------ | :--: | ----- |
//! | sprite set   | 6    | 1-based index of the enemy sprite set |
//! | x, y         | 5, 4 | initial tile position |
//! | min, max     | 5, 5 | patrol extent |
//! | vertical     | 1    | set for up and down |
//! | positive     | 1    | set for right and down |
//! | speed        | 3    | |
//! | colour       | 2    | logical colour |
//!
//! ## Titles
//! Titles are a sequence of 5 bit tokens:
//!
//! | Token        | Meaning |
//! | ------------ | ------- |
//! | `$00`..`$19` | a letter, uppercase if the capitalise flag is set (which clears it) |
//! | `$1a`        | capitalise the next letter |
//! | `$1b`        | apostrophe |
//! | `$1c`        | classic: end of title; extended: full stop |
//! | `$1d`        | space |
//! | `$1e`        | space, then capitalise the next letter |
//! | `$1f`        | "The" when the capitalise flag is set (which clears it), else "the" |
//!
//! The capitalise flag starts set, so "The Bathroom" is stored as
//! ```text
//! $1f $1e B a t h r o o m $1c      classic
//! $09 $1f $1e B a t h r o o m      extended
//! ```
//!
//! A title holds at most 32 characters. A decoder that reaches a 33rd
//! character reports an overrun instead of stopping there, so a record
//! that has lost its end token or length is never read on into the tile
//! commands.
//!
//! ## Tile Commands
//! Each command starts with 2 bit symbols. A symbol of 3 escapes to the next
//! tier; the first other symbol picks the command within its tier:
//!
//! | Prefix    | Command       | Arguments |
//! | --------- | ------------- | --------- |
//! | `0`       | use tile      | kind (3) |
//! | `1`       | move to       | x (5), y (4) |
//! | `2`       | strip         | vertical (1), until (5) |
//! | `3 0`     | block         | extent x (5), final y (4) |
//! | `3 1`     | point list    | count − 1 (4), then count × (x (5), y (4)) |
//! | `3 2`     | slope         | moving left (1), final y (4) |
//! | `3 3 0`   | end           | |
//! | `3 3 1`   | reserved      | |
//! | `3 3 2`   | triangle      | moving left (1), final y (4) |
//!
//! [`BitChannel`]: crate::BitChannel
use smallvec::SmallVec;
use std::fmt;

/// The generation of the room record layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RoomSchema {
    /// Six tile kinds with one logical colour each
    Classic,
    /// Adds the scenery tile, background colours, and palette changes
    Extended,
}

impl RoomSchema {
    /// The tile kinds this schema stores, in the order their colours are stored.
    pub fn coloured_tiles(self) -> &'static [TileKind] {
        use TileKind::*;
        match self {
            Self::Classic => &[Deadly, Conveyor, Slope, Wall, Platform],
            Self::Extended => &[Scenery, Deadly, Conveyor, Slope, Wall, Platform],
        }
    }

    /// The tile kinds in the order their sprite references are stored.
    pub fn sprite_tiles(self) -> &'static [TileKind] {
        use TileKind::*;
        match self {
            Self::Classic => &[Item, Deadly, Conveyor, Slope, Wall, Platform],
            Self::Extended => &[Item, Scenery, Deadly, Conveyor, Slope, Wall, Platform],
        }
    }

    pub(crate) fn arrow_timing_bits(self) -> u32 {
        match self {
            Self::Classic => 3,
            Self::Extended => 1,
        }
    }
}

impl Default for RoomSchema {
    fn default() -> Self {
        Self::Extended
    }
}

impl fmt::Display for RoomSchema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Classic => write!(f, "classic"),
            Self::Extended => write!(f, "extended"),
        }
    }
}

/// The eight physical colours.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Colour {
    Black = 0,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Colour {
    pub const ALL: [Colour; 8] = [
        Colour::Black,
        Colour::Red,
        Colour::Green,
        Colour::Yellow,
        Colour::Blue,
        Colour::Magenta,
        Colour::Cyan,
        Colour::White,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::White => "white",
        }
    }
}

impl Default for Colour {
    fn default() -> Self {
        Self::Black
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The kinds of tile a room can draw with.
///
/// The numeric code of a kind depends on the schema: the extended schema
/// inserts `Scenery` at 5 and moves `Item` to 6.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TileKind {
    Platform,
    Wall,
    Slope,
    Conveyor,
    Deadly,
    Scenery,
    Item,
}

impl TileKind {
    pub const ALL: [TileKind; 7] = [
        TileKind::Platform,
        TileKind::Wall,
        TileKind::Slope,
        TileKind::Conveyor,
        TileKind::Deadly,
        TileKind::Scenery,
        TileKind::Item,
    ];

    pub fn code(self, schema: RoomSchema) -> Option<u8> {
        match (self, schema) {
            (Self::Platform, _) => Some(0),
            (Self::Wall, _) => Some(1),
            (Self::Slope, _) => Some(2),
            (Self::Conveyor, _) => Some(3),
            (Self::Deadly, _) => Some(4),
            (Self::Scenery, RoomSchema::Classic) => None,
            (Self::Scenery, RoomSchema::Extended) => Some(5),
            (Self::Item, RoomSchema::Classic) => Some(5),
            (Self::Item, RoomSchema::Extended) => Some(6),
        }
    }

    pub fn from_code(code: u8, schema: RoomSchema) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.code(schema) == Some(code))
    }

    /// Upper case name used by `Use` tile commands
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Platform => "PLATFORM",
            Self::Wall => "WALL",
            Self::Slope => "SLOPE",
            Self::Conveyor => "CONVEYOR",
            Self::Deadly => "DEADLY",
            Self::Scenery => "SCENERY",
            Self::Item => "ITEM",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.keyword() == word)
    }

    /// Capitalised name used by the tile colour and sprite lines
    pub fn label(self) -> &'static str {
        match self {
            Self::Platform => "Platform",
            Self::Wall => "Wall",
            Self::Slope => "Slope",
            Self::Conveyor => "Conveyor",
            Self::Deadly => "Deadly",
            Self::Scenery => "Scenery",
            Self::Item => "Item",
        }
    }

    pub fn from_label(word: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.label() == word)
    }
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// How a tile kind is drawn in one room.
///
/// The classic schema only stores a single logical colour, kept in
/// `foreground`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct TileStyle {
    pub foreground: u8,
    pub background: u8,
    /// 0-based index into the background sprites
    pub sprite: u8,
}

/// A [`TileStyle`] for every [`TileKind`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct TileStyles {
    pub platform: TileStyle,
    pub wall: TileStyle,
    pub slope: TileStyle,
    pub conveyor: TileStyle,
    pub deadly: TileStyle,
    pub scenery: TileStyle,
    pub item: TileStyle,
}

impl TileStyles {
    pub fn get(&self, kind: TileKind) -> &TileStyle {
        match kind {
            TileKind::Platform => &self.platform,
            TileKind::Wall => &self.wall,
            TileKind::Slope => &self.slope,
            TileKind::Conveyor => &self.conveyor,
            TileKind::Deadly => &self.deadly,
            TileKind::Scenery => &self.scenery,
            TileKind::Item => &self.item,
        }
    }

    pub fn get_mut(&mut self, kind: TileKind) -> &mut TileStyle {
        match kind {
            TileKind::Platform => &mut self.platform,
            TileKind::Wall => &mut self.wall,
            TileKind::Slope => &mut self.slope,
            TileKind::Conveyor => &mut self.conveyor,
            TileKind::Deadly => &mut self.deadly,
            TileKind::Scenery => &mut self.scenery,
            TileKind::Item => &mut self.item,
        }
    }
}

/// Horizontal direction of conveyors, slopes, and triangles.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Heading {
    Left,
    Right,
}

impl Default for Heading {
    fn default() -> Self {
        Self::Left
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Which way the room's slopes lean.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SlopeDir {
    /// `/`
    Forward,
    /// `\`
    Backward,
}

impl Default for SlopeDir {
    fn default() -> Self {
        Self::Forward
    }
}

impl fmt::Display for SlopeDir {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "/"),
            Self::Backward => write!(f, "\\"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// A tile position in the room grid.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct TilePos {
    pub x: u8,
    pub y: u8,
}

impl TilePos {
    pub const X_BITS: u32 = 5;
    pub const Y_BITS: u32 = 4;

    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// The tiles of a point list command.
pub type Points = SmallVec<[TilePos; 16]>;

/// One instruction of the tile drawing program.
///
/// The end of the program is not a variant: a room's command list ends
/// where the `Vec` ends, and the codecs write and read the end command.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum TileCommand {
    /// Select the tile kind drawn by the following commands
    Use(TileKind),
    MoveTo(TilePos),
    /// Draw from the cursor until the given X (horizontal) or Y (vertical).
    /// Leaves the cursor on the end tile.
    Strip { axis: Axis, until: u8 },
    /// Fill the rectangle from the cursor to `extent_x`, `final_y`.
    /// Keeps cursor Y, and moves cursor X one past the right edge.
    Block { extent_x: u8, final_y: u8 },
    /// Single tiles at 1 to 16 positions
    Points(Points),
    /// Diagonal stroke; leaves the cursor on the end tile
    Slope { heading: Heading, final_y: u8 },
    Triangle { heading: Heading, final_y: u8 },
}

/// The direction an enemy is moving when the room is entered.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }

    /// right or down
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Right | Self::Down)
    }

    pub fn from_bits(vertical: bool, positive: bool) -> Self {
        match (vertical, positive) {
            (false, false) => Self::Left,
            (false, true) => Self::Right,
            (true, false) => Self::Up,
            (true, true) => Self::Down,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::Left
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Enemy {
    /// 1-based index of the enemy sprite set
    pub sprite: u8,
    pub pos: TilePos,
    pub min: u8,
    pub max: u8,
    pub direction: Direction,
    pub speed: u8,
    pub colour: u8,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Arrow {
    pub y: u8,
    pub timing: u8,
}

/// Replace logical colour `logical` with `physical` from `row` downward.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PaletteChange {
    pub row: u8,
    pub logical: u8,
    pub physical: Colour,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct Title {
    pub tab: u8,
    pub text: String,
}

/// Room numbers of the neighbouring rooms.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Exits {
    pub left: u8,
    pub right: u8,
    pub up: u8,
    pub down: u8,
}

impl Exits {
    pub fn to_array(self) -> [u8; 4] {
        [self.left, self.right, self.up, self.down]
    }

    pub fn from_array([left, right, up, down]: [u8; 4]) -> Self {
        Self {
            left,
            right,
            up,
            down,
        }
    }
}

/// Everything stored for one room.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct Room {
    pub number: u8,
    /// collected state of each item
    pub items: Vec<bool>,
    pub exits: Exits,
    pub conveyor: Heading,
    pub slope: SlopeDir,
    pub rope: bool,
    pub tiles: TileStyles,
    /// logical to physical colour
    pub palette: [Colour; 4],
    pub palette_changes: Vec<PaletteChange>,
    pub title: Title,
    pub commands: Vec<TileCommand>,
    pub enemies: Vec<Enemy>,
    pub arrows: [Option<Arrow>; 2],
}

impl Room {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    /// Room 0 is the title screen and stores no layout.
    pub fn is_title_screen(&self) -> bool {
        self.number == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tile_codes_follow_schema() {
        assert_eq!(TileKind::Item.code(RoomSchema::Classic), Some(5));
        assert_eq!(TileKind::Item.code(RoomSchema::Extended), Some(6));
        assert_eq!(TileKind::Scenery.code(RoomSchema::Classic), None);

        for &schema in &[RoomSchema::Classic, RoomSchema::Extended] {
            for code in 0..8 {
                if let Some(kind) = TileKind::from_code(code, schema) {
                    assert_eq!(kind.code(schema), Some(code));
                }
            }
        }
        assert_eq!(TileKind::from_code(6, RoomSchema::Classic), None);
        assert_eq!(TileKind::from_code(7, RoomSchema::Extended), None);
    }

    #[test]
    fn enemy_direction_bits() {
        for &dir in &[
            Direction::Left,
            Direction::Right,
            Direction::Up,
            Direction::Down,
        ] {
            assert_eq!(Direction::from_bits(dir.is_vertical(), dir.is_positive()), dir);
        }
        assert!(Direction::Down.is_positive());
        assert!(!Direction::Up.is_positive());
    }

    #[test]
    fn colour_names() {
        for &c in &Colour::ALL {
            assert_eq!(Colour::from_name(c.name()), Some(c));
            assert_eq!(Colour::from_index(c.index()), Some(c));
        }
        assert_eq!(Colour::from_index(8), None);
        assert_eq!(Colour::from_name("orange"), None);
    }
}
