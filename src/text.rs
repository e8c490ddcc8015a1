//! The line based text format for rooms and sprites.
//!
//! A document is a sequence of blocks, each opened by a header line at the
//! start of a line:
//!
//! | Header                        | Block |
//! | ----------------------------- | ----- |
//! | `Room <n>`                    | one room, as labelled lines and tile commands |
//! | `BackgroundSprite <name>`     | eight rows of eight `.`/`#` pixels |
//! | `FontSprite`                  | eight rows of eight pixels |
//! | `Enemy <name> [with Reverse]` | `Sprite` frame headers, each followed by sixteen rows of sixteen pixels |
//!
//! Everything after a `;` is a comment. Rooms refer to sprites by name, or
//! by index when the sprite has no name. Names are resolved once the whole
//! document has been read, so sprites may be defined after the rooms that use
//! them.
//!
//! [`Report`] writes a document back out in the same grammar.
use crate::{
    errors::{JswError, ParseError, ParseErrorKind},
    format::{
        Arrow, Axis, Colour, Direction, Enemy, Exits, Heading, PaletteChange, Points, Room,
        RoomSchema, SlopeDir, TileCommand, TileKind, TilePos,
    },
    sprites::{EnemySprites, Sprite, SpriteCorpus, SpriteSize},
};
use std::{
    fmt,
    io::Write,
    str::FromStr,
};

type LogWtr<'a> = &'a mut dyn Write;

/// Everything read from a text document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub rooms: Vec<Room>,
    pub sprites: SpriteCorpus,
}

impl Document {
    /// Write the document out in the text grammar of `schema`.
    pub fn report(&self, schema: RoomSchema) -> Report<'_> {
        Report {
            rooms: &self.rooms,
            sprites: &self.sprites,
            schema,
        }
    }
}

/// Read a text document into rooms and sprites.
///
/// ```
/// # use jsw_data::{text::TextParser, RoomSchema};
/// let text = "
/// Room 1
///     Number of items: 1 (not collected)
///     Palette: black, blue, red, white
///     Title: tab 2, \"The Hall\"
///     Use PLATFORM
///     Move to (0,15)
///     Draw horizontal strip until X=31
/// ";
/// let doc = TextParser::new(RoomSchema::Extended)
///     .with_logging(&mut ::std::io::sink())
///     .parse(text)
///     .unwrap();
/// assert_eq!(doc.rooms[0].title.text, "The Hall");
/// assert_eq!(doc.rooms[0].commands.len(), 3);
/// ```
pub struct TextParser<'a> {
    schema: RoomSchema,
    log: Option<LogWtr<'a>>,
}

impl<'a> TextParser<'a> {
    #[inline]
    pub fn new(schema: RoomSchema) -> Self {
        Self { schema, log: None }
    }

    /// Write warnings to `log`. Without a log, warnings are dropped.
    #[inline]
    pub fn with_logging<W: Write>(&mut self, wtr: &'a mut W) -> &mut Self {
        self.log = Some(wtr as LogWtr);
        self
    }

    pub fn parse(&mut self, text: &str) -> Result<Document, JswError> {
        let mut state = ParseState::new(self.schema);
        for (i, raw) in text.lines().enumerate() {
            state.line(i + 1, raw)?;
        }
        let doc = state.finish()?;

        if let Some(wtr) = self.log.as_mut() {
            for warning in &doc.1 {
                writeln!(wtr, "WARNING: {}", warning)?;
            }
        }

        Ok(doc.0)
    }
}

/// Parse a text document without logging.
pub fn parse(text: &str, schema: RoomSchema) -> Result<Document, JswError> {
    TextParser::new(schema).parse(text)
}

/// A sprite or enemy name waiting to be resolved, with where it was written.
#[derive(Debug, Clone)]
struct Named {
    name: String,
    line: usize,
    text: String,
}

impl Named {
    fn new(name: &str, line: usize, text: &str) -> Self {
        Self {
            name: name.to_string(),
            line,
            text: text.to_string(),
        }
    }
}

/// The room under construction.
#[derive(Debug)]
struct RoomDraft {
    room: Room,
    tile_sprites: Vec<(TileKind, Named)>,
    /// parallel to `room.enemies`
    enemy_sprites: Vec<Option<Named>>,
    arrows: usize,
    palette_set: bool,
}

impl RoomDraft {
    fn new(number: u8) -> Self {
        Self {
            room: Room::new(number),
            tile_sprites: Vec::new(),
            enemy_sprites: Vec::new(),
            arrows: 0,
            palette_set: false,
        }
    }

    fn enemy(&mut self) -> Result<&mut Enemy, ParseErrorKind> {
        self.room.enemies.last_mut().ok_or(ParseErrorKind::NoEnemy)
    }

    fn resolve(self, corpus: &SpriteCorpus) -> Result<Room, ParseError> {
        let RoomDraft {
            mut room,
            tile_sprites,
            enemy_sprites,
            ..
        } = self;

        for (kind, named) in tile_sprites {
            let index = corpus
                .background_index(&named.name)
                .or_else(|| named.name.parse().ok())
                .ok_or_else(|| ParseErrorKind::UnresolvedSprite(named.name.clone()))
                .and_then(|i| fit_index(i, 8))
                .map_err(|kind| kind.at(named.line, &named.text))?;
            room.tiles.get_mut(kind).sprite = index;
        }

        for (enemy, named) in room.enemies.iter_mut().zip(enemy_sprites) {
            if let Some(named) = named {
                enemy.sprite = corpus
                    .enemy_index(&named.name)
                    .or_else(|| named.name.parse().ok())
                    .ok_or_else(|| ParseErrorKind::UnresolvedEnemy(named.name.clone()))
                    .and_then(|i| fit_index(i, 6))
                    .map_err(|kind| kind.at(named.line, &named.text))?;
            }
        }

        Ok(room)
    }
}

fn fit_index(index: usize, width: u32) -> Result<u8, ParseErrorKind> {
    if index >> width == 0 {
        Ok(index as u8)
    } else {
        Err(ParseErrorKind::IndexRange { index, width })
    }
}

#[derive(Debug)]
struct SpriteDraft {
    name: String,
    line: usize,
    text: String,
    rows: Vec<u16>,
}

impl SpriteDraft {
    fn new(name: &str, line: usize, text: &str) -> Self {
        Self {
            name: name.to_string(),
            line,
            text: text.to_string(),
            rows: Vec::with_capacity(16),
        }
    }

    fn finish(self, size: SpriteSize) -> Result<Sprite, ParseError> {
        let SpriteDraft {
            name,
            line,
            text,
            rows,
        } = self;

        if rows.len() != size.height() {
            return Err(ParseErrorKind::RowCount {
                name,
                expected: size.height(),
                found: rows.len(),
            }
            .at(line, &text));
        }
        Sprite::from_rows(name, size, &rows).map_err(|e| {
            ParseErrorKind::Unknown {
                what: "sprite",
                value: e.to_string(),
            }
            .at(line, &text)
        })
    }
}

#[derive(Debug)]
struct EnemyDraft {
    name: String,
    reverse: bool,
    frames: Vec<SpriteDraft>,
}

#[derive(Debug)]
enum Block {
    Outside,
    Room(RoomDraft),
    Background(SpriteDraft),
    Font(SpriteDraft),
    Enemy(EnemyDraft),
}

struct ParseState {
    schema: RoomSchema,
    rooms: Vec<RoomDraft>,
    corpus: SpriteCorpus,
    block: Block,
    warnings: Vec<String>,
}

impl ParseState {
    fn new(schema: RoomSchema) -> Self {
        Self {
            schema,
            rooms: Vec::new(),
            corpus: SpriteCorpus::default(),
            block: Block::Outside,
            warnings: Vec::new(),
        }
    }

    fn line(&mut self, n: usize, raw: &str) -> Result<(), ParseError> {
        let text = raw.split(';').next().unwrap_or("");
        let line = text.trim();
        if line.is_empty() {
            return Ok(());
        }

        let at = |kind: ParseErrorKind| kind.at(n, raw);

        if let Some(block) = header(n, line).map_err(at)? {
            let done = std::mem::replace(&mut self.block, block);
            self.close(done)?;
            if let Block::Room(draft) = &self.block {
                let number = draft.room.number;
                if self.rooms.iter().any(|r| r.room.number == number) {
                    return Err(at(ParseErrorKind::DuplicateRoom(number)));
                }
            }
            return Ok(());
        }

        let mut warnings = Vec::new();
        let result = match &mut self.block {
            Block::Outside => Err(ParseErrorKind::OutsideBlock),
            Block::Room(draft) => {
                let result = room_line(draft, n, raw, line, &mut warnings);
                if self.schema == RoomSchema::Classic && result.is_ok() {
                    if let Some(what) = extended_only(line) {
                        warnings.push(format!("{} is not stored by the classic record", what));
                    }
                }
                result
            }
            Block::Background(sprite) | Block::Font(sprite) => {
                pixel_row(line, SpriteSize::Tile).map(|row| sprite.rows.push(row))
            }
            Block::Enemy(enemy) => {
                if line == "Sprite" {
                    enemy.frames.push(SpriteDraft::new(&enemy.name, n, raw));
                    Ok(())
                } else {
                    let row = pixel_row(line, SpriteSize::Large);
                    match enemy.frames.last_mut() {
                        Some(frame) => row.map(|row| frame.rows.push(row)),
                        None => row.and(Err(ParseErrorKind::NoSprite)),
                    }
                }
            }
        };

        self.warnings
            .extend(warnings.into_iter().map(|w| format!("line {}: {}", n, w)));
        result.map_err(at)
    }

    fn close(&mut self, block: Block) -> Result<(), ParseError> {
        match block {
            Block::Outside => {}
            Block::Room(draft) => self.rooms.push(draft),
            Block::Background(sprite) => {
                let sprite = sprite.finish(SpriteSize::Tile)?;
                self.corpus.backgrounds.push(sprite);
            }
            Block::Font(sprite) => {
                let sprite = sprite.finish(SpriteSize::Tile)?;
                self.corpus.fonts.push(sprite);
            }
            Block::Enemy(enemy) => {
                let frames = enemy
                    .frames
                    .into_iter()
                    .map(|frame| frame.finish(SpriteSize::Large))
                    .collect::<Result<_, _>>()?;
                self.corpus.enemies.push(EnemySprites {
                    name: enemy.name,
                    reverse: enemy.reverse,
                    frames,
                });
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<(Document, Vec<String>), ParseError> {
        let last = std::mem::replace(&mut self.block, Block::Outside);
        self.close(last)?;

        let corpus = self.corpus;
        let rooms = self
            .rooms
            .into_iter()
            .map(|draft| draft.resolve(&corpus))
            .collect::<Result<_, _>>()?;

        Ok((
            Document {
                rooms,
                sprites: corpus,
            },
            self.warnings,
        ))
    }
}

/// The room lines only the extended record can store.
fn extended_only(line: &str) -> Option<&'static str> {
    if field(line, "Palette change").is_some() {
        Some("a palette change")
    } else if line.starts_with("Scenery tile") {
        Some("the scenery tile")
    } else if line.contains(" tile logical colours") {
        Some("a background colour")
    } else {
        None
    }
}

/// Recognise a block header, returning the fresh block.
fn header(n: usize, line: &str) -> Result<Option<Block>, ParseErrorKind> {
    let words: Vec<&str> = line.split_whitespace().collect();

    let block = match words.as_slice() {
        ["Room", number] => Block::Room(RoomDraft::new(number_of(number)?)),
        ["BackgroundSprite", name] => Block::Background(SpriteDraft::new(name, n, line)),
        ["FontSprite"] => Block::Font(SpriteDraft::new("", n, line)),
        ["Enemy", name, rest @ ..] if !name.starts_with(':') => {
            let reverse = match rest {
                [] => false,
                [with, reverse]
                    if with.eq_ignore_ascii_case("with")
                        && reverse.eq_ignore_ascii_case("reverse") =>
                {
                    true
                }
                _ => return Err(ParseErrorKind::Unrecognised),
            };
            Block::Enemy(EnemyDraft {
                name: name.to_string(),
                reverse,
                frames: Vec::new(),
            })
        }
        _ => return Ok(None),
    };

    Ok(Some(block))
}

fn pixel_row(line: &str, size: SpriteSize) -> Result<u16, ParseErrorKind> {
    if !line.chars().all(|c| c == '.' || c == '#') {
        return Err(ParseErrorKind::Unrecognised);
    }
    if line.len() != size.width() {
        return Err(ParseErrorKind::RowWidth {
            expected: size.width(),
            found: line.len(),
        });
    }
    Ok(line
        .chars()
        .fold(0, |row, c| row << 1 | (c == '#') as u16))
}

/// The value of a `Label: value` line, allowing spaces before the colon.
fn field<'l>(line: &'l str, label: &str) -> Option<&'l str> {
    let rest = line.strip_prefix(label)?;
    let value = rest.trim_start().strip_prefix(':')?;
    Some(value.trim())
}

fn number_of<T: FromStr>(s: &str) -> Result<T, ParseErrorKind> {
    let s = s.trim();
    s.parse().map_err(|_| ParseErrorKind::Number(s.to_string()))
}

fn unknown(what: &'static str, value: &str) -> ParseErrorKind {
    ParseErrorKind::Unknown {
        what,
        value: value.to_string(),
    }
}

/// `(x,y)`
fn position(s: &str) -> Result<TilePos, ParseErrorKind> {
    let inner = s
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or(ParseErrorKind::Unrecognised)?;
    let (x, y) = inner.split_once(',').ok_or(ParseErrorKind::Unrecognised)?;
    Ok(TilePos::new(number_of(x)?, number_of(y)?))
}

fn heading(s: &str) -> Result<Heading, ParseErrorKind> {
    match s.trim() {
        "left" => Ok(Heading::Left),
        "right" => Ok(Heading::Right),
        other => Err(unknown("direction", other)),
    }
}

fn colour(s: &str) -> Result<Colour, ParseErrorKind> {
    let s = s.trim();
    Colour::from_name(s).ok_or_else(|| unknown("colour", s))
}

/// `left 0, right 2, up 0, down 0`
fn exits(s: &str) -> Result<Exits, ParseErrorKind> {
    let names = ["left", "right", "up", "down"];
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != names.len() {
        return Err(ParseErrorKind::Unrecognised);
    }

    let mut rooms = [0; 4];
    for ((room, part), name) in rooms.iter_mut().zip(parts).zip(&names) {
        let value = part
            .trim()
            .strip_prefix(name)
            .ok_or_else(|| unknown("exit", part.trim()))?;
        *room = number_of(value)?;
    }
    Ok(Exits::from_array(rooms))
}

/// `2 (collected, not collected)`
fn items(s: &str, warnings: &mut Vec<String>) -> Result<Vec<bool>, ParseErrorKind> {
    let (count, states) = match s.find('(') {
        Some(i) => (&s[..i], Some(&s[i..])),
        None => (s, None),
    };
    let count: usize = number_of(count)?;

    let states = match states {
        Some(states) => states
            .trim_matches(|c| c == '(' || c == ')' || c == ' ')
            .split(',')
            .map(|state| match state.trim() {
                "collected" => Ok(true),
                "not collected" => Ok(false),
                other => Err(unknown("item state", other)),
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => vec![false; count],
    };

    if states.len() != count {
        warnings.push(format!(
            "number of items {} does not match the {} collected states listed",
            count,
            states.len()
        ));
    }
    Ok(states)
}

fn points(s: &str) -> Result<Points, ParseErrorKind> {
    s.split(')')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| position(&format!("{})", p)))
        .collect()
}

/// Recognise a tile command line. `Ok(None)` if the line is not a command.
fn command(line: &str, warnings: &mut Vec<String>) -> Result<Option<TileCommand>, ParseErrorKind> {
    let cmd = if let Some(kind) = line.strip_prefix("Use ") {
        let kind = kind.trim();
        TileCommand::Use(TileKind::from_keyword(kind).ok_or_else(|| unknown("tile kind", kind))?)
    } else if let Some(pos) = line.strip_prefix("Move to ") {
        TileCommand::MoveTo(position(pos)?)
    } else if let Some(y) = line.strip_prefix("Draw vertical strip until Y=") {
        TileCommand::Strip {
            axis: Axis::Vertical,
            until: number_of(y)?,
        }
    } else if let Some(x) = line.strip_prefix("Draw horizontal strip until X=") {
        TileCommand::Strip {
            axis: Axis::Horizontal,
            until: number_of(x)?,
        }
    } else if let Some(pos) = line.strip_prefix("Draw block to ") {
        let pos = position(pos)?;
        TileCommand::Block {
            extent_x: pos.x,
            final_y: pos.y,
        }
    } else if let Some(rest) = line.strip_prefix("Draw slope moving ") {
        let (dir, y) = rest.split_once(" until Y=").ok_or(ParseErrorKind::Unrecognised)?;
        TileCommand::Slope {
            heading: heading(dir)?,
            final_y: number_of(y)?,
        }
    } else if let Some(rest) = line.strip_prefix("Draw triangle moving ") {
        let (dir, y) = rest.split_once(" until Y=").ok_or(ParseErrorKind::Unrecognised)?;
        TileCommand::Triangle {
            heading: heading(dir)?,
            final_y: number_of(y)?,
        }
    } else if let Some(rest) = line.strip_prefix("Draw ") {
        let (count, rest) = rest
            .split_once(" single tile")
            .ok_or(ParseErrorKind::Unrecognised)?;
        let count: usize = number_of(count)?;
        let list = rest
            .trim_start_matches('s')
            .trim_start()
            .strip_prefix("at")
            .ok_or(ParseErrorKind::Unrecognised)?;
        let points = points(list)?;
        if points.len() != count {
            warnings.push(format!(
                "{} single tiles announced but {} listed",
                count,
                points.len()
            ));
        }
        TileCommand::Points(points)
    } else {
        return Ok(None);
    };

    Ok(Some(cmd))
}

fn room_line(
    draft: &mut RoomDraft,
    n: usize,
    raw: &str,
    line: &str,
    warnings: &mut Vec<String>,
) -> Result<(), ParseErrorKind> {
    let room = &mut draft.room;

    if let Some(v) = field(line, "Number of items") {
        room.items = items(v, warnings)?;
    } else if let Some(v) = field(line, "Exits") {
        room.exits = exits(v)?;
    } else if let Some(v) = field(line, "Conveyor direction") {
        room.conveyor = heading(v).map_err(|_| unknown("conveyor direction", v))?;
    } else if let Some(v) = field(line, "Slope direction") {
        room.slope = match v {
            "/" => SlopeDir::Forward,
            "\\" => SlopeDir::Backward,
            _ => return Err(unknown("slope direction", v)),
        };
    } else if let Some(v) = field(line, "Rope present") {
        room.rope = match v {
            "yes" => true,
            "no" => false,
            _ => return Err(unknown("rope presence", v)),
        };
    } else if let Some(v) = field(line, "Palette") {
        let names: Vec<&str> = v.split(',').collect();
        if names.len() != room.palette.len() {
            return Err(ParseErrorKind::Unrecognised);
        }
        for (entry, name) in room.palette.iter_mut().zip(names) {
            *entry = colour(name)?;
        }
        draft.palette_set = true;
    } else if let Some(v) = field(line, "Palette change") {
        let parts: Vec<&str> = v.split_whitespace().collect();
        let (row, logical, physical) = match parts.as_slice() {
            [row, logical, physical] => (number_of(row)?, number_of::<u8>(logical)?, *physical),
            _ => return Err(ParseErrorKind::Unrecognised),
        };
        let physical = if physical == "cancel" {
            if !draft.palette_set {
                return Err(ParseErrorKind::NoPalette);
            }
            *room
                .palette
                .get(logical as usize)
                .ok_or_else(|| unknown("logical colour", &logical.to_string()))?
        } else {
            colour(physical)?
        };
        room.palette_changes.push(PaletteChange {
            row,
            logical,
            physical,
        });
    } else if let Some(v) = field(line, "Title") {
        let (tab, text) = v
            .strip_prefix("tab")
            .and_then(|v| v.split_once(','))
            .ok_or(ParseErrorKind::Unrecognised)?;
        let text = text
            .trim()
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .ok_or(ParseErrorKind::Unrecognised)?;
        room.title.tab = number_of(tab)?;
        room.title.text = text.to_string();
    } else if field(line, "Tile commands").is_some()
        || field(line, "Enemies").is_some()
        || field(line, "Arrows").is_some()
    {
        // summary lines, derived from the entries that follow
    } else if let Some(cmd) = command(line, warnings)? {
        room.commands.push(cmd);
    } else if let Some(v) = field(line, "Enemy") {
        // `with Reverse` belongs to the sprite set, so only the index is read
        let index = v.split_whitespace().next().unwrap_or("");
        number_of::<u8>(index)?;
        room.enemies.push(Enemy::default());
        draft.enemy_sprites.push(None);
    } else if let Some(v) = field(line, "Sprite") {
        draft.enemy()?;
        if let Some(slot) = draft.enemy_sprites.last_mut() {
            *slot = Some(Named::new(v, n, raw));
        }
    } else if let Some(v) = field(line, "Initial Pos") {
        draft.enemy()?.pos = position(v)?;
    } else if let Some(v) = field(line, "Min Extent") {
        draft.enemy()?.min = number_of(v)?;
    } else if let Some(v) = field(line, "Max Extent") {
        draft.enemy()?.max = number_of(v)?;
    } else if let Some(v) = field(line, "Initial Dir") {
        let dir = Direction::from_name(v).ok_or_else(|| unknown("direction", v))?;
        draft.enemy()?.direction = dir;
    } else if let Some(v) = field(line, "Speed") {
        draft.enemy()?.speed = number_of(v)?;
    } else if let Some(v) = field(line, "Logical colour") {
        draft.enemy()?.colour = number_of(v)?;
    } else if let Some(v) = field(line, "Arrow") {
        let arrow = arrow(v)?;
        let slot = room
            .arrows
            .get_mut(draft.arrows)
            .ok_or(ParseErrorKind::ExtraArrow)?;
        *slot = arrow;
        draft.arrows += 1;
    } else if let Some((label, rest)) = line.split_once(" tile ") {
        let kind = TileKind::from_label(label).ok_or_else(|| unknown("tile kind", label))?;
        if let Some(v) = field(rest, "logical colours") {
            let parts: Vec<&str> = v.split_whitespace().collect();
            let style = room.tiles.get_mut(kind);
            match parts.as_slice() {
                [bg, fg] => {
                    style.background = number_of(bg)?;
                    style.foreground = number_of(fg)?;
                }
                _ => return Err(ParseErrorKind::Unrecognised),
            }
        } else if let Some(v) = field(rest, "logical colour") {
            room.tiles.get_mut(kind).foreground = number_of(v)?;
        } else if let Some(v) = field(rest, "sprite") {
            draft.tile_sprites.retain(|(k, _)| *k != kind);
            draft.tile_sprites.push((kind, Named::new(v, n, raw)));
        } else {
            return Err(ParseErrorKind::Unrecognised);
        }
    } else {
        return Err(ParseErrorKind::Unrecognised);
    }

    Ok(())
}

/// `no`, `Y <n>, timing index <n>`, or `Y <n>, X index <n>`
fn arrow(v: &str) -> Result<Option<Arrow>, ParseErrorKind> {
    if v == "no" {
        return Ok(None);
    }
    let (y, timing) = v
        .strip_prefix('Y')
        .and_then(|v| v.split_once(','))
        .ok_or(ParseErrorKind::Unrecognised)?;
    let timing = timing.trim();
    let timing = timing
        .strip_prefix("timing index")
        .or_else(|| timing.strip_prefix("X index"))
        .ok_or(ParseErrorKind::Unrecognised)?;

    Ok(Some(Arrow {
        y: number_of(y)?,
        timing: number_of(timing)?,
    }))
}

/// Writes rooms and sprites in the text grammar read by [`TextParser`].
///
/// Sprite references are written by name when the sprite has one, and by
/// index otherwise.
pub struct Report<'a> {
    pub rooms: &'a [Room],
    pub sprites: &'a SpriteCorpus,
    pub schema: RoomSchema,
}

impl Report<'_> {
    fn background_name(&self, index: u8) -> String {
        match self.sprites.backgrounds.get(index as usize) {
            Some(s) if !s.name.is_empty() => s.name.clone(),
            _ => index.to_string(),
        }
    }

    fn enemy_name(&self, index: u8) -> String {
        match (index as usize).checked_sub(1).and_then(|i| self.sprites.enemies.get(i)) {
            Some(e) if !e.name.is_empty() => e.name.clone(),
            _ => index.to_string(),
        }
    }

    fn enemy_reversible(&self, index: u8) -> bool {
        (index as usize)
            .checked_sub(1)
            .and_then(|i| self.sprites.enemies.get(i))
            .map_or(false, |e| e.reverse)
    }

    fn write_room(&self, f: &mut fmt::Formatter, room: &Room) -> fmt::Result {
        writeln!(f, "Room {}", room.number)?;

        if !room.is_title_screen() {
            self.write_layout(f, room)?;
        }

        writeln!(f, "    Enemies: {}", room.enemies.len())?;
        for (i, enemy) in room.enemies.iter().enumerate() {
            let reverse = if self.enemy_reversible(enemy.sprite) {
                " with Reverse"
            } else {
                ""
            };
            writeln!(f, "        Enemy: {}{}", i + 1, reverse)?;
            writeln!(f, "            Sprite: {}", self.enemy_name(enemy.sprite))?;
            writeln!(f, "            Initial Pos: {}", enemy.pos)?;
            writeln!(f, "            Min Extent: {}", enemy.min)?;
            writeln!(f, "            Max Extent: {}", enemy.max)?;
            writeln!(f, "            Initial Dir: {}", enemy.direction)?;
            writeln!(f, "            Speed: {}", enemy.speed)?;
            writeln!(f, "            Logical colour: {}", enemy.colour)?;
        }

        let timing = match self.schema {
            RoomSchema::Classic => "timing index",
            RoomSchema::Extended => "X index",
        };
        writeln!(f, "    Arrows: {}", room.arrows.iter().flatten().count())?;
        for arrow in &room.arrows {
            match arrow {
                Some(a) => writeln!(f, "        Arrow: Y {}, {} {}", a.y, timing, a.timing)?,
                None => writeln!(f, "        Arrow: no")?,
            }
        }
        Ok(())
    }

    fn write_layout(&self, f: &mut fmt::Formatter, room: &Room) -> fmt::Result {
        write!(f, "    Number of items: {}", room.items.len())?;
        if !room.items.is_empty() {
            let states: Vec<&str> = room
                .items
                .iter()
                .map(|&c| if c { "collected" } else { "not collected" })
                .collect();
            write!(f, " ({})", states.join(", "))?;
        }
        writeln!(f)?;

        let e = room.exits;
        writeln!(
            f,
            "    Exits: left {}, right {}, up {}, down {}",
            e.left, e.right, e.up, e.down
        )?;
        writeln!(f, "    Conveyor direction: {}", room.conveyor)?;
        writeln!(f, "    Slope direction: {}", room.slope)?;
        writeln!(f, "    Rope present: {}", if room.rope { "yes" } else { "no" })?;

        for &kind in self.schema.coloured_tiles() {
            let style = room.tiles.get(kind);
            match self.schema {
                RoomSchema::Classic => {
                    writeln!(f, "    {} tile logical colour: {}", kind.label(), style.foreground)?
                }
                RoomSchema::Extended => writeln!(
                    f,
                    "    {} tile logical colours: {} {}",
                    kind.label(),
                    style.background,
                    style.foreground
                )?,
            }
        }
        for &kind in self.schema.sprite_tiles() {
            let sprite = self.background_name(room.tiles.get(kind).sprite);
            writeln!(f, "    {} tile sprite: {}", kind.label(), sprite)?;
        }

        let names: Vec<&str> = room.palette.iter().map(|c| c.name()).collect();
        writeln!(f, "    Palette: {}", names.join(", "))?;
        if self.schema == RoomSchema::Extended {
            for change in &room.palette_changes {
                writeln!(
                    f,
                    "    Palette change: {} {} {}",
                    change.row, change.logical, change.physical
                )?;
            }
        }

        writeln!(f, "    Title: tab {}, \"{}\"", room.title.tab, room.title.text)?;
        writeln!(f, "    Tile commands:")?;
        for cmd in &room.commands {
            write!(f, "        ")?;
            write_command(f, cmd)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

fn write_command(f: &mut fmt::Formatter, cmd: &TileCommand) -> fmt::Result {
    match cmd {
        TileCommand::Use(kind) => write!(f, "Use {}", kind),
        TileCommand::MoveTo(pos) => write!(f, "Move to {}", pos),
        TileCommand::Strip {
            axis: Axis::Vertical,
            until,
        } => write!(f, "Draw vertical strip until Y={}", until),
        TileCommand::Strip {
            axis: Axis::Horizontal,
            until,
        } => write!(f, "Draw horizontal strip until X={}", until),
        TileCommand::Block { extent_x, final_y } => {
            write!(f, "Draw block to {}", TilePos::new(*extent_x, *final_y))
        }
        TileCommand::Points(points) => {
            if points.len() == 1 {
                write!(f, "Draw 1 single tile at")?;
            } else {
                write!(f, "Draw {} single tiles at", points.len())?;
            }
            for pos in points {
                write!(f, " {}", pos)?;
            }
            Ok(())
        }
        TileCommand::Slope { heading, final_y } => {
            write!(f, "Draw slope moving {} until Y={}", heading, final_y)
        }
        TileCommand::Triangle { heading, final_y } => {
            write!(f, "Draw triangle moving {} until Y={}", heading, final_y)
        }
    }
}

fn write_pixels(f: &mut fmt::Formatter, indent: &str, sprite: &Sprite) -> fmt::Result {
    for line in sprite.to_string().lines() {
        writeln!(f, "{}{}", indent, line)?;
    }
    Ok(())
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for room in self.rooms {
            self.write_room(f, room)?;
            writeln!(f)?;
        }

        for (i, sprite) in self.sprites.backgrounds.iter().enumerate() {
            let name = if sprite.name.is_empty() {
                i.to_string()
            } else {
                sprite.name.clone()
            };
            writeln!(f, "BackgroundSprite {}", name)?;
            write_pixels(f, "    ", sprite)?;
            writeln!(f)?;
        }

        for sprite in &self.sprites.fonts {
            writeln!(f, "FontSprite")?;
            write_pixels(f, "    ", sprite)?;
            writeln!(f)?;
        }

        for (i, enemy) in self.sprites.enemies.iter().enumerate() {
            let name = if enemy.name.is_empty() {
                (i + 1).to_string()
            } else {
                enemy.name.clone()
            };
            let reverse = if enemy.reverse { " with Reverse" } else { "" };
            writeln!(f, "Enemy {}{}", name, reverse)?;
            for frame in &enemy.frames {
                writeln!(f, "    Sprite")?;
                write_pixels(f, "        ", frame)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use smallvec::smallvec;

    const ROOM: &str = r#"
; the first room
Room 1
    Number of items: 2 (collected, not collected)
    Exits: left 0, right 2, up 0 , down 3
    Conveyor direction: right
    Slope direction: \
    Rope present: yes
    Deadly tile logical colours: 0 2
    Wall tile logical colours  : 1 3
    Wall tile sprite: brick
    Palette: black, blue, red, white
    Palette change: 8 1 cyan
    Palette change: 12 1 cancel
    Title: tab 3, "The Bathroom"
    Tile commands:
        Use WALL
        Move to (0,0)
        Draw vertical strip until Y=15
        Draw 2 single tiles at (3,4) (31,15)
        Draw slope moving left until Y=9
    Enemies: 1
        Enemy: 1
            Sprite: maid
            Initial Pos: (10,13)
            Min Extent: 4
            Max Extent: 20
            Initial Dir: right
            Speed: 2
            Logical colour: 3
    Arrows: 1
        Arrow: no
        Arrow: Y 5, X index 1

BackgroundSprite brick
    ########
    #...#...
    #...#...
    ########
    ..#...#.
    ..#...#.
    ..#...#.
    ########

Enemy maid with Reverse
    Sprite
"#;

    fn enemy_frame(text: &mut String) {
        for i in 0..16 {
            let row: String = (0..16).map(|x| if x == i { '#' } else { '.' }).collect();
            text.push_str("        ");
            text.push_str(&row);
            text.push('\n');
        }
    }

    fn document() -> String {
        let mut text = ROOM.to_string();
        enemy_frame(&mut text);
        text
    }

    #[test]
    fn parses_room_block() -> Result<(), JswError> {
        let doc = parse(&document(), RoomSchema::Extended)?;
        assert_eq!(doc.rooms.len(), 1);
        let room = &doc.rooms[0];

        assert_eq!(room.number, 1);
        assert_eq!(room.items, vec![true, false]);
        assert_eq!(room.exits.to_array(), [0, 2, 0, 3]);
        assert_eq!(room.conveyor, Heading::Right);
        assert_eq!(room.slope, SlopeDir::Backward);
        assert!(room.rope);
        assert_eq!(room.tiles.wall.background, 1);
        assert_eq!(room.tiles.wall.foreground, 3);
        assert_eq!(room.tiles.wall.sprite, 0);
        assert_eq!(room.palette[1], Colour::Blue);
        assert_eq!(room.palette_changes[0].physical, Colour::Cyan);
        assert_eq!(room.palette_changes[1].physical, Colour::Blue);
        assert_eq!(room.title.tab, 3);
        assert_eq!(room.title.text, "The Bathroom");
        assert_eq!(room.commands.len(), 5);
        assert_eq!(
            room.commands[3],
            TileCommand::Points(smallvec![TilePos::new(3, 4), TilePos::new(31, 15)])
        );
        assert_eq!(room.enemies.len(), 1);
        assert_eq!(room.enemies[0].sprite, 1);
        assert_eq!(room.enemies[0].pos, TilePos::new(10, 13));
        assert_eq!(room.enemies[0].direction, Direction::Right);
        assert_eq!(room.arrows, [None, Some(Arrow { y: 5, timing: 1 })]);

        assert_eq!(doc.sprites.backgrounds[0].row(1), 0b1000_1000);
        assert!(doc.sprites.enemies[0].reverse);
        assert_eq!(doc.sprites.enemies[0].frames[0].row(0), 0x8000);
        Ok(())
    }

    #[test]
    fn report_round_trip() -> Result<(), JswError> {
        let doc = parse(&document(), RoomSchema::Extended)?;
        let written = doc.report(RoomSchema::Extended).to_string();
        assert_eq!(parse(&written, RoomSchema::Extended)?, doc);
        assert!(written.contains("Draw 2 single tiles at (3,4) (31,15)"));
        assert!(written.contains("Enemy: 1 with Reverse"));
        Ok(())
    }

    #[test]
    fn classic_report() -> Result<(), JswError> {
        let mut room = Room::new(4);
        room.tiles.deadly.foreground = 2;
        room.arrows[0] = Some(Arrow { y: 7, timing: 5 });
        room.commands.push(TileCommand::Points(smallvec![TilePos::new(1, 1)]));
        let doc = Document {
            rooms: vec![room],
            sprites: SpriteCorpus::default(),
        };

        let written = doc.report(RoomSchema::Classic).to_string();
        assert!(written.contains("    Deadly tile logical colour: 2\n"));
        assert!(written.contains("Arrow: Y 7, timing index 5"));
        assert!(written.contains("Draw 1 single tile at (1,1)"));
        assert!(!written.contains("Scenery"));
        assert_eq!(parse(&written, RoomSchema::Classic)?, doc);
        Ok(())
    }

    #[test]
    fn title_screen_report() -> Result<(), JswError> {
        let doc = Document {
            rooms: vec![Room::new(0)],
            sprites: SpriteCorpus::default(),
        };
        let written = doc.report(RoomSchema::Extended).to_string();
        assert!(!written.contains("Exits"));
        assert_eq!(parse(&written, RoomSchema::Extended)?, doc);
        Ok(())
    }

    #[test]
    fn classic_warns_about_extended_lines() -> Result<(), JswError> {
        let text = "Room 2\n    Palette: black, blue, red, white\n    Palette change: 3 1 red\n";
        let mut log = Vec::new();
        TextParser::new(RoomSchema::Classic)
            .with_logging(&mut log)
            .parse(text)?;

        let log = String::from_utf8(log).unwrap();
        assert!(log.contains("line 3: a palette change is not stored"));
        Ok(())
    }

    #[test]
    fn item_count_mismatch_warns() -> Result<(), JswError> {
        let text = "Room 2\n    Number of items: 3 (collected)\n";
        let mut log = Vec::new();
        let doc = TextParser::new(RoomSchema::Extended)
            .with_logging(&mut log)
            .parse(text)?;
        assert_eq!(doc.rooms[0].items, vec![true]);

        let log = String::from_utf8(log).unwrap();
        assert!(log.starts_with("WARNING: line 2:"));
        Ok(())
    }

    fn parse_error(text: &str) -> ParseError {
        match parse(text, RoomSchema::Extended) {
            Err(JswError::Parse(e)) => e,
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_documents() {
        let e = parse_error("Room 1\n    Flux capacitor: on\n");
        assert_eq!(e.line, 2);
        assert_eq!(e.kind, ParseErrorKind::Unrecognised);

        let e = parse_error("    Palette: black, black, black, black\n");
        assert_eq!(e.kind, ParseErrorKind::OutsideBlock);

        let e = parse_error("Room 1\n    Speed: 3\n");
        assert_eq!(e.kind, ParseErrorKind::NoEnemy);

        let e = parse_error("Room 1\n    Palette change: 3 1 cancel\n");
        assert_eq!(e.kind, ParseErrorKind::NoPalette);

        let e = parse_error("Room 1\nRoom 1\n");
        assert_eq!(e.kind, ParseErrorKind::DuplicateRoom(1));

        let e = parse_error("Room 1\n    Arrow: no\n    Arrow: no\n    Arrow: no\n");
        assert_eq!(e.kind, ParseErrorKind::ExtraArrow);

        let e = parse_error("BackgroundSprite a\n    ########\n    #######\n");
        assert_eq!(e.kind, ParseErrorKind::RowWidth { expected: 8, found: 7 });

        let e = parse_error("BackgroundSprite a\n    ########\n");
        assert_eq!(e.line, 1);
        assert!(matches!(e.kind, ParseErrorKind::RowCount { found: 1, .. }));

        let e = parse_error("Enemy a\n    ################\n");
        assert_eq!(e.kind, ParseErrorKind::NoSprite);
    }

    #[test]
    fn unresolved_names() {
        let e = parse_error("Room 1\n    Wall tile sprite: missing\n");
        assert_eq!(e.line, 2);
        assert_eq!(e.kind, ParseErrorKind::UnresolvedSprite("missing".into()));

        let e = parse_error("Room 1\n    Enemy: 1\n        Sprite: ghost\n");
        assert_eq!(e.line, 3);
        assert_eq!(e.kind, ParseErrorKind::UnresolvedEnemy("ghost".into()));
    }
}
