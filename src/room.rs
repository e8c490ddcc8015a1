//! Encode and decode whole room records.
//!
//! See [`format`](crate::format) for the field layout of both schemas.
use crate::{
    bits::BitChannel,
    errors::{BitError, FieldError, RecordError, RoomError},
    format::{
        Arrow, Colour, Direction, Enemy, Exits, Heading, PaletteChange, Room, RoomSchema, SlopeDir,
        TileKind, TilePos, TileStyle,
    },
};
use std::convert::TryFrom;

pub mod commands;
pub mod title;

pub use self::title::MAX_TITLE_LEN;

pub const MAX_ITEMS: usize = 15;
pub const MAX_ENEMIES: usize = 7;
pub const MAX_PALETTE_CHANGES: usize = 15;
pub const MAX_ROOMS: usize = 64;

const COUNT_BITS: u32 = 4;
const EXIT_BITS: u32 = 6;
const COLOUR_BITS: u32 = 2;
const SPRITE_BITS: u32 = 8;
const PHYSICAL_BITS: u32 = 3;
const ROW_BITS: u32 = 4;
const CHANGE_BITS: u32 = 5;
const TAB_BITS: u32 = 4;
const ENEMY_COUNT_BITS: u32 = 3;
const ENEMY_SPRITE_BITS: u32 = 6;
const EXTENT_BITS: u32 = 5;
const SPEED_BITS: u32 = 3;
const ARROW_Y_BITS: u32 = 4;

/// Field names for the colours and sprite of a tile kind
fn tile_fields(kind: TileKind) -> [&'static str; 3] {
    match kind {
        TileKind::Platform => ["platform colour", "platform background", "platform sprite"],
        TileKind::Wall => ["wall colour", "wall background", "wall sprite"],
        TileKind::Slope => ["slope colour", "slope background", "slope sprite"],
        TileKind::Conveyor => ["conveyor colour", "conveyor background", "conveyor sprite"],
        TileKind::Deadly => ["deadly colour", "deadly background", "deadly sprite"],
        TileKind::Scenery => ["scenery colour", "scenery background", "scenery sprite"],
        TileKind::Item => ["item colour", "item background", "item sprite"],
    }
}

fn check_count(what: &'static str, count: usize, max: usize) -> Result<(), RecordError> {
    if count > max {
        Err(RecordError::TooMany { what, count, max })
    } else {
        Ok(())
    }
}

/// The first layout field that is set on a title screen room
fn title_screen_layout(room: &Room) -> Option<&'static str> {
    let blank = Room::default();
    if !room.items.is_empty() {
        Some("items")
    } else if room.exits != blank.exits {
        Some("exits")
    } else if room.conveyor != blank.conveyor || room.slope != blank.slope || room.rope {
        Some("layout flags")
    } else if room.tiles != blank.tiles {
        Some("tiles")
    } else if room.palette != blank.palette || !room.palette_changes.is_empty() {
        Some("palette")
    } else if room.title != blank.title {
        Some("title")
    } else if !room.commands.is_empty() {
        Some("tile commands")
    } else {
        None
    }
}

fn check_schema(room: &Room, schema: RoomSchema) -> Result<(), RecordError> {
    let item = room.tiles.item;
    if item.foreground != 0 || item.background != 0 {
        return Err(RecordError::NotInSchema("an item tile colour"));
    }
    if schema == RoomSchema::Extended {
        return Ok(());
    }
    if room.tiles.scenery != TileStyle::default() {
        return Err(RecordError::NotInSchema("the scenery tile"));
    }
    if TileKind::ALL
        .iter()
        .any(|&kind| room.tiles.get(kind).background != 0)
    {
        return Err(RecordError::NotInSchema("a tile background colour"));
    }
    if !room.palette_changes.is_empty() {
        return Err(RecordError::NotInSchema("a palette change"));
    }
    Ok(())
}

fn write_layout(bits: &mut BitChannel, room: &Room, schema: RoomSchema) -> Result<(), RecordError> {
    check_count("items", room.items.len(), MAX_ITEMS)?;
    bits.push_field("item count", COUNT_BITS, room.items.len() as u32)?;
    for &collected in &room.items {
        bits.push_flag("item collected", collected)?;
    }

    let exit_names = ["exit left", "exit right", "exit up", "exit down"];
    for (&name, &exit) in exit_names.iter().zip(&room.exits.to_array()) {
        bits.push_field(name, EXIT_BITS, exit as u32)?;
    }

    bits.push_flag("conveyor direction", room.conveyor == Heading::Right)?;
    bits.push_flag("slope direction", room.slope == SlopeDir::Backward)?;
    bits.push_flag("rope", room.rope)?;

    for &kind in schema.coloured_tiles() {
        let style = room.tiles.get(kind);
        let [fg, bg, _] = tile_fields(kind);
        bits.push_field(fg, COLOUR_BITS, style.foreground as u32)?;
        if schema == RoomSchema::Extended {
            bits.push_field(bg, COLOUR_BITS, style.background as u32)?;
        }
    }
    for &kind in schema.sprite_tiles() {
        let [_, _, sprite] = tile_fields(kind);
        bits.push_field(sprite, SPRITE_BITS, room.tiles.get(kind).sprite as u32)?;
    }

    for colour in room.palette.iter().rev() {
        bits.push_field("palette", PHYSICAL_BITS, colour.index() as u32)?;
    }

    if schema == RoomSchema::Extended {
        check_count("palette changes", room.palette_changes.len(), MAX_PALETTE_CHANGES)?;
        bits.push_field("palette change count", COUNT_BITS, room.palette_changes.len() as u32)?;
        for change in &room.palette_changes {
            if change.logical >= 4 {
                return Err(FieldError {
                    field: "palette change logical colour",
                    source: BitError::Overflow {
                        value: change.logical as u32,
                        width: 2,
                    },
                }
                .into());
            }
            let packed = change.logical as u32 + 4 * change.physical.index() as u32;
            bits.push_field("palette change row", ROW_BITS, change.row as u32)?;
            bits.push_field("palette change", CHANGE_BITS, packed)?;
        }
    }

    bits.push_field("title tab", TAB_BITS, room.title.tab as u32)?;
    title::write_title(bits, &room.title.text, schema)?;
    commands::write_commands(bits, schema, &room.commands)?;

    Ok(())
}

fn read_layout(bits: &mut BitChannel, room: &mut Room, schema: RoomSchema) -> Result<(), RecordError> {
    let count = bits.pop_u8("item count", COUNT_BITS)?;
    room.items = (0..count)
        .map(|_| bits.pop_flag("item collected"))
        .collect::<Result<_, _>>()?;

    let exit_names = ["exit left", "exit right", "exit up", "exit down"];
    let mut exits = [0u8; 4];
    for (exit, &name) in exits.iter_mut().zip(&exit_names) {
        *exit = bits.pop_u8(name, EXIT_BITS)?;
    }
    room.exits = Exits::from_array(exits);

    room.conveyor = if bits.pop_flag("conveyor direction")? {
        Heading::Right
    } else {
        Heading::Left
    };
    room.slope = if bits.pop_flag("slope direction")? {
        SlopeDir::Backward
    } else {
        SlopeDir::Forward
    };
    room.rope = bits.pop_flag("rope")?;

    for &kind in schema.coloured_tiles() {
        let [fg, bg, _] = tile_fields(kind);
        let style = room.tiles.get_mut(kind);
        style.foreground = bits.pop_u8(fg, COLOUR_BITS)?;
        if schema == RoomSchema::Extended {
            style.background = bits.pop_u8(bg, COLOUR_BITS)?;
        }
    }
    for &kind in schema.sprite_tiles() {
        let [_, _, sprite] = tile_fields(kind);
        room.tiles.get_mut(kind).sprite = bits.pop_u8(sprite, SPRITE_BITS)?;
    }

    for entry in room.palette.iter_mut().rev() {
        let index = bits.pop_u8("palette", PHYSICAL_BITS)?;
        *entry = Colour::from_index(index).unwrap_or_default();
    }

    if schema == RoomSchema::Extended {
        let count = bits.pop_u8("palette change count", COUNT_BITS)?;
        for _ in 0..count {
            let row = bits.pop_u8("palette change row", ROW_BITS)?;
            let packed = bits.pop_u8("palette change", CHANGE_BITS)?;
            room.palette_changes.push(PaletteChange {
                row,
                logical: packed % 4,
                physical: Colour::from_index(packed / 4).unwrap_or_default(),
            });
        }
    }

    room.title.tab = bits.pop_u8("title tab", TAB_BITS)?;
    room.title.text = title::read_title(bits, schema)?;
    room.commands = commands::read_commands(bits, schema)?;

    Ok(())
}

fn write_enemy(bits: &mut BitChannel, enemy: &Enemy) -> Result<(), FieldError> {
    bits.push_field("enemy sprite", ENEMY_SPRITE_BITS, enemy.sprite as u32)?;
    bits.push_field("enemy x", TilePos::X_BITS, enemy.pos.x as u32)?;
    bits.push_field("enemy y", TilePos::Y_BITS, enemy.pos.y as u32)?;
    bits.push_field("enemy min extent", EXTENT_BITS, enemy.min as u32)?;
    bits.push_field("enemy max extent", EXTENT_BITS, enemy.max as u32)?;
    bits.push_flag("enemy vertical", enemy.direction.is_vertical())?;
    bits.push_flag("enemy positive", enemy.direction.is_positive())?;
    bits.push_field("enemy speed", SPEED_BITS, enemy.speed as u32)?;
    bits.push_field("enemy colour", COLOUR_BITS, enemy.colour as u32)
}

fn read_enemy(bits: &mut BitChannel) -> Result<Enemy, FieldError> {
    let sprite = bits.pop_u8("enemy sprite", ENEMY_SPRITE_BITS)?;
    let x = bits.pop_u8("enemy x", TilePos::X_BITS)?;
    let y = bits.pop_u8("enemy y", TilePos::Y_BITS)?;
    let min = bits.pop_u8("enemy min extent", EXTENT_BITS)?;
    let max = bits.pop_u8("enemy max extent", EXTENT_BITS)?;
    let vertical = bits.pop_flag("enemy vertical")?;
    let positive = bits.pop_flag("enemy positive")?;
    let speed = bits.pop_u8("enemy speed", SPEED_BITS)?;
    let colour = bits.pop_u8("enemy colour", COLOUR_BITS)?;

    Ok(Enemy {
        sprite,
        pos: TilePos { x, y },
        min,
        max,
        direction: Direction::from_bits(vertical, positive),
        speed,
        colour,
    })
}

/// Push the fields of `room` onto `bits`, without the final padding.
pub fn write_room(bits: &mut BitChannel, room: &Room, schema: RoomSchema) -> Result<(), RecordError> {
    if room.is_title_screen() {
        if let Some(field) = title_screen_layout(room) {
            return Err(RecordError::LayoutOnTitleScreen(field));
        }
    } else {
        check_schema(room, schema)?;
        write_layout(bits, room, schema)?;
    }

    check_count("enemies", room.enemies.len(), MAX_ENEMIES)?;
    bits.push_field("enemy count", ENEMY_COUNT_BITS, room.enemies.len() as u32)?;
    for enemy in &room.enemies {
        write_enemy(bits, enemy)?;
    }

    let timing_bits = schema.arrow_timing_bits();
    for arrow in &room.arrows {
        bits.push_flag("arrow present", arrow.is_some())?;
        if let Some(arrow) = arrow {
            bits.push_field("arrow y", ARROW_Y_BITS, arrow.y as u32)?;
            bits.push_field("arrow timing", timing_bits, arrow.timing as u32)?;
        }
    }

    Ok(())
}

/// Pop the fields of room `number` from `bits`.
pub fn read_room(bits: &mut BitChannel, number: u8, schema: RoomSchema) -> Result<Room, RecordError> {
    let mut room = Room::new(number);
    if !room.is_title_screen() {
        read_layout(bits, &mut room, schema)?;
    }

    let count = bits.pop_u8("enemy count", ENEMY_COUNT_BITS)?;
    for _ in 0..count {
        room.enemies.push(read_enemy(bits)?);
    }

    let timing_bits = schema.arrow_timing_bits();
    for arrow in room.arrows.iter_mut() {
        if bits.pop_flag("arrow present")? {
            let y = bits.pop_u8("arrow y", ARROW_Y_BITS)?;
            let timing = bits.pop_u8("arrow timing", timing_bits)?;
            *arrow = Some(Arrow { y, timing });
        }
    }

    Ok(room)
}

/// Encode one room into its byte aligned record.
/// ```
/// # use jsw_data::{Room, RoomSchema, encode_room, decode_room};
/// let mut room = Room::new(3);
/// room.title.text = "The Bathroom".to_string();
/// room.items = vec![true, false];
///
/// let bytes = encode_room(&room, RoomSchema::Extended).unwrap();
/// let decoded = decode_room(&bytes, 3, RoomSchema::Extended).unwrap();
/// assert_eq!(room, decoded);
/// ```
pub fn encode_room(room: &Room, schema: RoomSchema) -> Result<Vec<u8>, RoomError> {
    let mut bits = BitChannel::new();
    write_room(&mut bits, room, schema).map_err(RoomError::at(room.number))?;
    Ok(bits.into_bytes())
}

/// Decode the record of room `number`.
///
/// The record must be consumed up to its padding: a whole unread byte is an
/// error.
pub fn decode_room(bytes: &[u8], number: u8, schema: RoomSchema) -> Result<Room, RoomError> {
    let mut bits = BitChannel::from_bytes(bytes);
    let room = read_room(&mut bits, number, schema).map_err(RoomError::at(number))?;

    let left = bits.available() / 8;
    if left > 0 {
        return Err(RoomError::at(number)(RecordError::TrailingBytes(left)));
    }

    Ok(room)
}

fn check_table_len(len: usize) -> Result<(), RoomError> {
    if len > MAX_ROOMS {
        let last = u8::try_from(len - 1).unwrap_or(u8::MAX);
        return Err(RoomError::at(last)(RecordError::TooMany {
            what: "rooms",
            count: len,
            max: MAX_ROOMS,
        }));
    }
    Ok(())
}

/// Encode a table of rooms. The room at index `n` must be room `n`, since
/// [`decode_rooms`] numbers records by position.
pub fn encode_rooms(rooms: &[Room], schema: RoomSchema) -> Result<Vec<Vec<u8>>, RoomError> {
    check_table_len(rooms.len())?;
    rooms
        .iter()
        .enumerate()
        .map(|(position, room)| {
            if room.number as usize != position {
                return Err(RoomError::at(room.number)(RecordError::OutOfOrder { position }));
            }
            encode_room(room, schema)
        })
        .collect()
}

/// Decode a table of records, where the record at index `n` is room `n`.
pub fn decode_rooms<B: AsRef<[u8]>>(records: &[B], schema: RoomSchema) -> Result<Vec<Room>, RoomError> {
    check_table_len(records.len())?;
    records
        .iter()
        .enumerate()
        .map(|(n, bytes)| decode_room(bytes.as_ref(), n as u8, schema))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        errors::TitleError,
        format::{Axis, TileCommand},
    };
    use smallvec::smallvec;

    fn bathroom() -> Room {
        let mut room = Room::new(33);
        room.items = vec![true, false, false];
        room.exits = Exits {
            left: 32,
            right: 34,
            up: 0,
            down: 63,
        };
        room.conveyor = Heading::Right;
        room.slope = SlopeDir::Backward;
        room.rope = true;
        room.tiles.platform = TileStyle {
            foreground: 1,
            background: 2,
            sprite: 4,
        };
        room.tiles.wall.foreground = 3;
        room.tiles.wall.sprite = 9;
        room.tiles.scenery.sprite = 200;
        room.tiles.item.sprite = 17;
        room.palette = [Colour::Black, Colour::Red, Colour::Cyan, Colour::White];
        room.palette_changes = vec![PaletteChange {
            row: 8,
            logical: 3,
            physical: Colour::Yellow,
        }];
        room.title.tab = 10;
        room.title.text = "The Bathroom".into();
        room.commands = vec![
            TileCommand::Use(TileKind::Wall),
            TileCommand::MoveTo(TilePos::new(0, 0)),
            TileCommand::Strip {
                axis: Axis::Vertical,
                until: 15,
            },
            TileCommand::Use(TileKind::Scenery),
            TileCommand::Points(smallvec![TilePos::new(4, 4)]),
        ];
        room.enemies = vec![Enemy {
            sprite: 5,
            pos: TilePos::new(12, 13),
            min: 10,
            max: 20,
            direction: Direction::Down,
            speed: 2,
            colour: 3,
        }];
        room.arrows = [None, Some(Arrow { y: 6, timing: 1 })];
        room
    }

    #[test]
    fn extended_room_round_trip() -> Result<(), RoomError> {
        let room = bathroom();
        let bytes = encode_room(&room, RoomSchema::Extended)?;
        assert_eq!(decode_room(&bytes, 33, RoomSchema::Extended)?, room);
        Ok(())
    }

    #[test]
    fn classic_room_round_trip() -> Result<(), RoomError> {
        let mut room = bathroom();
        room.tiles.scenery = TileStyle::default();
        room.tiles.platform.background = 0;
        room.palette_changes.clear();
        room.commands.retain(|c| *c != TileCommand::Use(TileKind::Scenery));
        room.arrows[1] = Some(Arrow { y: 6, timing: 5 });

        let bytes = encode_room(&room, RoomSchema::Classic)?;
        assert_eq!(decode_room(&bytes, 33, RoomSchema::Classic)?, room);
        Ok(())
    }

    #[test]
    fn classic_rejects_extended_fields() {
        let room = bathroom();
        let err = encode_room(&room, RoomSchema::Classic).unwrap_err();
        assert_eq!(err.room, 33);
        assert_eq!(err.source, RecordError::NotInSchema("the scenery tile"));
    }

    #[test]
    fn minimal_room_bit_length() -> Result<(), RecordError> {
        let mut room = Room::new(1);
        room.title.text = "A".into();

        let mut bits = BitChannel::new();
        write_room(&mut bits, &room, RoomSchema::Extended)?;
        // items, exits, flags, colours, sprites, palette, changes, tab
        let fixed = 4 + 24 + 3 + 6 * 4 + 7 * 8 + 12 + 4 + 4;
        // "A" and its length or end token, end command, enemy count, two
        // absent arrows
        let variable = 2 * 5 + 6 + 3 + 2;
        assert_eq!(bits.bit_len(), fixed + variable);

        let bytes = bits.into_bytes();
        assert_eq!(bytes.len(), (fixed + variable + 7) / 8);
        let decoded = decode_room(&bytes, 1, RoomSchema::Extended).map_err(|e| e.source)?;
        assert_eq!(decoded, room);

        let mut bits = BitChannel::new();
        write_room(&mut bits, &room, RoomSchema::Classic)?;
        let fixed = 4 + 24 + 3 + 5 * 2 + 6 * 8 + 12 + 4;
        assert_eq!(bits.bit_len(), fixed + variable);

        Ok(())
    }

    #[test]
    fn title_screen_holds_enemies_and_arrows() -> Result<(), RoomError> {
        let mut room = Room::new(0);
        room.enemies.push(Enemy {
            sprite: 1,
            direction: Direction::Right,
            ..Enemy::default()
        });
        room.arrows = [Some(Arrow { y: 3, timing: 0 }), None];

        let bytes = encode_room(&room, RoomSchema::Extended)?;
        // count, enemy, two presence bits, arrow
        assert_eq!(bytes.len(), (3 + 32 + 2 + 5 + 7) / 8);
        assert_eq!(decode_room(&bytes, 0, RoomSchema::Extended)?, room);

        room.title.text = "Attic".into();
        let err = encode_room(&room, RoomSchema::Extended).unwrap_err();
        assert_eq!(err.source, RecordError::LayoutOnTitleScreen("title"));
        Ok(())
    }

    #[test]
    fn overflow_is_reported_with_field() {
        let mut room = bathroom();
        room.enemies[0].speed = 8;
        let err = encode_room(&room, RoomSchema::Extended).unwrap_err();
        match err.source {
            RecordError::Field(FieldError { field, .. }) => assert_eq!(field, "enemy speed"),
            other => panic!("unexpected {:?}", other),
        }

        let mut room = bathroom();
        room.enemies = vec![Enemy::default(); 8];
        let err = encode_room(&room, RoomSchema::Extended).unwrap_err();
        assert!(matches!(err.source, RecordError::TooMany { count: 8, .. }));
    }

    #[test]
    fn truncated_and_padded_records() -> Result<(), RoomError> {
        let room = bathroom();
        let mut bytes = encode_room(&room, RoomSchema::Extended)?;

        let short = &bytes[..bytes.len() - 2];
        let err = decode_room(short, 33, RoomSchema::Extended).unwrap_err();
        assert!(matches!(err.source, RecordError::Field(_)));

        bytes.push(0);
        let err = decode_room(&bytes, 33, RoomSchema::Extended).unwrap_err();
        assert_eq!(err.source, RecordError::TrailingBytes(1));
        Ok(())
    }

    #[test]
    fn room_tables() -> Result<(), RoomError> {
        let mut rooms = vec![Room::new(0), bathroom()];
        rooms[1].number = 1;
        let records = encode_rooms(&rooms, RoomSchema::Extended)?;
        assert_eq!(records.len(), 2);
        assert_eq!(decode_rooms(&records, RoomSchema::Extended)?, rooms);
        Ok(())
    }

    #[test]
    fn tables_are_numbered_by_position() {
        let mut attic = bathroom();
        attic.number = 1;

        let err = encode_rooms(&[attic.clone(), Room::new(0)], RoomSchema::Extended).unwrap_err();
        assert_eq!(err.room, 1);
        assert_eq!(err.source, RecordError::OutOfOrder { position: 0 });

        attic.number = 5;
        let err = encode_rooms(&[Room::new(0), attic], RoomSchema::Extended).unwrap_err();
        assert_eq!(err.room, 5);
        assert_eq!(err.source, RecordError::OutOfOrder { position: 1 });
    }

    #[test]
    fn oversized_tables() {
        let records = vec![vec![0u8]; 300];
        let err = decode_rooms(&records, RoomSchema::Classic).unwrap_err();
        assert_eq!(err.room, u8::MAX);
        assert!(matches!(err.source, RecordError::TooMany { count: 300, .. }));

        let rooms: Vec<Room> = (0..=MAX_ROOMS as u8).map(Room::new).collect();
        let err = encode_rooms(&rooms, RoomSchema::Classic).unwrap_err();
        assert_eq!(err.room, MAX_ROOMS as u8);
    }

    #[test]
    fn item_colours_are_not_stored() {
        for &schema in &[RoomSchema::Classic, RoomSchema::Extended] {
            let mut room = Room::new(2);
            room.title.text = "Attic".into();
            room.tiles.item.foreground = 2;
            let err = encode_room(&room, schema).unwrap_err();
            assert_eq!(err.source, RecordError::NotInSchema("an item tile colour"));

            room.tiles.item.foreground = 0;
            room.tiles.item.background = 1;
            let err = encode_room(&room, schema).unwrap_err();
            assert_eq!(err.source, RecordError::NotInSchema("an item tile colour"));
        }
    }

    #[test]
    fn extended_rooms_need_a_title() {
        let room = Room::new(4);
        let err = encode_room(&room, RoomSchema::Extended).unwrap_err();
        assert_eq!(err.source, RecordError::Title(TitleError::Empty));
        assert!(encode_room(&room, RoomSchema::Classic).is_ok());
    }

    /// A classic record pushed field by field in the order the game reads it.
    fn classic_hall_record() -> Result<Vec<u8>, BitError> {
        let fields: &[(u32, u32)] = &[
            // two items, the first collected
            (4, 2), (1, 1), (1, 0),
            // exits
            (6, 5), (6, 7), (6, 0), (6, 63),
            // conveyor right, slope forward, rope
            (1, 1), (1, 0), (1, 1),
            // colours: deadly, conveyor, slope, wall, platform
            (2, 1), (2, 2), (2, 3), (2, 0), (2, 1),
            // sprites: item, deadly, conveyor, slope, wall, platform
            (8, 10), (8, 11), (8, 12), (8, 13), (8, 14), (8, 15),
            // palette, entry 3 first
            (3, 7), (3, 2), (3, 1), (3, 0),
            // tab, then "Hall" and the end token
            (4, 2), (5, 7), (5, 0), (5, 11), (5, 11), (5, 0x1c),
            // use wall, move to (0, 15), vertical strip until 20, end
            (2, 0), (3, 1),
            (2, 1), (5, 0), (4, 15),
            (2, 2), (1, 1), (5, 20),
            (2, 3), (2, 3), (2, 0),
            // one enemy moving right
            (3, 1), (6, 3), (5, 10), (4, 12), (5, 4), (5, 20), (1, 0), (1, 1), (3, 2), (2, 3),
            // first arrow only
            (1, 1), (4, 7), (3, 5), (1, 0),
        ];

        let mut bits = BitChannel::new();
        for &(width, value) in fields {
            bits.push_bits(width, value)?;
        }
        Ok(bits.into_bytes())
    }

    #[test]
    fn classic_record_re_encodes_byte_for_byte() -> Result<(), Box<dyn std::error::Error>> {
        let record = classic_hall_record()?;
        let room = decode_room(&record, 7, RoomSchema::Classic)?;

        assert_eq!(room.items, [true, false]);
        assert_eq!(room.exits, Exits { left: 5, right: 7, up: 0, down: 63 });
        assert_eq!(room.conveyor, Heading::Right);
        assert!(room.rope);
        assert_eq!(room.tiles.deadly.foreground, 1);
        assert_eq!(room.tiles.item.sprite, 10);
        assert_eq!(room.tiles.platform.sprite, 15);
        assert_eq!(room.palette[3], Colour::White);
        assert_eq!(room.palette[0], Colour::Black);
        assert_eq!(room.title.tab, 2);
        assert_eq!(room.title.text, "Hall");
        assert_eq!(room.commands[0], TileCommand::Use(TileKind::Wall));
        assert_eq!(
            room.commands[2],
            TileCommand::Strip {
                axis: Axis::Vertical,
                until: 20
            }
        );
        assert_eq!(room.enemies[0].direction, Direction::Right);
        assert_eq!(room.arrows, [Some(Arrow { y: 7, timing: 5 }), None]);

        assert_eq!(encode_room(&room, RoomSchema::Classic)?, record);
        Ok(())
    }
}
