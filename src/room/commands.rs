use crate::{
    bits::BitChannel,
    errors::CommandError,
    format::{Axis, Heading, Points, RoomSchema, TileCommand, TileKind, TilePos},
};

const ESCAPE: u8 = 3;
const SYMBOL_BITS: u32 = 2;
const KIND_BITS: u32 = 3;
const EXTENT_BITS: u32 = 5;
const COUNT_BITS: u32 = 4;
pub(crate) const MAX_POINTS: usize = 16;

/// Escape tier and closing symbol of a command's prefix
type Prefix = (u8, u8);

const END: Prefix = (2, 0);

fn prefix(cmd: &TileCommand) -> Prefix {
    match cmd {
        TileCommand::Use(_) => (0, 0),
        TileCommand::MoveTo(_) => (0, 1),
        TileCommand::Strip { .. } => (0, 2),
        TileCommand::Block { .. } => (1, 0),
        TileCommand::Points(_) => (1, 1),
        TileCommand::Slope { .. } => (1, 2),
        TileCommand::Triangle { .. } => (2, 2),
    }
}

fn write_prefix(bits: &mut BitChannel, (tier, symbol): Prefix) -> Result<(), CommandError> {
    for _ in 0..tier {
        bits.push_field("command escape", SYMBOL_BITS, ESCAPE as u32)?;
    }
    bits.push_field("command symbol", SYMBOL_BITS, symbol as u32)?;
    Ok(())
}

fn read_prefix(bits: &mut BitChannel) -> Result<Prefix, CommandError> {
    let mut tier = 0;
    loop {
        let symbol = bits.pop_u8("command symbol", SYMBOL_BITS)?;
        if symbol != ESCAPE {
            return Ok((tier, symbol));
        }
        tier += 1;
        if tier > END.0 {
            return Err(CommandError::Reserved {
                tier,
                symbol: ESCAPE,
            });
        }
    }
}

fn write_pos(bits: &mut BitChannel, pos: TilePos) -> Result<(), CommandError> {
    bits.push_field("x", TilePos::X_BITS, pos.x as u32)?;
    bits.push_field("y", TilePos::Y_BITS, pos.y as u32)?;
    Ok(())
}

fn read_pos(bits: &mut BitChannel) -> Result<TilePos, CommandError> {
    let x = bits.pop_u8("x", TilePos::X_BITS)?;
    let y = bits.pop_u8("y", TilePos::Y_BITS)?;
    Ok(TilePos { x, y })
}

fn write_heading(bits: &mut BitChannel, heading: Heading) -> Result<(), CommandError> {
    // 0 = moving right
    bits.push_flag("heading", heading == Heading::Left)?;
    Ok(())
}

fn read_heading(bits: &mut BitChannel) -> Result<Heading, CommandError> {
    Ok(if bits.pop_flag("heading")? {
        Heading::Left
    } else {
        Heading::Right
    })
}

/// Append one command to `bits`.
pub fn write_command(
    bits: &mut BitChannel,
    schema: RoomSchema,
    cmd: &TileCommand,
) -> Result<(), CommandError> {
    write_prefix(bits, prefix(cmd))?;

    match cmd {
        TileCommand::Use(kind) => {
            let code = kind
                .code(schema)
                .ok_or(CommandError::UnsupportedTile(*kind))?;
            bits.push_field("tile kind", KIND_BITS, code as u32)?;
        }
        TileCommand::MoveTo(pos) => write_pos(bits, *pos)?,
        TileCommand::Strip { axis, until } => {
            bits.push_flag("strip axis", *axis == Axis::Vertical)?;
            bits.push_field("strip until", EXTENT_BITS, *until as u32)?;
        }
        TileCommand::Block { extent_x, final_y } => {
            bits.push_field("block extent x", TilePos::X_BITS, *extent_x as u32)?;
            bits.push_field("block final y", TilePos::Y_BITS, *final_y as u32)?;
        }
        TileCommand::Points(points) => {
            if points.is_empty() || points.len() > MAX_POINTS {
                return Err(CommandError::PointCount(points.len()));
            }
            bits.push_field("point count", COUNT_BITS, points.len() as u32 - 1)?;
            for &pos in points {
                write_pos(bits, pos)?;
            }
        }
        TileCommand::Slope { heading, final_y } | TileCommand::Triangle { heading, final_y } => {
            write_heading(bits, *heading)?;
            bits.push_field("final y", TilePos::Y_BITS, *final_y as u32)?;
        }
    }

    Ok(())
}

/// Read the next command, or `None` at the end command.
pub fn read_command(
    bits: &mut BitChannel,
    schema: RoomSchema,
) -> Result<Option<TileCommand>, CommandError> {
    let cmd = match read_prefix(bits)? {
        (0, 0) => {
            let code = bits.pop_u8("tile kind", KIND_BITS)?;
            let kind = TileKind::from_code(code, schema).ok_or(CommandError::UnknownTile { code })?;
            TileCommand::Use(kind)
        }
        (0, 1) => TileCommand::MoveTo(read_pos(bits)?),
        (0, 2) => {
            let axis = if bits.pop_flag("strip axis")? {
                Axis::Vertical
            } else {
                Axis::Horizontal
            };
            let until = bits.pop_u8("strip until", EXTENT_BITS)?;
            TileCommand::Strip { axis, until }
        }
        (1, 0) => {
            let extent_x = bits.pop_u8("block extent x", TilePos::X_BITS)?;
            let final_y = bits.pop_u8("block final y", TilePos::Y_BITS)?;
            TileCommand::Block { extent_x, final_y }
        }
        (1, 1) => {
            let count = bits.pop_u8("point count", COUNT_BITS)? as usize + 1;
            let mut points = Points::new();
            for _ in 0..count {
                points.push(read_pos(bits)?);
            }
            TileCommand::Points(points)
        }
        (1, 2) => {
            let heading = read_heading(bits)?;
            let final_y = bits.pop_u8("final y", TilePos::Y_BITS)?;
            TileCommand::Slope { heading, final_y }
        }
        END => return Ok(None),
        (2, 2) => {
            let heading = read_heading(bits)?;
            let final_y = bits.pop_u8("final y", TilePos::Y_BITS)?;
            TileCommand::Triangle { heading, final_y }
        }
        (tier, symbol) => return Err(CommandError::Reserved { tier, symbol }),
    };

    Ok(Some(cmd))
}

/// Write every command followed by the end command.
pub fn write_commands(
    bits: &mut BitChannel,
    schema: RoomSchema,
    cmds: &[TileCommand],
) -> Result<(), CommandError> {
    for cmd in cmds {
        write_command(bits, schema, cmd)?;
    }
    write_prefix(bits, END)
}

/// Read commands up to and including the end command.
pub fn read_commands(bits: &mut BitChannel, schema: RoomSchema) -> Result<Vec<TileCommand>, CommandError> {
    let mut cmds = Vec::new();
    while let Some(cmd) = read_command(bits, schema)? {
        cmds.push(cmd);
    }
    Ok(cmds)
}
