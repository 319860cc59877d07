//! Mapping configuration interface
//!
//! One command per control class, each naming a control and a key spec:
//!
//! ```text
//! map-dpad        <direction>        <spec>
//! map-button      <0-3>              <spec>
//! map-bumper      <side>             <spec>
//! map-trigger     <side>             <spec>
//! map-stick       <side> <direction> <spec>
//! map-stick-press <side>             <spec>
//! map-option      <side>             <spec>
//!
//! spec := code <int> | char <c> | name <symbol>
//! ```
//!
//! A command validates everything before touching the tables, so a rejected command
//! leaves them exactly as they were.

use crate::controller::direction::Direction;
use crate::controller::report::{Side, BUTTON_COUNT};
use crate::mapping::keycode::KeySpec;
use crate::mapping::{Control, KeyCode, MappingError, MappingTables};
use std::str::FromStr;
use tracing::debug;

pub fn parse_side(name: &str) -> Result<Side, MappingError> {
    match name {
        "left" => Ok(Side::Left),
        "right" => Ok(Side::Right),
        other => Err(MappingError::UnknownSide(other.to_string())),
    }
}

pub fn parse_direction(name: &str) -> Result<Direction, MappingError> {
    Direction::from_name(name)
        .ok_or_else(|| MappingError::UnknownDirection(name.to_string()))
}

pub fn parse_button_index(text: &str) -> Result<usize, MappingError> {
    let index: u32 = text
        .parse()
        .map_err(|_| MappingError::InvalidButtonIndex(text.to_string()))?;
    if index as usize >= BUTTON_COUNT {
        return Err(MappingError::ButtonIndexOutOfRange(index));
    }
    Ok(index as usize)
}

/// A validated mapping command, ready to be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapCommand {
    pub control: Control,
    pub spec: KeySpec,
}

impl MapCommand {
    pub fn new(control: Control, spec: KeySpec) -> Self {
        Self { control, spec }
    }

    /// Parses one command line such as `map-stick left UR char w`.
    ///
    /// Arguments are split on whitespace, so `char` cannot name a whitespace character;
    /// use `name space`, `name tab` or `name enter` for those.
    pub fn parse(line: &str) -> Result<Self, MappingError> {
        let mut args = line.split_whitespace();
        let command = args
            .next()
            .ok_or(MappingError::MissingArgument("command"))?;

        let control = match command {
            "map-dpad" => Control::Dpad(parse_direction(next(&mut args, "direction")?)?),
            "map-button" => Control::Button(parse_button_index(next(&mut args, "button index")?)?),
            "map-bumper" => Control::Bumper(parse_side(next(&mut args, "side")?)?),
            "map-trigger" => Control::Trigger(parse_side(next(&mut args, "side")?)?),
            "map-stick" => {
                let side = parse_side(next(&mut args, "side")?)?;
                Control::Stick(side, parse_direction(next(&mut args, "direction")?)?)
            }
            "map-stick-press" => Control::StickPress(parse_side(next(&mut args, "side")?)?),
            "map-option" => Control::Options(parse_side(next(&mut args, "side")?)?),
            other => return Err(MappingError::UnknownCommand(other.to_string())),
        };

        let kind = next(&mut args, "key spec type")?;
        let value = next(&mut args, "key spec value")?;
        if let Some(extra) = args.next() {
            return Err(MappingError::UnexpectedArgument(extra.to_string()));
        }

        Ok(Self::new(control, KeySpec::parse(kind, value)?))
    }

    /// Resolves the key spec and writes the cell. Returns the key now assigned.
    pub fn apply(&self, tables: &mut MappingTables) -> Result<KeyCode, MappingError> {
        let key = self.spec.resolve()?;
        let previous = tables.set(self.control, key)?;
        debug!("Mapped {} to {} (was {})", self.control, key, previous);
        Ok(key)
    }
}

impl FromStr for MapCommand {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn next<'a>(
    args: &mut impl Iterator<Item = &'a str>,
    what: &'static str,
) -> Result<&'a str, MappingError> {
    args.next().ok_or(MappingError::MissingArgument(what))
}

pub fn map_dpad(
    tables: &mut MappingTables,
    direction: &str,
    spec: &KeySpec,
) -> Result<KeyCode, MappingError> {
    let control = Control::Dpad(parse_direction(direction)?);
    MapCommand::new(control, spec.clone()).apply(tables)
}

pub fn map_button(
    tables: &mut MappingTables,
    index: &str,
    spec: &KeySpec,
) -> Result<KeyCode, MappingError> {
    let control = Control::Button(parse_button_index(index)?);
    MapCommand::new(control, spec.clone()).apply(tables)
}

pub fn map_bumper(
    tables: &mut MappingTables,
    side: &str,
    spec: &KeySpec,
) -> Result<KeyCode, MappingError> {
    let control = Control::Bumper(parse_side(side)?);
    MapCommand::new(control, spec.clone()).apply(tables)
}

pub fn map_trigger(
    tables: &mut MappingTables,
    side: &str,
    spec: &KeySpec,
) -> Result<KeyCode, MappingError> {
    let control = Control::Trigger(parse_side(side)?);
    MapCommand::new(control, spec.clone()).apply(tables)
}

pub fn map_stick(
    tables: &mut MappingTables,
    side: &str,
    direction: &str,
    spec: &KeySpec,
) -> Result<KeyCode, MappingError> {
    let control = Control::Stick(parse_side(side)?, parse_direction(direction)?);
    MapCommand::new(control, spec.clone()).apply(tables)
}

pub fn map_stick_press(
    tables: &mut MappingTables,
    side: &str,
    spec: &KeySpec,
) -> Result<KeyCode, MappingError> {
    let control = Control::StickPress(parse_side(side)?);
    MapCommand::new(control, spec.clone()).apply(tables)
}

pub fn map_option(
    tables: &mut MappingTables,
    side: &str,
    spec: &KeySpec,
) -> Result<KeyCode, MappingError> {
    let control = Control::Options(parse_side(side)?);
    MapCommand::new(control, spec.clone()).apply(tables)
}
