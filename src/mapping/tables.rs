//! Mapping tables from physical controls to logical key codes

use crate::controller::direction::{Direction, DIRECTION_COUNT};
use crate::controller::report::{Side, BUTTON_COUNT};
use crate::mapping::MappingError;

/// Logical key code consumed by the line input layer.
///
/// Plain characters use their Unicode scalar value; special keys live above
/// [`KeyCode::EXTENDED`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KeyCode(pub u32);

impl KeyCode {
    /// "No key assigned". Still occupies a queue slot when its control fires.
    pub const NONE: KeyCode = KeyCode(0);

    /// Flag bit of non-character keys (arrows, function keys, ...).
    pub const EXTENDED: u32 = 0x0080_0000;

    pub const fn extended(scan: u32) -> Self {
        KeyCode(Self::EXTENDED | scan)
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// Character this code stands for, if it is a plain printable character.
    pub fn as_char(self) -> Option<char> {
        if self.0 & Self::EXTENDED != 0 {
            return None;
        }
        char::from_u32(self.0).filter(|c| !c.is_control())
    }
}

impl From<char> for KeyCode {
    fn from(c: char) -> Self {
        KeyCode(c as u32)
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.as_char() {
            Some(c) => write!(f, "{:#04x} {:?}", self.0, c),
            None => write!(f, "{:#04x}", self.0),
        }
    }
}

/// One configurable cell of [`MappingTables`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Control {
    Dpad(Direction),
    Button(usize),
    Bumper(Side),
    Trigger(Side),
    Stick(Side, Direction),
    StickPress(Side),
    Options(Side),
}

impl std::fmt::Display for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Control::Dpad(direction) => write!(f, "dpad {direction}"),
            Control::Button(index) => write!(f, "button {index}"),
            Control::Bumper(side) => write!(f, "{side} bumper"),
            Control::Trigger(side) => write!(f, "{side} trigger"),
            Control::Stick(side, direction) => write!(f, "{side} stick {direction}"),
            Control::StickPress(side) => write!(f, "{side} stick press"),
            Control::Options(side) => write!(f, "{side} option"),
        }
    }
}

/// Key code for every control transition the key generator can report.
///
/// Every cell starts as [`KeyCode::NONE`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MappingTables {
    pub dpad: [KeyCode; DIRECTION_COUNT],
    pub buttons: [KeyCode; BUTTON_COUNT],
    pub bumpers: [KeyCode; 2],
    pub triggers: [KeyCode; 2],
    pub sticks: [[KeyCode; DIRECTION_COUNT]; 2],
    pub stick_presses: [KeyCode; 2],
    pub options: [KeyCode; 2],
}

impl MappingTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, control: Control) -> Option<KeyCode> {
        match control {
            Control::Dpad(direction) => Some(self.dpad[direction.index()]),
            Control::Button(index) => self.buttons.get(index).copied(),
            Control::Bumper(side) => Some(self.bumpers[side.index()]),
            Control::Trigger(side) => Some(self.triggers[side.index()]),
            Control::Stick(side, direction) => Some(self.sticks[side.index()][direction.index()]),
            Control::StickPress(side) => Some(self.stick_presses[side.index()]),
            Control::Options(side) => Some(self.options[side.index()]),
        }
    }

    /// Overwrites exactly one cell and returns its previous value.
    pub fn set(&mut self, control: Control, key: KeyCode) -> Result<KeyCode, MappingError> {
        let cell = match control {
            Control::Dpad(direction) => &mut self.dpad[direction.index()],
            Control::Button(index) => self
                .buttons
                .get_mut(index)
                .ok_or(MappingError::ButtonIndexOutOfRange(index as u32))?,
            Control::Bumper(side) => &mut self.bumpers[side.index()],
            Control::Trigger(side) => &mut self.triggers[side.index()],
            Control::Stick(side, direction) => &mut self.sticks[side.index()][direction.index()],
            Control::StickPress(side) => &mut self.stick_presses[side.index()],
            Control::Options(side) => &mut self.options[side.index()],
        };
        Ok(std::mem::replace(cell, key))
    }

    pub fn dpad(&self, direction: Direction) -> KeyCode {
        self.dpad[direction.index()]
    }

    pub fn button(&self, index: usize) -> KeyCode {
        self.buttons.get(index).copied().unwrap_or(KeyCode::NONE)
    }

    pub fn bumper(&self, side: Side) -> KeyCode {
        self.bumpers[side.index()]
    }

    pub fn trigger(&self, side: Side) -> KeyCode {
        self.triggers[side.index()]
    }

    pub fn stick(&self, side: Side, direction: Direction) -> KeyCode {
        self.sticks[side.index()][direction.index()]
    }

    pub fn stick_press(&self, side: Side) -> KeyCode {
        self.stick_presses[side.index()]
    }

    pub fn option(&self, side: Side) -> KeyCode {
        self.options[side.index()]
    }
}
