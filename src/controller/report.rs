//! Fixed 8-byte input report of the rumble pad family
//!
//! # Byte layout
//!
//! ```text
//! byte 0  left stick x    byte 4  dpad (bits 0-3) | buttons (bits 4-7)
//! byte 1  left stick y    byte 5  bumpers (0-1) | triggers (2-3) | options (4-5) | sticks (6-7)
//! byte 2  right stick x   byte 6  mode (not interpreted)
//! byte 3  right stick y   byte 7  padding (not interpreted)
//! ```
//!
//! Inside every two-bit side mask, bit 0 is [`Side::Left`] and bit 1 is [`Side::Right`].

use crate::controller::direction::Direction;

/// Size of one report on the wire.
pub const REPORT_LEN: usize = 8;

/// Raw axis value of a stick at rest.
pub const STICK_CENTER: u8 = 127;

/// Number of face buttons carried in the high nibble of byte 4.
pub const BUTTON_COUNT: usize = 4;

const NIBBLE: u8 = 0x0F;
const SIDE_BITS: u8 = 0x03;

/// Left or right half of the pad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Evaluation order used by the key generator.
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    fn bit(self) -> u8 {
        1 << self.index()
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw analog stick sample, both axes unsigned with rest at [`STICK_CENTER`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StickSample {
    pub x: u8,
    pub y: u8,
}

impl StickSample {
    pub const CENTERED: StickSample = StickSample {
        x: STICK_CENTER,
        y: STICK_CENTER,
    };

    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

impl Default for StickSample {
    fn default() -> Self {
        Self::CENTERED
    }
}

/// One decoded input report.
///
/// Every bit field is stored already masked to its declared width, so a `Report` can not
/// hold an out-of-range dpad value or a stray bit outside a mask. The `mode` and
/// `padding` bytes are kept verbatim for re-encoding but never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Report {
    sticks: [StickSample; 2],
    dpad: Direction,
    buttons: u8,
    bumpers: u8,
    triggers: u8,
    options: u8,
    stick_presses: u8,
    mode: u8,
    padding: u8,
}

impl Report {
    /// Power-on state of the pad: sticks at rest, dpad released, nothing pressed.
    pub const IDLE: Report = Report {
        sticks: [StickSample::CENTERED, StickSample::CENTERED],
        dpad: Direction::Centered,
        buttons: 0,
        bumpers: 0,
        triggers: 0,
        options: 0,
        stick_presses: 0,
        mode: 0,
        padding: 0,
    };

    /// Decodes the wire layout. Never fails: a dpad nibble above 8 reads as centered.
    pub fn from_bytes(raw: &[u8; REPORT_LEN]) -> Self {
        let controls = raw[5];
        Self {
            sticks: [
                StickSample::new(raw[0], raw[1]),
                StickSample::new(raw[2], raw[3]),
            ],
            dpad: Direction::from_ordinal(raw[4] & NIBBLE).unwrap_or(Direction::Centered),
            buttons: (raw[4] >> 4) & NIBBLE,
            bumpers: controls & SIDE_BITS,
            triggers: (controls >> 2) & SIDE_BITS,
            options: (controls >> 4) & SIDE_BITS,
            stick_presses: (controls >> 6) & SIDE_BITS,
            mode: raw[6],
            padding: raw[7],
        }
    }

    pub fn to_bytes(&self) -> [u8; REPORT_LEN] {
        let [left, right] = self.sticks;
        [
            left.x,
            left.y,
            right.x,
            right.y,
            (self.dpad.ordinal() & NIBBLE) | (self.buttons << 4),
            self.bumpers
                | (self.triggers << 2)
                | (self.options << 4)
                | (self.stick_presses << 6),
            self.mode,
            self.padding,
        ]
    }

    pub fn stick(&self, side: Side) -> StickSample {
        self.sticks[side.index()]
    }

    pub fn dpad(&self) -> Direction {
        self.dpad
    }

    /// Face button state; indices outside `0..BUTTON_COUNT` read as released.
    pub fn button(&self, index: usize) -> bool {
        index < BUTTON_COUNT && self.buttons & (1 << index) != 0
    }

    pub fn bumper(&self, side: Side) -> bool {
        self.bumpers & side.bit() != 0
    }

    pub fn trigger(&self, side: Side) -> bool {
        self.triggers & side.bit() != 0
    }

    /// Back (left) and start (right) menu buttons.
    pub fn option(&self, side: Side) -> bool {
        self.options & side.bit() != 0
    }

    pub fn stick_pressed(&self, side: Side) -> bool {
        self.stick_presses & side.bit() != 0
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    pub fn with_stick(mut self, side: Side, sample: StickSample) -> Self {
        self.sticks[side.index()] = sample;
        self
    }

    pub fn with_dpad(mut self, direction: Direction) -> Self {
        self.dpad = direction;
        self
    }

    pub fn with_button(mut self, index: usize, pressed: bool) -> Self {
        if index < BUTTON_COUNT {
            self.buttons = set_bit(self.buttons, 1 << index, pressed);
        }
        self
    }

    pub fn with_bumper(mut self, side: Side, pressed: bool) -> Self {
        self.bumpers = set_bit(self.bumpers, side.bit(), pressed);
        self
    }

    pub fn with_trigger(mut self, side: Side, pressed: bool) -> Self {
        self.triggers = set_bit(self.triggers, side.bit(), pressed);
        self
    }

    pub fn with_option(mut self, side: Side, pressed: bool) -> Self {
        self.options = set_bit(self.options, side.bit(), pressed);
        self
    }

    pub fn with_stick_pressed(mut self, side: Side, pressed: bool) -> Self {
        self.stick_presses = set_bit(self.stick_presses, side.bit(), pressed);
        self
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::IDLE
    }
}

fn set_bit(mask: u8, bit: u8, on: bool) -> u8 {
    if on {
        mask | bit
    } else {
        mask & !bit
    }
}

/// Report layout selected at attach time from the device's USB identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceProfile {
    /// Logitech F310/F510 family in DirectInput mode.
    RumblePad,
}

impl DeviceProfile {
    pub const LOGITECH_VENDOR_ID: u16 = 0x046d;
    const RUMBLE_PAD_PRODUCTS: [u16; 2] = [0xc216, 0xc218];

    pub fn from_ids(vendor_id: u16, product_id: u16) -> Option<Self> {
        if vendor_id == Self::LOGITECH_VENDOR_ID && Self::RUMBLE_PAD_PRODUCTS.contains(&product_id)
        {
            Some(DeviceProfile::RumblePad)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeviceProfile::RumblePad => "rumble pad",
        }
    }

    pub fn decode(&self, raw: &[u8; REPORT_LEN]) -> Report {
        match self {
            DeviceProfile::RumblePad => Report::from_bytes(raw),
        }
    }

    /// Report the session starts from, so the first real report only fires on true changes.
    pub fn idle_report(&self) -> Report {
        match self {
            DeviceProfile::RumblePad => Report::IDLE,
        }
    }
}
