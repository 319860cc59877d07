//! Discrete directions and the analog stick quantizer

use serde::{Deserialize, Serialize};

/// Eight compass directions plus rest.
///
/// Ordinals follow the HID hat-switch convention (0 = up, clockwise, 8 = released) and
/// double as indices into the mapping tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Direction {
    Up = 0,
    UpRight = 1,
    Right = 2,
    DownRight = 3,
    Down = 4,
    DownLeft = 5,
    Left = 6,
    UpLeft = 7,
    #[default]
    Centered = 8,
}

/// Number of distinct directions, i.e. the width of a direction-indexed table.
pub const DIRECTION_COUNT: usize = 9;

impl Direction {
    pub const ALL: [Direction; DIRECTION_COUNT] = [
        Direction::Up,
        Direction::UpRight,
        Direction::Right,
        Direction::DownRight,
        Direction::Down,
        Direction::DownLeft,
        Direction::Left,
        Direction::UpLeft,
        Direction::Centered,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_ordinal(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Resolves a long name (`"downright"`) or a short alias (`"DR"`, `"RD"`).
    /// Matching ignores ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        let direction = match name.to_ascii_lowercase().as_str() {
            "up" | "u" => Direction::Up,
            "upright" | "ur" | "ru" => Direction::UpRight,
            "right" | "r" => Direction::Right,
            "downright" | "dr" | "rd" => Direction::DownRight,
            "down" | "d" => Direction::Down,
            "downleft" | "dl" | "ld" => Direction::DownLeft,
            "left" | "l" => Direction::Left,
            "upleft" | "ul" | "lu" => Direction::UpLeft,
            "centered" | "center" | "c" => Direction::Centered,
            _ => return None,
        };
        Some(direction)
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::UpRight => "upright",
            Direction::Right => "right",
            Direction::DownRight => "downright",
            Direction::Down => "down",
            Direction::DownLeft => "downleft",
            Direction::Left => "left",
            Direction::UpLeft => "upleft",
            Direction::Centered => "centered",
        }
    }

    /// Quantizes a raw stick sample with the default thresholds.
    pub fn from_stick(x: u8, y: u8) -> Self {
        StickQuantizer::default().quantize(x, y)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Thresholds for turning an analog stick sample into a [`Direction`]
///
/// A sample first has to leave the circular dead zone around the rest position. Each
/// axis is then classified on its own against a linear band, and the pair of signs picks
/// the octant. Negative y is up in report coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StickQuantizer {
    /// Squared radius, in recentred units, at or below which the stick is at rest.
    pub dead_zone_squared: i32,
    /// Per-axis band: an axis with `|v| <= axis_band` counts as zero.
    pub axis_band: i32,
}

impl StickQuantizer {
    pub const DEFAULT_DEAD_ZONE_SQUARED: i32 = 3276;
    pub const DEFAULT_AXIS_BAND: i32 = 40;

    pub const fn new(dead_zone_squared: i32, axis_band: i32) -> Self {
        Self {
            dead_zone_squared,
            axis_band,
        }
    }

    pub fn quantize(&self, x: u8, y: u8) -> Direction {
        let dx = i32::from(x) - i32::from(crate::controller::report::STICK_CENTER);
        let dy = i32::from(y) - i32::from(crate::controller::report::STICK_CENTER);

        if dx * dx + dy * dy <= self.dead_zone_squared {
            return Direction::Centered;
        }

        match (self.axis_sign(dx), self.axis_sign(dy)) {
            (0, -1) => Direction::Up,
            (1, -1) => Direction::UpRight,
            (1, 0) => Direction::Right,
            (1, 1) => Direction::DownRight,
            (0, 1) => Direction::Down,
            (-1, 1) => Direction::DownLeft,
            (-1, 0) => Direction::Left,
            (-1, -1) => Direction::UpLeft,
            _ => Direction::Centered,
        }
    }

    fn axis_sign(&self, value: i32) -> i8 {
        if value > self.axis_band {
            1
        } else if value < -self.axis_band {
            -1
        } else {
            0
        }
    }
}

impl Default for StickQuantizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DEAD_ZONE_SQUARED, Self::DEFAULT_AXIS_BAND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn recentred(dx: i32, dy: i32) -> (u8, u8) {
        ((127 + dx) as u8, (127 + dy) as u8)
    }

    #[test]
    fn rest_position_is_centered() {
        assert_eq!(Direction::from_stick(127, 127), Direction::Centered);
    }

    #[test]
    fn compass_points() {
        let cases = [
            ((0, -100), Direction::Up),
            ((100, -100), Direction::UpRight),
            ((100, 0), Direction::Right),
            ((100, 100), Direction::DownRight),
            ((0, 100), Direction::Down),
            ((-100, 100), Direction::DownLeft),
            ((-100, 0), Direction::Left),
            ((-100, -100), Direction::UpLeft),
        ];
        for ((dx, dy), expected) in cases {
            let (x, y) = recentred(dx, dy);
            assert_eq!(Direction::from_stick(x, y), expected, "({dx}, {dy})");
        }
    }

    #[test]
    fn dead_zone_edge() {
        // 57^2 = 3249 stays inside, 58^2 = 3364 leaves it
        let (x, y) = recentred(57, 0);
        assert_eq!(Direction::from_stick(x, y), Direction::Centered);
        let (x, y) = recentred(58, 0);
        assert_eq!(Direction::from_stick(x, y), Direction::Right);
    }

    #[test]
    fn axis_band_keeps_small_component_at_zero() {
        let (x, y) = recentred(90, 40);
        assert_eq!(Direction::from_stick(x, y), Direction::Right);
        let (x, y) = recentred(90, 41);
        assert_eq!(Direction::from_stick(x, y), Direction::DownRight);
    }

    #[test]
    fn extreme_corners() {
        assert_eq!(Direction::from_stick(255, 0), Direction::UpRight);
        assert_eq!(Direction::from_stick(0, 255), Direction::DownLeft);
    }

    #[test]
    fn custom_thresholds() {
        let wide = StickQuantizer::new(10_000, 40);
        let (x, y) = recentred(90, 0);
        assert_eq!(wide.quantize(x, y), Direction::Centered);

        // Tiny dead zone and a wide band leave a square where both axes read zero.
        let square = StickQuantizer::new(0, 60);
        let (x, y) = recentred(50, 50);
        assert_eq!(square.quantize(x, y), Direction::Centered);
    }

    #[test]
    fn names_and_aliases_agree() {
        let pairs = [
            ("up", "U"),
            ("upright", "UR"),
            ("upright", "RU"),
            ("right", "R"),
            ("downright", "DR"),
            ("downright", "RD"),
            ("down", "D"),
            ("downleft", "DL"),
            ("downleft", "LD"),
            ("left", "L"),
            ("upleft", "UL"),
            ("upleft", "LU"),
        ];
        for (long, short) in pairs {
            let a = Direction::from_name(long).expect("long name");
            let b = Direction::from_name(short).expect("alias");
            assert_eq!(a, b);
            assert_eq!(a.name(), long);
        }
        assert_eq!(Direction::from_name("sideways"), None);
    }

    #[test]
    fn ordinals_round_trip() {
        for direction in Direction::ALL {
            assert_eq!(
                Direction::from_ordinal(direction.ordinal()),
                Some(direction)
            );
        }
        assert_eq!(Direction::from_ordinal(9), None);
    }

    proptest! {
        #[test]
        fn quantizer_is_pure(x in any::<u8>(), y in any::<u8>()) {
            let quantizer = StickQuantizer::default();
            prop_assert_eq!(quantizer.quantize(x, y), quantizer.quantize(x, y));
        }

        #[test]
        fn inside_dead_zone_is_always_centered(dx in -57i32..=57, dy in -57i32..=57) {
            prop_assume!(dx * dx + dy * dy <= StickQuantizer::DEFAULT_DEAD_ZONE_SQUARED);
            let (x, y) = recentred(dx, dy);
            prop_assert_eq!(Direction::from_stick(x, y), Direction::Centered);
        }
    }
}
