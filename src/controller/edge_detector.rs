//! Key generator: diffs two consecutive reports into key codes
//!
//! Keys are pushed in a fixed order:
//!
//! ```text
//! dpad change ─► buttons 0..3 (rising) ─► for LEFT then RIGHT:
//!     bumper (rising) ─► trigger (rising) ─► stick octant change
//!     ─► stick press (rising) ─► option (rising)
//! ```
//!
//! Releases never produce keys, except through the dpad and the sticks whose return to
//! [`Direction::Centered`](crate::controller::direction::Direction::Centered) is itself a
//! direction change.

use crate::controller::direction::StickQuantizer;
use crate::controller::key_queue::KeyEventQueue;
use crate::controller::report::{Report, Side, BUTTON_COUNT};
use crate::mapping::{KeyCode, MappingTables};

fn rising(previous: bool, current: bool) -> bool {
    !previous && current
}

/// Calls `emit` once per key the transition `previous -> current` produces, in order.
pub fn diff_reports(
    previous: &Report,
    current: &Report,
    tables: &MappingTables,
    quantizer: &StickQuantizer,
    mut emit: impl FnMut(KeyCode),
) {
    if previous.dpad() != current.dpad() {
        emit(tables.dpad(current.dpad()));
    }

    for index in 0..BUTTON_COUNT {
        if rising(previous.button(index), current.button(index)) {
            emit(tables.button(index));
        }
    }

    for side in Side::ALL {
        if rising(previous.bumper(side), current.bumper(side)) {
            emit(tables.bumper(side));
        }
        if rising(previous.trigger(side), current.trigger(side)) {
            emit(tables.trigger(side));
        }

        let before = previous.stick(side);
        let after = current.stick(side);
        let old_direction = quantizer.quantize(before.x, before.y);
        let new_direction = quantizer.quantize(after.x, after.y);
        if old_direction != new_direction {
            emit(tables.stick(side, new_direction));
        }

        if rising(previous.stick_pressed(side), current.stick_pressed(side)) {
            emit(tables.stick_press(side));
        }
        if rising(previous.option(side), current.option(side)) {
            emit(tables.option(side));
        }
    }
}

/// Pushes the keys for `previous -> current` into `queue`, then makes `current` the new
/// previous report. Returns how many keys were pushed.
pub fn generate_keys<const N: usize>(
    previous: &mut Report,
    current: &Report,
    tables: &MappingTables,
    quantizer: &StickQuantizer,
    queue: &mut KeyEventQueue<N>,
) -> usize {
    let mut pushed = 0;
    diff_reports(previous, current, tables, quantizer, |key| {
        queue.push(key);
        pushed += 1;
    });
    *previous = *current;
    pushed
}
