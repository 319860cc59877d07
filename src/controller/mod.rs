//! Gamepad report decoding and key generation
//!
//! # Pipeline
//!
//! ```text
//! raw bytes ──► Report ──► edge_detector ──► KeyEventQueue
//!               (decode)   (diff vs previous) (bounded FIFO)
//! ```
//!
//! 1. [`report`] - Fixed 8-byte report layout and device profiles
//! 2. [`direction`] - Eight-way directions and analog stick quantization
//! 3. [`edge_detector`] - Diff of two reports into key codes, in a fixed order
//! 4. [`key_queue`] - Per-session queue the keys wait in until polled

pub mod direction;
pub mod edge_detector;
pub mod key_queue;
pub mod report;

pub use direction::{Direction, StickQuantizer};
pub use key_queue::{KeyEventQueue, OverflowPolicy};
pub use report::{DeviceProfile, Report, Side, StickSample};
