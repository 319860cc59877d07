//! USB gamepad key input
//!
//! Turns the 8-byte interrupt reports of a DirectInput gamepad into logical key codes for
//! a line-oriented input layer. Each attached pad gets a session that diffs every report
//! against the previous one and queues one key per control transition.

pub mod config;
pub mod console;
pub mod controller;
pub mod mapping;
pub mod session;
pub mod transport;
