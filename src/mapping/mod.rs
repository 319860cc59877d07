//! Translation of control transitions into logical key codes.
//!
//! [`MappingTables`] hold one key code per control transition. They are owned by the
//! device registry as the profile for its device class and handed by reference to the
//! key generator on every report, so changes take effect on the next diff cycle.
//! [`commands`] is the only way the outside world edits them.

pub mod commands;
pub mod error;
pub mod keycode;
pub mod tables;

pub use commands::MapCommand;
pub use error::MappingError;
pub use keycode::KeySpec;
pub use tables::{Control, KeyCode, MappingTables};
