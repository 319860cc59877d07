//! Device sessions and the registry that owns them
//!
//! # Architecture
//!
//! ```text
//! attach hook ──► DeviceRegistry ──► DeviceSession<Attached> ──► Transport
//!                  (arena, handles)    (report diff, key queue)    (submit/check/cancel)
//! ```
//!
//! The enumeration layer calls the attach hook; the line input layer polls sessions by
//! [`SessionHandle`] and gets at most one key per poll.

pub mod error;
pub mod registry;
#[allow(clippy::module_inception)]
pub mod session;

pub use error::{AttachError, RegistryError};
pub use registry::{
    DeviceRegistry, InputRegistry, RecordingInputRegistry, RegistrySettings, SessionHandle,
    REGISTRY_CAPACITY,
};
pub use session::{Attached, DeviceSession, Detached, KeyPoll};
