//! Key code specifications: `code <int>`, `char <c>` or `name <symbol>`

use crate::mapping::{KeyCode, MappingError};

/// Named keys accepted by `name <symbol>`.
///
/// Extended keys carry the PC scan code of the key under [`KeyCode::EXTENDED`].
pub const NAMED_KEYS: &[(&str, KeyCode)] = &[
    ("up", KeyCode::extended(0x48)),
    ("down", KeyCode::extended(0x50)),
    ("left", KeyCode::extended(0x4b)),
    ("right", KeyCode::extended(0x4d)),
    ("home", KeyCode::extended(0x47)),
    ("end", KeyCode::extended(0x4f)),
    ("pageup", KeyCode::extended(0x49)),
    ("pagedown", KeyCode::extended(0x51)),
    ("insert", KeyCode::extended(0x52)),
    ("delete", KeyCode::extended(0x53)),
    ("f1", KeyCode::extended(0x3b)),
    ("f2", KeyCode::extended(0x3c)),
    ("f3", KeyCode::extended(0x3d)),
    ("f4", KeyCode::extended(0x3e)),
    ("f5", KeyCode::extended(0x3f)),
    ("f6", KeyCode::extended(0x40)),
    ("f7", KeyCode::extended(0x41)),
    ("f8", KeyCode::extended(0x42)),
    ("f9", KeyCode::extended(0x43)),
    ("f10", KeyCode::extended(0x44)),
    ("f11", KeyCode::extended(0x57)),
    ("f12", KeyCode::extended(0x58)),
    ("enter", KeyCode(b'\n' as u32)),
    ("tab", KeyCode(b'\t' as u32)),
    ("backspace", KeyCode(0x08)),
    ("escape", KeyCode(0x1b)),
    ("space", KeyCode(b' ' as u32)),
];

/// Looks a symbolic key name up, ignoring ASCII case. `esc` and `del` are accepted as
/// short forms.
pub fn key_by_name(name: &str) -> Option<KeyCode> {
    let lowered = name.to_ascii_lowercase();
    let canonical = match lowered.as_str() {
        "esc" => "escape",
        "del" => "delete",
        "pgup" => "pageup",
        "pgdn" => "pagedown",
        other => other,
    };
    NAMED_KEYS
        .iter()
        .find(|(known, _)| *known == canonical)
        .map(|&(_, key)| key)
}

/// Parsed but not yet resolved key code specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySpec {
    Code(u32),
    Char(char),
    Name(String),
}

impl KeySpec {
    /// Builds a spec from its type word and value, validating the value's shape.
    pub fn parse(kind: &str, value: &str) -> Result<Self, MappingError> {
        match kind {
            "code" => value
                .parse::<u32>()
                .map(KeySpec::Code)
                .map_err(|_| MappingError::InvalidKeyCode(value.to_string())),
            "char" => {
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(KeySpec::Char(c)),
                    _ => Err(MappingError::InvalidChar(value.to_string())),
                }
            }
            "name" => Ok(KeySpec::Name(value.to_string())),
            other => Err(MappingError::UnknownKeySpecType(other.to_string())),
        }
    }

    pub fn resolve(&self) -> Result<KeyCode, MappingError> {
        match self {
            KeySpec::Code(code) => Ok(KeyCode(*code)),
            KeySpec::Char(c) => Ok(KeyCode::from(*c)),
            KeySpec::Name(name) => {
                key_by_name(name).ok_or_else(|| MappingError::UnknownKeyName(name.clone()))
            }
        }
    }
}

impl std::fmt::Display for KeySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySpec::Code(code) => write!(f, "code {code}"),
            KeySpec::Char(c) => write!(f, "char {c}"),
            KeySpec::Name(name) => write!(f, "name {name}"),
        }
    }
}

/// Parses and resolves a spec in one step.
pub fn parse_key(kind: &str, value: &str) -> Result<KeyCode, MappingError> {
    KeySpec::parse(kind, value)?.resolve()
}
