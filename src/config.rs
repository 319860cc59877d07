//! # Configuration
//!
//! One TOML file configures the whole stack. Every section has defaults, so a missing
//! file or a missing section leaves the driver fully usable:
//!
//! ```toml
//! bindings = ["map-dpad up name up", "map-button 0 name enter"]
//!
//! [quantizer]
//! dead_zone_squared = 3276
//! axis_band = 40
//!
//! [queue]
//! overflow = "drop-oldest"
//!
//! [registry]
//! capacity = 16
//! name_prefix = "usb_gamepad"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Bindings use the same command grammar as the console and are applied in order.

use crate::controller::direction::StickQuantizer;
use crate::controller::key_queue::OverflowPolicy;
use crate::mapping::{MapCommand, MappingTables};
use crate::session::registry::{RegistrySettings, REGISTRY_CAPACITY};
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct QueueConfig {
    pub overflow: OverflowPolicy,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Session slots, clamped to `1..=16`.
    pub capacity: usize,
    /// Input sources are registered as `<name_prefix><slot>`.
    pub name_prefix: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: REGISTRY_CAPACITY,
            name_prefix: "usb_gamepad".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> Result<Level> {
        parse_level(&self.level)
    }
}

pub fn parse_level(level: &str) -> Result<Level> {
    level
        .parse::<Level>()
        .map_err(|_| eyre!("Unknown log level: {}", level))
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Mapping command lines, applied in order.
    pub bindings: Vec<String>,
    pub quantizer: StickQuantizer,
    pub queue: QueueConfig,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// `<config_dir>/padkeys/config.toml`, or `None` if the platform has no config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("padkeys").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reads `path` when it exists and falls back to defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        fs::write(path, content).map_err(|e| eyre!("Failed to write config file: {}", e))?;
        Ok(())
    }

    /// Checks everything a bad value would otherwise only surface as at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.quantizer.dead_zone_squared < 0 {
            return Err(eyre!(
                "quantizer.dead_zone_squared must not be negative, got {}",
                self.quantizer.dead_zone_squared
            ));
        }
        if self.quantizer.axis_band < 0 {
            return Err(eyre!(
                "quantizer.axis_band must not be negative, got {}",
                self.quantizer.axis_band
            ));
        }
        self.logging.max_level()?;
        self.binding_commands()?;
        Ok(())
    }

    pub fn binding_commands(&self) -> Result<Vec<MapCommand>> {
        self.bindings
            .iter()
            .map(|line| {
                MapCommand::parse(line).map_err(|e| eyre!("Invalid binding '{}': {}", line, e))
            })
            .collect()
    }

    /// Builds mapping tables from the configured bindings.
    pub fn mapping_tables(&self) -> Result<MappingTables> {
        let mut tables = MappingTables::new();
        for command in self.binding_commands()? {
            command
                .apply(&mut tables)
                .map_err(|e| eyre!("Failed to apply binding: {}", e))?;
        }
        Ok(tables)
    }

    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            capacity: self.registry.capacity.clamp(1, REGISTRY_CAPACITY),
            name_prefix: self.registry.name_prefix.clone(),
            overflow: self.queue.overflow,
            quantizer: self.quantizer,
        }
    }
}
