//! Mirror configuration file
//!
//! TOML, read once at startup. Every key is optional; missing keys take
//! the wiring defaults of a Raspberry Pi with a 3.5" ST7796/FT6336 HAT.

use serde::{Deserialize, Serialize};
use spi_mirror::Orientation;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize configuration")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Panel rotation
    pub orientation: Orientation,
    /// Repaint the whole panel on the first iteration
    pub full_refresh_on_start: bool,
    /// Iterations between stats log lines (0 = off)
    pub stats_interval: u64,
    pub display: DisplayConfig,
    pub touch: TouchConfig,
    pub capture: CaptureConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            orientation: Orientation::Landscape,
            full_refresh_on_start: true,
            stats_interval: 0,
            display: DisplayConfig::default(),
            touch: TouchConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

/// SPI panel wiring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub spi_device: PathBuf,
    pub spi_speed_hz: u32,
    pub gpio_chip: PathBuf,
    /// Data/command select line (BCM numbering)
    pub dc_pin: u32,
    pub rst_pin: u32,
    pub backlight_pin: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            spi_device: PathBuf::from("/dev/spidev0.0"),
            spi_speed_hz: 24_000_000,
            gpio_chip: PathBuf::from("/dev/gpiochip0"),
            dc_pin: 24,
            rst_pin: 22,
            backlight_pin: 17,
        }
    }
}

/// Touch controller wiring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TouchConfig {
    pub enabled: bool,
    pub i2c_device: PathBuf,
    /// 7-bit I2C address
    pub address: u8,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            i2c_device: PathBuf::from("/dev/i2c-1"),
            address: spi_mirror::touch::ft6336::DEFAULT_ADDRESS,
        }
    }
}

/// Where frames come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    /// X11 root window
    #[default]
    X11,
    /// Linux framebuffer device
    Fbdev,
}

/// Frame source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub source: CaptureSource,
    /// X display name; `$DISPLAY` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Framebuffer name under /dev and /sys/class/graphics
    pub framebuffer: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: CaptureSource::X11,
            display: None,
            framebuffer: String::from("fb0"),
        }
    }
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml()?).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject settings the hardware cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.spi_speed_hz == 0 {
            return Err(ConfigError::Invalid("display.spi_speed_hz must be positive".into()));
        }

        let pins = [
            ("dc_pin", self.display.dc_pin),
            ("rst_pin", self.display.rst_pin),
            ("backlight_pin", self.display.backlight_pin),
        ];
        for (i, (name, pin)) in pins.iter().enumerate() {
            if let Some((other, _)) = pins[i + 1..].iter().find(|(_, p)| p == pin) {
                return Err(ConfigError::Invalid(format!(
                    "display.{} and display.{} both use GPIO {}",
                    name, other, pin
                )));
            }
        }

        if self.touch.address > 0x7F {
            return Err(ConfigError::Invalid(format!(
                "touch.address {:#04x} is not a 7-bit I2C address",
                self.touch.address
            )));
        }

        if self.capture.framebuffer.is_empty() || self.capture.framebuffer.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "capture.framebuffer {:?} must be a bare device name like fb0",
                self.capture.framebuffer
            )));
        }

        Ok(())
    }
}
