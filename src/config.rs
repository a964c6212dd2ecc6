//! Settings file
//!
//! ```toml
//! [run]
//! speed = 60
//! left_motor = "B"
//! right_motor = "C"
//!
//! [editor]
//! locale = "de"
//! history_limit = 200
//!
//! [simulation]
//! sensors = ["touch", "ultrasonic"]
//! distance_cm = 40
//! ```
//!
//! Every field is optional; missing ones take their defaults.

use crate::controller::{DriveLayout, InputDevice, MotorPort};
use crate::decoration::Locale;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::interpreter::{RunOptions, DEFAULT_SPEED};
use crate::trace::DEFAULT_TRACE_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid settings: {0}")]
    Value(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Motor speed in percent before any `set_motor_speed` block
    pub speed: i32,
    pub left_motor: char,
    pub right_motor: char,
    /// Number of steps kept in a run's trace
    pub trace_limit: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        let layout = DriveLayout::default();
        RunSettings {
            speed: DEFAULT_SPEED,
            left_motor: layout.left.letter(),
            right_motor: layout.right.letter(),
            trace_limit: DEFAULT_TRACE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// `en` or `de`
    pub locale: String,
    pub history_limit: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        EditorSettings {
            locale: Locale::default().code().to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Connected sensors by name (`touch`, `ultrasonic`, `light`)
    pub sensors: Vec<String>,
    pub touch: bool,
    pub distance_cm: i32,
    pub light_percent: i32,
    /// Sleep for real during timed blocks
    pub realtime: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            sensors: ["touch", "ultrasonic", "light"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            touch: false,
            distance_cm: 100,
            light_percent: 50,
            realtime: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub run: RunSettings,
    pub editor: EditorSettings,
    pub simulation: SimulationSettings,
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        // Reject bad values at load time.
        settings.layout()?;
        settings.locale()?;
        settings.sensors()?;
        Ok(settings)
    }

    /// Read `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Settings::default());
        }
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_toml(&text)?;
        tracing::info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn layout(&self) -> Result<DriveLayout, ConfigError> {
        let port = |c: char| {
            MotorPort::from_letter(c)
                .ok_or_else(|| ConfigError::Value(format!("unknown motor port '{}'", c)))
        };
        Ok(DriveLayout {
            left: port(self.run.left_motor)?,
            right: port(self.run.right_motor)?,
        })
    }

    pub fn locale(&self) -> Result<Locale, ConfigError> {
        Locale::from_code(&self.editor.locale)
            .ok_or_else(|| ConfigError::Value(format!("unknown locale '{}'", self.editor.locale)))
    }

    pub fn sensors(&self) -> Result<Vec<InputDevice>, ConfigError> {
        self.simulation
            .sensors
            .iter()
            .map(|name| {
                InputDevice::from_name(name)
                    .ok_or_else(|| ConfigError::Value(format!("unknown sensor '{}'", name)))
            })
            .collect()
    }

    pub fn run_options(&self) -> Result<RunOptions, ConfigError> {
        Ok(RunOptions {
            speed: self.run.speed,
            layout: self.layout()?,
            trace_limit: self.run.trace_limit,
        })
    }
}
