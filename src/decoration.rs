//! Rendering and parsing of block parameter values
//!
//! Values are shown with the block's precision, the locale's decimal
//! separator and the unit suffix: `1.5 s`, `1,5 s`, `70 %`, `20 cm`, `3×`.

use crate::blocks::Unit;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    English,
    German,
}

impl Locale {
    pub fn decimal_separator(self) -> char {
        match self {
            Locale::English => '.',
            Locale::German => ',',
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Locale::English => "en",
            Locale::German => "de",
        }
    }

    pub fn from_code(code: &str) -> Option<Locale> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Locale::English),
            "de" | "german" | "deutsch" => Some(Locale::German),
            _ => None,
        }
    }
}

/// A value the editor refused
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("'{text}' is not a number")]
    Unparsable { text: String },

    #[error("{value} is outside {range}")]
    OutOfRange { value: f64, range: String },

    #[error("block '{name}' takes no value")]
    NoParameter { name: &'static str },
}

/// Format `value` for display
pub fn format_value(value: f64, unit: Unit, precision: u8, locale: Locale) -> String {
    let mut number = format!("{:.*}", precision as usize, value);
    if locale.decimal_separator() != '.' {
        number = number.replace('.', &locale.decimal_separator().to_string());
    }
    match unit {
        Unit::Times => format!("{}{}", number, unit.suffix()),
        _ => format!("{} {}", number, unit.suffix()),
    }
}

/// Parse user input in `locale`.
///
/// Surrounding whitespace and a trailing unit suffix are ignored. Only the
/// locale's decimal separator is accepted.
pub fn parse_value(text: &str, locale: Locale) -> Result<f64, ValidationError> {
    let unparsable = || ValidationError::Unparsable {
        text: text.to_string(),
    };

    let mut trimmed = text.trim();
    for suffix in [Unit::Centimeters, Unit::Seconds, Unit::Percent, Unit::Times].map(Unit::suffix) {
        if let Some(rest) = trimmed.strip_suffix(suffix) {
            trimmed = rest.trim_end();
            break;
        }
    }
    // A lone 'x' is accepted as the times suffix as well.
    if let Some(rest) = trimmed.strip_suffix('x') {
        trimmed = rest.trim_end();
    }

    let normalized = match locale {
        Locale::English if trimmed.contains(',') => return Err(unparsable()),
        Locale::English => trimmed.to_string(),
        Locale::German if trimmed.contains('.') => return Err(unparsable()),
        Locale::German => trimmed.replace(',', "."),
    };

    if normalized.is_empty() {
        return Err(unparsable());
    }
    let value: f64 = normalized.parse().map_err(|_| unparsable())?;
    if !value.is_finite() {
        return Err(unparsable());
    }
    Ok(value)
}
