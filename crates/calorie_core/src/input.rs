//! Boundary validation for the "Add Calorie Intake" prompt.
//!
//! # Invariants
//! - Only finite, strictly positive amounts leave this module.
//! - Surrounding whitespace is ignored; anything else must parse as `f64`.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejected prompt input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    Empty,
    NotNumeric(String),
    NotFinite,
    NotPositive(f64),
}

impl Display for InputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "enter the amount of calories"),
            Self::NotNumeric(text) => write!(f, "`{text}` is not a number"),
            Self::NotFinite => write!(f, "calories must be a finite number"),
            Self::NotPositive(value) => {
                write!(f, "calories must be greater than zero, got {value}")
            }
        }
    }
}

impl Error for InputError {}

impl InputError {
    /// Stable reason code, safe to log.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::NotNumeric(_) => "not_numeric",
            Self::NotFinite => "not_finite",
            Self::NotPositive(_) => "not_positive",
        }
    }
}

/// Parses the submitted prompt text into a calorie amount.
pub fn parse_calorie_input(text: &str) -> Result<f64, InputError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| InputError::NotNumeric(trimmed.chars().take(32).collect()))?;
    if !value.is_finite() {
        return Err(InputError::NotFinite);
    }
    if value <= 0.0 {
        return Err(InputError::NotPositive(value));
    }
    Ok(value)
}
