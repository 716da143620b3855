//! Calorie entry domain model.
//!
//! # Responsibility
//! - Define the single domain record shown by the calorie screen.
//! - Normalize diet level labels used for grouping.
//!
//! # Invariants
//! - `id` is stable, never nil, and never reused for another entry.
//! - `calories` is finite and strictly positive.
//! - `diet_level` is trimmed, lowercase and non-empty.
//! - Entries are immutable once created; deletion is the only lifecycle step.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier of one calorie entry.
pub type EntryId = Uuid;

/// Validation failures for entry construction and persisted data.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValidationError {
    NilId,
    NonFiniteCalories,
    NonPositiveCalories(f64),
    BlankDietLevel,
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "entry id must not be nil"),
            Self::NonFiniteCalories => write!(f, "calories must be a finite number"),
            Self::NonPositiveCalories(value) => {
                write!(f, "calories must be greater than zero, got {value}")
            }
            Self::BlankDietLevel => write!(f, "diet level must not be blank"),
        }
    }
}

impl Error for EntryValidationError {}

/// Coarse category label used as section key.
///
/// Labels compare lexicographically on their normalized form, which is the
/// order sections are presented in (descending).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DietLevel(String);

impl DietLevel {
    pub const CUT: &'static str = "cut";
    pub const MAINTAIN: &'static str = "maintain";
    pub const BULK: &'static str = "bulk";

    /// Normalizes and validates a label.
    pub fn new(label: impl AsRef<str>) -> Result<Self, EntryValidationError> {
        let normalized = label.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(EntryValidationError::BlankDietLevel);
        }
        Ok(Self(normalized))
    }

    pub fn cut() -> Self {
        Self(Self::CUT.to_string())
    }

    pub fn maintain() -> Self {
        Self(Self::MAINTAIN.to_string())
    }

    pub fn bulk() -> Self {
        Self(Self::BULK.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Header text for the section: first letter of every word uppercased.
    pub fn title(&self) -> String {
        self.0
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Display for DietLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DietLevel {
    type Error = EntryValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DietLevel> for String {
    fn from(value: DietLevel) -> Self {
        value.0
    }
}

/// One recorded calorie intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EntryWire")]
pub struct Entry {
    pub id: EntryId,
    pub calories: f64,
    /// Unix epoch milliseconds at creation.
    pub timestamp_ms: i64,
    pub diet_level: DietLevel,
}

#[derive(Deserialize)]
struct EntryWire {
    id: EntryId,
    calories: f64,
    timestamp_ms: i64,
    diet_level: DietLevel,
}

impl TryFrom<EntryWire> for Entry {
    type Error = EntryValidationError;

    fn try_from(value: EntryWire) -> Result<Self, Self::Error> {
        Self::with_id(value.id, value.calories, value.timestamp_ms, value.diet_level)
    }
}

impl Entry {
    /// Creates a validated entry with a generated id.
    pub fn new(
        calories: f64,
        timestamp_ms: i64,
        diet_level: DietLevel,
    ) -> Result<Self, EntryValidationError> {
        Self::with_id(Uuid::new_v4(), calories, timestamp_ms, diet_level)
    }

    /// Creates a validated entry with a caller-provided id.
    ///
    /// Used by read-back and import paths where identity already exists.
    pub fn with_id(
        id: EntryId,
        calories: f64,
        timestamp_ms: i64,
        diet_level: DietLevel,
    ) -> Result<Self, EntryValidationError> {
        let entry = Self {
            id,
            calories,
            timestamp_ms,
            diet_level,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Checks field-level invariants.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.id.is_nil() {
            return Err(EntryValidationError::NilId);
        }
        validate_calories(self.calories)?;
        if self.diet_level.as_str().trim().is_empty() {
            return Err(EntryValidationError::BlankDietLevel);
        }
        Ok(())
    }
}

/// Rejects non-finite and non-positive calorie amounts.
pub fn validate_calories(calories: f64) -> Result<(), EntryValidationError> {
    if !calories.is_finite() {
        return Err(EntryValidationError::NonFiniteCalories);
    }
    if calories <= 0.0 {
        return Err(EntryValidationError::NonPositiveCalories(calories));
    }
    Ok(())
}

/// Presentation order used when sections are keyed by level:
/// `diet_level` desc, then `timestamp_ms` desc, then `id` asc.
pub fn cmp_by_level(a: &Entry, b: &Entry) -> Ordering {
    b.diet_level
        .cmp(&a.diet_level)
        .then_with(|| b.timestamp_ms.cmp(&a.timestamp_ms))
        .then_with(|| a.id.cmp(&b.id))
}

/// Presentation order used for the timeline layout:
/// `timestamp_ms` desc, then `diet_level` desc, then `id` asc.
pub fn cmp_by_timeline(a: &Entry, b: &Entry) -> Ordering {
    b.timestamp_ms
        .cmp(&a.timestamp_ms)
        .then_with(|| b.diet_level.cmp(&a.diet_level))
        .then_with(|| a.id.cmp(&b.id))
}

/// Current wall-clock time in Unix epoch milliseconds.
///
/// Clocks before the epoch collapse to `0`.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
