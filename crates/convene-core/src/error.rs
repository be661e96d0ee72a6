//! Core error types for convene-core.
//!
//! Every validation failure is detected before any state is mutated, so a
//! caller that receives one of these errors can assume nothing was written.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Core error type for convene-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Event window parameters are invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A submitted range is malformed, misaligned, inverted or out of bounds
    #[error("Invalid range: {0}")]
    InvalidRange(#[from] RangeError),

    /// A participant's ranges intersect each other
    #[error("Overlapping ranges: {0}")]
    Overlap(#[from] OverlapError),

    /// Referenced event or participant does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The grid is larger than the configured cap
    #[error("Event grid has {slots} slots, exceeding the limit of {limit}")]
    ResourceExceeded { slots: usize, limit: usize },

    /// The request deadline passed before the ranking was complete
    #[error("Optimization timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file could not be parsed
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Config file could not be written
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl CoreError {
    pub fn event_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind: "Event",
            id: id.into(),
        }
    }

    pub fn participant_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind: "Participant",
            id: id.into(),
        }
    }
}

/// Event window and engine configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Duration is zero, not a multiple of 15, or too long
    #[error("Duration must be a positive multiple of 15 minutes no longer than {max}, got {minutes}")]
    InvalidDuration { minutes: u32, max: u32 },

    /// Event has no available days
    #[error("Event must have at least one available day")]
    EmptyDays,

    /// The same date was listed twice
    #[error("Duplicate available day: {0}")]
    DuplicateDay(NaiveDate),

    /// Day start is not before day end
    #[error("Day start ({start}) must be before day end ({end})")]
    InvertedWindow { start: NaiveTime, end: NaiveTime },

    /// Day bounds are not on the 15-minute grid
    #[error("Time {0} is not on a 15-minute boundary")]
    MisalignedTime(NaiveTime),

    /// Necessity value outside {1, 3, 5}
    #[error("Invalid necessity {value} for participant '{participant}'")]
    InvalidNecessity { participant: String, value: u8 },

    /// Event must name at least one participant
    #[error("Event must have at least one participant")]
    NoParticipants,

    /// Malformed field in the event payload
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Missing or unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Errors for submitted slot ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// Could not parse a range or slot id
    #[error("Malformed range '{0}', expected HH:MM-HH:MM@YYYY-MM-DD")]
    Malformed(String),

    /// Could not parse a single slot id
    #[error("Malformed slot id '{0}', expected YYYY-MM-DDTHH:MM")]
    MalformedSlot(String),

    /// Start or end not on the 15-minute grid
    #[error("Time {0} is not on a 15-minute boundary")]
    Misaligned(NaiveTime),

    /// Start is not before end
    #[error("Range start ({start}) must be before end ({end})")]
    Inverted { start: NaiveTime, end: NaiveTime },

    /// Range leaves the configured daily window
    #[error("Range {start}-{end} lies outside the event window {day_start}-{day_end}")]
    OutOfBounds {
        start: NaiveTime,
        end: NaiveTime,
        day_start: NaiveTime,
        day_end: NaiveTime,
    },

    /// Date is not one of the event's available days
    #[error("Date {0} is not an available day for this event")]
    UnknownDate(NaiveDate),

    /// Weight outside {1, 3, 5}
    #[error("Invalid preference weight {0}, expected 1, 3 or 5")]
    InvalidWeight(u8),
}

/// Two ranges of the same participant intersect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{first} overlaps {second}")]
pub struct OverlapError {
    pub first: String,
    pub second: String,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
