//! Event creation payload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregation::{Necessity, NecessityMap};
use crate::error::ConfigError;
use crate::grid::{parse_date, parse_time, EventWindow, TimeGrid};
use crate::preferences::ParticipantId;

/// Organizer-supplied event parameters as they arrive on the wire.
///
/// ```json
/// {
///   "availableDays": ["2025-05-01", "2025-05-02"],
///   "startTime": "09:00",
///   "endTime": "17:00",
///   "durationMinutes": 60,
///   "participantNecessity": { "alice@example.com": 5 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventConfig {
    pub available_days: Vec<String>,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub participant_necessity: BTreeMap<ParticipantId, u8>,
}

impl EventConfig {
    /// Parse and check every field, producing the event's grid and
    /// necessity map.
    ///
    /// # Errors
    /// [`ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<(TimeGrid, NecessityMap), ConfigError> {
        if self.available_days.is_empty() {
            return Err(ConfigError::EmptyDays);
        }
        let days = self
            .available_days
            .iter()
            .map(|raw| {
                parse_date(raw).ok_or_else(|| ConfigError::InvalidValue {
                    field: "availableDays".to_string(),
                    message: format!("'{raw}' is not a YYYY-MM-DD date"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let day_start = parse_clock("startTime", &self.start_time)?;
        let day_end = parse_clock("endTime", &self.end_time)?;

        let grid = TimeGrid::new(EventWindow::new(
            days,
            day_start,
            day_end,
            self.duration_minutes,
        )?);
        grid.block_length()?;

        if self.participant_necessity.is_empty() {
            return Err(ConfigError::NoParticipants);
        }
        let necessity = self
            .participant_necessity
            .iter()
            .map(|(participant, &value)| {
                Necessity::for_participant(participant, value).map(|n| (participant.clone(), n))
            })
            .collect::<Result<NecessityMap, _>>()?;

        Ok((grid, necessity))
    }
}

fn parse_clock(field: &str, raw: &str) -> Result<chrono::NaiveTime, ConfigError> {
    parse_time(raw).ok_or_else(|| ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("'{raw}' is not an HH:MM time"),
    })
}
