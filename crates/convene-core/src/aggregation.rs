//! Necessity-weighted slot scores.
//!
//! `score(slot) = Σ weight(p, slot) × necessity(p)` over the participants who
//! submitted a weight for the slot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::grid::{TimeGrid, TimeSlot};
use crate::preferences::{ParticipantId, PreferenceSnapshot};

/// How important a participant's attendance is to the organizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum Necessity {
    #[default]
    NotRequired = 1,
    Preferred = 3,
    Required = 5,
}

impl Necessity {
    pub fn value(self) -> i64 {
        self as i64
    }

    /// Convert a raw organizer value, naming the participant on failure.
    pub fn for_participant(participant: &str, value: u8) -> Result<Self, ConfigError> {
        Self::try_from(value).map_err(|_| ConfigError::InvalidNecessity {
            participant: participant.to_string(),
            value,
        })
    }
}

impl TryFrom<u8> for Necessity {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Necessity::NotRequired),
            3 => Ok(Necessity::Preferred),
            5 => Ok(Necessity::Required),
            other => Err(ConfigError::InvalidValue {
                field: "necessity".to_string(),
                message: format!("expected 1, 3 or 5, got {other}"),
            }),
        }
    }
}

impl From<Necessity> for u8 {
    fn from(necessity: Necessity) -> Self {
        necessity as u8
    }
}

/// Organizer-assigned necessity per participant.
pub type NecessityMap = BTreeMap<ParticipantId, Necessity>;

/// Scores slots against one consistent preference snapshot.
pub struct AggregationEngine<'a> {
    snapshot: &'a PreferenceSnapshot,
    necessity: &'a NecessityMap,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(snapshot: &'a PreferenceSnapshot, necessity: &'a NecessityMap) -> Self {
        Self {
            snapshot,
            necessity,
        }
    }

    /// Necessity of a participant; anyone the organizer did not rank counts
    /// as not required.
    pub fn necessity_of(&self, participant: &str) -> Necessity {
        self.necessity.get(participant).copied().unwrap_or_default()
    }

    /// Aggregate score of one slot.
    pub fn score(&self, slot: &TimeSlot) -> i64 {
        self.snapshot
            .iter()
            .filter_map(|(id, prefs)| {
                prefs
                    .weight_at(slot)
                    .map(|weight| weight.value() * self.necessity_of(id).value())
            })
            .sum()
    }

    /// Scores of every slot on `date`, in grid order.
    pub fn day_scores(&self, grid: &TimeGrid, date: NaiveDate) -> Vec<i64> {
        grid.slots_for_day(date).map(|slot| self.score(&slot)).collect()
    }
}
