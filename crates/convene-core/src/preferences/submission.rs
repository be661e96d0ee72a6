//! Additions + deletions transaction for one participant.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{ParticipantPreferences, Weight};
use crate::error::{CoreError, OverlapError, RangeError, Result};
use crate::grid::{SlotRange, TimeGrid};

/// A participant's change set, applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub additions: BTreeMap<SlotRange, Weight>,
    #[serde(default)]
    pub deletions: BTreeSet<SlotRange>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the wire shape: `{"HH:MM-HH:MM@YYYY-MM-DD": weight}` plus a list
    /// of range strings to delete.
    ///
    /// # Errors
    /// [`RangeError::Malformed`] for an unparsable range and
    /// [`RangeError::InvalidWeight`] for a weight outside {1, 3, 5}.
    pub fn from_wire<A, K, D, S>(additions: A, deletions: D) -> Result<Self, RangeError>
    where
        A: IntoIterator<Item = (K, u8)>,
        K: AsRef<str>,
        D: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut submission = Self::new();
        for (range, weight) in additions {
            let range: SlotRange = range.as_ref().parse()?;
            submission.additions.insert(range, Weight::try_from(weight)?);
        }
        for range in deletions {
            submission.deletions.insert(range.as_ref().parse()?);
        }
        Ok(submission)
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    /// Check every range against the grid without touching any state.
    pub fn validate(&self, grid: &TimeGrid) -> Result<(), RangeError> {
        self.additions
            .keys()
            .chain(self.deletions.iter())
            .try_for_each(|range| grid.validate_slot_range(range))
    }

    /// Compute the participant's next committed ranges.
    ///
    /// Deletions go first and trim any range they touch. An addition that
    /// matches a surviving range exactly replaces it; any other intersection
    /// fails the whole submission.
    pub(crate) fn apply(
        &self,
        grid: &TimeGrid,
        current: &ParticipantPreferences,
    ) -> Result<ParticipantPreferences> {
        self.validate(grid)?;
        check_disjoint(self.additions.keys())?;

        let mut surviving: Vec<(SlotRange, Weight)> = current
            .ranges()
            .iter()
            .map(|(range, weight)| (*range, *weight))
            .collect();
        for cut in &self.deletions {
            surviving = surviving
                .into_iter()
                .flat_map(|(range, weight)| {
                    range.subtract(cut).into_iter().map(move |rest| (rest, weight))
                })
                .collect();
        }
        surviving.retain(|(range, _)| !self.additions.contains_key(range));

        for added in self.additions.keys() {
            if let Some((existing, _)) = surviving.iter().find(|(r, _)| r.overlaps(added)) {
                return Err(CoreError::Overlap(OverlapError {
                    first: existing.to_string(),
                    second: added.to_string(),
                }));
            }
        }

        let ranges: BTreeMap<SlotRange, Weight> = surviving
            .into_iter()
            .chain(self.additions.iter().map(|(r, w)| (*r, *w)))
            .collect();
        Ok(ParticipantPreferences::from(ranges))
    }
}

/// Fail on the first pair of intersecting ranges.
///
/// Input must be sorted by (date, start). Comparing neighbours suffices
/// because the scan stops at the first overlap: while no overlap has been
/// seen, every earlier range ends at or before its successor starts.
pub(super) fn check_disjoint<'a>(ranges: impl Iterator<Item = &'a SlotRange>) -> Result<(), OverlapError> {
    let mut prev: Option<&SlotRange> = None;
    for range in ranges {
        if let Some(prev) = prev.filter(|p| p.overlaps(range)) {
            return Err(OverlapError {
                first: prev.to_string(),
                second: range.to_string(),
            });
        }
        prev = Some(range);
    }
    Ok(())
}
