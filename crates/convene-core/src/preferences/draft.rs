//! Local staging area for preference edits before they are submitted.

use super::{ParticipantId, PreferenceStore, SubmitReceipt, Submission, Weight};
use crate::error::Result;
use crate::grid::SlotRange;

/// Staged additions and deletions for one participant.
#[derive(Debug, Clone)]
pub struct PreferenceDraft {
    participant: ParticipantId,
    submission: Submission,
}

impl PreferenceDraft {
    pub fn new(participant: impl Into<ParticipantId>) -> Self {
        Self {
            participant: participant.into(),
            submission: Submission::new(),
        }
    }

    pub fn participant(&self) -> &str {
        &self.participant
    }

    /// Stage a range with a weight, cancelling a pending deletion of it.
    pub fn stage_addition(&mut self, range: SlotRange, weight: Weight) -> &mut Self {
        self.submission.deletions.remove(&range);
        self.submission.additions.insert(range, weight);
        self
    }

    /// Stage removal of a range, dropping any pending addition of it.
    pub fn stage_deletion(&mut self, range: SlotRange) -> &mut Self {
        self.submission.additions.remove(&range);
        self.submission.deletions.insert(range);
        self
    }

    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    pub fn is_empty(&self) -> bool {
        self.submission.is_empty()
    }

    /// Submit the staged edits as one transaction.
    pub fn commit(self, store: &PreferenceStore) -> Result<SubmitReceipt> {
        store.submit(&self.participant, &self.submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{EventWindow, TimeGrid};
    use chrono::{NaiveDate, NaiveTime};

    fn store() -> PreferenceStore {
        let window = EventWindow::new(
            vec![NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()],
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            30,
        )
        .unwrap();
        PreferenceStore::new(TimeGrid::new(window))
    }

    fn r(raw: &str) -> SlotRange {
        raw.parse().unwrap()
    }

    #[test]
    fn staging_cancels_opposite_edit() {
        let mut draft = PreferenceDraft::new("alice@example.com");
        draft
            .stage_deletion(r("09:00-10:00@2025-05-01"))
            .stage_addition(r("09:00-10:00@2025-05-01"), Weight::Preferred);
        assert!(draft.submission().deletions.is_empty());
        assert_eq!(draft.submission().additions.len(), 1);

        draft.stage_deletion(r("09:00-10:00@2025-05-01"));
        assert!(draft.submission().additions.is_empty());
        assert_eq!(draft.submission().deletions.len(), 1);
    }

    #[test]
    fn commit_applies_to_store() {
        let store = store();
        let mut draft = PreferenceDraft::new("alice@example.com");
        draft
            .stage_addition(r("09:00-10:00@2025-05-01"), Weight::Available)
            .stage_addition(r("10:30-11:00@2025-05-01"), Weight::Preferred);
        let receipt = draft.commit(&store).unwrap();

        assert_eq!(receipt.ranges, 2);
        assert_eq!(receipt.slots, 6);
        assert_eq!(store.submitted_ranges("alice@example.com").len(), 2);
    }
}
