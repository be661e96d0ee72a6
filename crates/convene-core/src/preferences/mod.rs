//! Per-event preference state.
//!
//! Each participant's committed ranges are the source of truth; per-slot
//! weights are derived from them. Readers take an `Arc` of the whole
//! committed state, so a read never observes a half-applied submission.
//! Writers are serialized per participant and swap in only their own slice.

mod draft;
mod submission;

pub use draft::PreferenceDraft;
pub use submission::Submission;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::{RangeError, Result};
use crate::grid::{SlotRange, TimeGrid, TimeSlot};

/// Participant identifier (an email address in practice).
pub type ParticipantId = String;

/// How much a participant wants a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Weight {
    IfNecessary = 1,
    Available = 3,
    Preferred = 5,
}

impl Weight {
    pub fn value(self) -> i64 {
        self as i64
    }
}

impl TryFrom<u8> for Weight {
    type Error = RangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Weight::IfNecessary),
            3 => Ok(Weight::Available),
            5 => Ok(Weight::Preferred),
            other => Err(RangeError::InvalidWeight(other)),
        }
    }
}

impl From<Weight> for u8 {
    fn from(weight: Weight) -> Self {
        weight as u8
    }
}

/// One participant's committed ranges and the slot weights they imply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<SlotRange, Weight>", into = "BTreeMap<SlotRange, Weight>")]
pub struct ParticipantPreferences {
    ranges: BTreeMap<SlotRange, Weight>,
    slots: BTreeMap<TimeSlot, Weight>,
}

impl ParticipantPreferences {
    pub fn ranges(&self) -> &BTreeMap<SlotRange, Weight> {
        &self.ranges
    }

    pub fn weight_at(&self, slot: &TimeSlot) -> Option<Weight> {
        self.slots.get(slot).copied()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl From<BTreeMap<SlotRange, Weight>> for ParticipantPreferences {
    fn from(ranges: BTreeMap<SlotRange, Weight>) -> Self {
        let slots = ranges
            .iter()
            .flat_map(|(range, weight)| range.slots().map(move |slot| (slot, *weight)))
            .collect();
        Self { ranges, slots }
    }
}

impl From<ParticipantPreferences> for BTreeMap<SlotRange, Weight> {
    fn from(prefs: ParticipantPreferences) -> Self {
        prefs.ranges
    }
}

/// Immutable view of every participant's committed preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferenceSnapshot {
    participants: BTreeMap<ParticipantId, ParticipantPreferences>,
}

impl PreferenceSnapshot {
    pub fn participant(&self, id: &str) -> Option<&ParticipantPreferences> {
        self.participants.get(id)
    }

    /// Weights submitted for `slot`, keyed by participant.
    pub fn current_weights(&self, slot: &TimeSlot) -> BTreeMap<ParticipantId, Weight> {
        self.participants
            .iter()
            .filter_map(|(id, prefs)| prefs.weight_at(slot).map(|w| (id.clone(), w)))
            .collect()
    }

    /// Participants with at least one committed range anywhere in the event.
    pub fn responded(&self) -> impl Iterator<Item = &ParticipantId> {
        self.participants
            .iter()
            .filter(|(_, prefs)| !prefs.is_empty())
            .map(|(id, _)| id)
    }

    pub fn responded_count(&self) -> usize {
        self.responded().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &ParticipantPreferences)> {
        self.participants.iter()
    }
}

/// Outcome of a committed submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub participant: ParticipantId,
    pub ranges: usize,
    pub slots: usize,
}

/// Holds current weight submissions for one event.
#[derive(Debug)]
pub struct PreferenceStore {
    grid: TimeGrid,
    committed: RwLock<Arc<PreferenceSnapshot>>,
    writers: Mutex<HashMap<ParticipantId, Arc<Mutex<()>>>>,
}

impl PreferenceStore {
    pub fn new(grid: TimeGrid) -> Self {
        Self {
            grid,
            committed: RwLock::new(Arc::new(PreferenceSnapshot::default())),
            writers: Mutex::new(HashMap::new()),
        }
    }

    /// Restore a store from a previously taken snapshot.
    ///
    /// # Errors
    /// Fails if any stored range no longer fits the grid.
    pub fn with_snapshot(grid: TimeGrid, snapshot: PreferenceSnapshot) -> Result<Self> {
        for (_, prefs) in snapshot.iter() {
            for range in prefs.ranges().keys() {
                grid.validate_slot_range(range)?;
            }
            submission::check_disjoint(prefs.ranges().keys())?;
        }
        let store = Self::new(grid);
        *store.committed.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
        Ok(store)
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// The committed state as of now.
    pub fn snapshot(&self) -> Arc<PreferenceSnapshot> {
        // Snapshots are replaced whole, so a poisoned lock still holds a
        // consistent value.
        Arc::clone(&self.committed.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn current_weights(&self, slot: &TimeSlot) -> BTreeMap<ParticipantId, Weight> {
        self.snapshot().current_weights(slot)
    }

    /// Ranges the participant has committed, empty if none.
    pub fn submitted_ranges(&self, participant: &str) -> BTreeMap<SlotRange, Weight> {
        self.snapshot()
            .participant(participant)
            .map(|prefs| prefs.ranges().clone())
            .unwrap_or_default()
    }

    /// Apply a submission atomically for one participant.
    ///
    /// # Errors
    /// [`CoreError::InvalidRange`](crate::CoreError::InvalidRange) or
    /// [`CoreError::Overlap`](crate::CoreError::Overlap); on error the
    /// committed state is untouched.
    pub fn submit(&self, participant: &str, submission: &Submission) -> Result<SubmitReceipt> {
        let writer = self.writer_for(participant);
        let _guard = writer.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.snapshot();
        let empty = ParticipantPreferences::default();
        let before = current.participant(participant).unwrap_or(&empty);

        let next = match submission.apply(&self.grid, before) {
            Ok(next) => next,
            Err(err) => {
                tracing::debug!(participant, error = %err, "submission rejected");
                return Err(err);
            }
        };

        drop(current);

        let receipt = SubmitReceipt {
            participant: participant.to_string(),
            ranges: next.ranges().len(),
            slots: next.slot_count(),
        };

        {
            let mut committed = self.committed.write().unwrap_or_else(PoisonError::into_inner);
            let state = Arc::make_mut(&mut *committed);
            if next.is_empty() {
                state.participants.remove(participant);
            } else {
                state.participants.insert(participant.to_string(), next);
            }
        }

        tracing::info!(
            participant,
            added = submission.additions.len(),
            deleted = submission.deletions.len(),
            ranges = receipt.ranges,
            "preferences committed"
        );
        Ok(receipt)
    }

    fn writer_for(&self, participant: &str) -> Arc<Mutex<()>> {
        let mut writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(writers.entry(participant.to_string()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::grid::EventWindow;
    use chrono::{NaiveDate, NaiveTime};
    use std::thread;

    fn grid() -> TimeGrid {
        let window = EventWindow::new(
            vec![NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()],
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            60,
        )
        .unwrap();
        TimeGrid::new(window)
    }

    fn slot(raw: &str) -> TimeSlot {
        raw.parse().unwrap()
    }

    fn add(raw: &str, weight: u8) -> Submission {
        Submission::from_wire([(raw, weight)], Vec::<String>::new()).unwrap()
    }

    #[test]
    fn weight_values() {
        assert_eq!(Weight::try_from(5), Ok(Weight::Preferred));
        assert_eq!(Weight::try_from(4), Err(RangeError::InvalidWeight(4)));
        assert_eq!(u8::from(Weight::IfNecessary), 1);
        assert_eq!(serde_json::to_string(&Weight::Available).unwrap(), "3");
    }

    #[test]
    fn submit_then_read_weights() {
        let store = PreferenceStore::new(grid());
        store.submit("alice@example.com", &add("09:00-09:30@2025-05-01", 5)).unwrap();

        let weights = store.current_weights(&slot("2025-05-01T09:15"));
        assert_eq!(weights.get("alice@example.com"), Some(&Weight::Preferred));
        assert!(store.current_weights(&slot("2025-05-01T09:30")).is_empty());
    }

    #[test]
    fn deletion_removes_participant_entry() {
        let store = PreferenceStore::new(grid());
        store.submit("alice@example.com", &add("09:00-09:30@2025-05-01", 5)).unwrap();
        let delete =
            Submission::from_wire(Vec::<(String, u8)>::new(), ["09:00-09:30@2025-05-01"]).unwrap();
        store.submit("alice@example.com", &delete).unwrap();

        assert!(store.current_weights(&slot("2025-05-01T09:00")).is_empty());
        assert!(store.snapshot().participant("alice@example.com").is_none());
        assert_eq!(store.snapshot().responded_count(), 0);
    }

    #[test]
    fn rejected_submission_leaves_state_untouched() {
        let store = PreferenceStore::new(grid());
        store.submit("alice@example.com", &add("09:00-10:00@2025-05-01", 3)).unwrap();
        let before = store.snapshot();

        let bad = Submission::from_wire(
            [("09:30-10:30@2025-05-01", 5u8), ("12:00-13:00@2025-05-01", 5u8)],
            Vec::<String>::new(),
        )
        .unwrap();
        let err = store.submit("alice@example.com", &bad).unwrap_err();
        assert!(matches!(err, CoreError::Overlap(_)));
        assert_eq!(*store.snapshot(), *before);
    }

    #[test]
    fn old_snapshot_is_not_mutated_by_later_commit() {
        let store = PreferenceStore::new(grid());
        let before = store.snapshot();
        store.submit("bob@example.com", &add("10:00-11:00@2025-05-01", 1)).unwrap();
        assert_eq!(before.responded_count(), 0);
        assert_eq!(store.snapshot().responded_count(), 1);
    }

    #[test]
    fn concurrent_participants_do_not_lose_updates() {
        let store = Arc::new(PreferenceStore::new(grid()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let who = format!("p{i}@example.com");
                    store.submit(&who, &add("09:00-10:00@2025-05-01", 3)).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.current_weights(&slot("2025-05-01T09:00")).len(), 8);
    }

    #[test]
    fn concurrent_submits_for_one_participant_are_serialized() {
        let store = Arc::new(PreferenceStore::new(grid()));
        let handles: Vec<_> = [9u32, 13]
            .into_iter()
            .map(|first_hour| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for quarter in 0..16 {
                        let start = first_hour * 60 + quarter * 15;
                        let end = start + 15;
                        let range = format!(
                            "{:02}:{:02}-{:02}:{:02}@2025-05-01",
                            start / 60,
                            start % 60,
                            end / 60,
                            end % 60
                        );
                        store.submit("alice@example.com", &add(&range, 3)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.submitted_ranges("alice@example.com").len(), 32);
        assert_eq!(
            store.current_weights(&slot("2025-05-01T16:45")).get("alice@example.com"),
            Some(&Weight::Available)
        );
    }

    #[test]
    fn snapshot_serializes_ranges_only() {
        let store = PreferenceStore::new(grid());
        store.submit("alice@example.com", &add("09:00-09:30@2025-05-01", 5)).unwrap();
        let json = serde_json::to_value(&*store.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "alice@example.com": { "09:00-09:30@2025-05-01": 5 } })
        );

        let restored: PreferenceSnapshot = serde_json::from_value(json).unwrap();
        let store = PreferenceStore::with_snapshot(grid(), restored).unwrap();
        assert_eq!(
            store.current_weights(&slot("2025-05-01T09:15")).get("alice@example.com"),
            Some(&Weight::Preferred)
        );
    }

    #[test]
    fn restoring_snapshot_outside_grid_fails() {
        let json = serde_json::json!({ "alice@example.com": { "07:00-08:00@2025-05-01": 5 } });
        let snapshot: PreferenceSnapshot = serde_json::from_value(json).unwrap();
        assert!(PreferenceStore::with_snapshot(grid(), snapshot).is_err());
    }

    #[test]
    fn restoring_overlapping_ranges_fails() {
        let json = serde_json::json!({
            "alice@example.com": {
                "09:00-10:00@2025-05-01": 5,
                "09:30-10:30@2025-05-01": 1
            }
        });
        let snapshot: PreferenceSnapshot = serde_json::from_value(json).unwrap();
        let err = PreferenceStore::with_snapshot(grid(), snapshot).unwrap_err();
        assert!(matches!(err, CoreError::Overlap(_)));
    }
}
