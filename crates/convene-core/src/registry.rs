//! In-memory registry of events.
//!
//! The registry is the operation surface the outside world drives: it owns
//! each event's grid, necessity map and preference store, and hands out
//! serializable snapshots for whoever persists them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use crate::aggregation::{AggregationEngine, NecessityMap};
use crate::config::OptimizerConfig;
use crate::error::{CoreError, Result};
use crate::event::EventConfig;
use crate::grid::{format_time, SlotRange, TimeGrid, TimeSlot};
use crate::heat::{HeatCategory, HeatClassifier, HeatMap};
use crate::optimizer::{BlockOptimizer, OptimalBlock};
use crate::preferences::{
    ParticipantId, PreferenceDraft, PreferenceSnapshot, PreferenceStore, SubmitReceipt,
    Submission, Weight,
};

/// Event identifier (a v4 UUID in hyphenated form).
pub type EventId = String;

/// One scheduled event and its live preference state.
#[derive(Debug)]
pub struct Event {
    id: EventId,
    config: EventConfig,
    created_at: DateTime<Utc>,
    necessity: NecessityMap,
    store: PreferenceStore,
    optimal_blocks: Mutex<Vec<OptimalBlock>>,
}

impl Event {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn grid(&self) -> &TimeGrid {
        self.store.grid()
    }

    pub fn necessity(&self) -> &NecessityMap {
        &self.necessity
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    /// Result of the most recent optimization request.
    pub fn optimal_blocks(&self) -> Vec<OptimalBlock> {
        self.optimal_blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn summary(&self) -> EventSummary {
        let snapshot = self.store.snapshot();
        EventSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            available_days: self.grid().days().to_vec(),
            start_time: format_time(self.grid().window().day_start()),
            end_time: format_time(self.grid().window().day_end()),
            duration_minutes: self.grid().window().duration_minutes(),
            participants: self.necessity.len(),
            responded: snapshot.responded_count(),
            total_slots: self.grid().total_slots(),
        }
    }

    fn rank(
        &self,
        k: Option<usize>,
        limits: &OptimizerConfig,
        budget: Duration,
    ) -> Result<Vec<OptimalBlock>> {
        let snapshot = self.store.snapshot();
        let engine = AggregationEngine::new(&snapshot, &self.necessity);
        let blocks = BlockOptimizer::new(self.grid(), engine)
            .with_slot_limit(limits.max_total_slots)
            .with_timeout(budget)
            .top_blocks(k)?;

        *self
            .optimal_blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = blocks.clone();
        Ok(blocks)
    }
}

/// Listing entry for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: EventId,
    pub created_at: DateTime<Utc>,
    pub available_days: Vec<NaiveDate>,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: u32,
    pub participants: usize,
    pub responded: usize,
    pub total_slots: usize,
}

/// Everyone's weights for one slot, with its display bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotPreferences {
    pub slot_id: TimeSlot,
    pub date: NaiveDate,
    pub start_time: String,
    pub participant_weights: BTreeMap<ParticipantId, Weight>,
    pub heat: HeatCategory,
}

/// Persistable copy of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: EventId,
    pub created_at: DateTime<Utc>,
    pub config: EventConfig,
    #[serde(default)]
    pub preferences: PreferenceSnapshot,
    #[serde(default)]
    pub optimal_blocks: Vec<OptimalBlock>,
}

/// Persistable copy of the whole registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

/// Registry of events.
#[derive(Debug)]
pub struct EventRegistry {
    events: RwLock<HashMap<EventId, Arc<Event>>>,
    limits: OptimizerConfig,
}

impl EventRegistry {
    pub fn new(limits: OptimizerConfig) -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            limits,
        }
    }

    pub fn limits(&self) -> &OptimizerConfig {
        &self.limits
    }

    /// Validate the payload and register a new event.
    ///
    /// # Errors
    /// [`CoreError::Config`] for an invalid payload and
    /// [`CoreError::ResourceExceeded`] when the grid is over the slot cap.
    pub fn create_event(&self, config: EventConfig) -> Result<EventId> {
        let id = uuid::Uuid::new_v4().to_string();
        let event = self.build_event(id.clone(), config, Utc::now(), PreferenceSnapshot::default())?;
        tracing::info!(
            event_id = %id,
            days = event.grid().days().len(),
            slots = event.grid().total_slots(),
            participants = event.necessity.len(),
            "event created"
        );
        self.write().insert(id.clone(), Arc::new(event));
        Ok(id)
    }

    fn build_event(
        &self,
        id: EventId,
        config: EventConfig,
        created_at: DateTime<Utc>,
        preferences: PreferenceSnapshot,
    ) -> Result<Event> {
        let (grid, necessity) = config.validate()?;
        let slots = grid.total_slots();
        if slots > self.limits.max_total_slots {
            return Err(CoreError::ResourceExceeded {
                slots,
                limit: self.limits.max_total_slots,
            });
        }
        Ok(Event {
            id,
            config,
            created_at,
            necessity,
            store: PreferenceStore::with_snapshot(grid, preferences)?,
            optimal_blocks: Mutex::new(Vec::new()),
        })
    }

    /// # Errors
    /// [`CoreError::NotFound`] for an unknown id.
    pub fn event(&self, event_id: &str) -> Result<Arc<Event>> {
        self.read()
            .get(event_id)
            .cloned()
            .ok_or_else(|| CoreError::event_not_found(event_id))
    }

    /// All events, oldest first.
    pub fn list_events(&self) -> Vec<EventSummary> {
        let mut events: Vec<EventSummary> = self.read().values().map(|e| e.summary()).collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        events
    }

    pub fn delete_event(&self, event_id: &str) -> Result<()> {
        if self.write().remove(event_id).is_none() {
            return Err(CoreError::event_not_found(event_id));
        }
        tracing::info!(event_id, "event deleted");
        Ok(())
    }

    /// Apply a participant's wire-format additions and deletions.
    ///
    /// # Errors
    /// [`CoreError::NotFound`] for an unknown event or a participant the
    /// organizer did not invite, otherwise whatever
    /// [`PreferenceStore::submit`] returns.
    pub fn submit_preferences<A, K, D, S>(
        &self,
        event_id: &str,
        participant: &str,
        additions: A,
        deletions: D,
    ) -> Result<SubmitReceipt>
    where
        A: IntoIterator<Item = (K, u8)>,
        K: AsRef<str>,
        D: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let submission = Submission::from_wire(additions, deletions)?;
        self.submit(event_id, participant, &submission)
    }

    pub fn submit(&self, event_id: &str, participant: &str, submission: &Submission) -> Result<SubmitReceipt> {
        let event = self.invited(event_id, participant)?;
        event.store.submit(participant, submission)
    }

    pub fn commit_draft(&self, event_id: &str, draft: PreferenceDraft) -> Result<SubmitReceipt> {
        let event = self.invited(event_id, draft.participant())?;
        draft.commit(&event.store)
    }

    /// Ranges a participant has committed so far.
    pub fn submitted_ranges(&self, event_id: &str, participant: &str) -> Result<BTreeMap<SlotRange, Weight>> {
        Ok(self.invited(event_id, participant)?.store.submitted_ranges(participant))
    }

    /// Every slot in chronological order with who weighted it and how hot it is.
    pub fn get_aggregated_preferences(&self, event_id: &str) -> Result<Vec<SlotPreferences>> {
        let event = self.event(event_id)?;
        let snapshot = event.store.snapshot();
        let classifier = HeatClassifier::new(&snapshot);

        Ok(event
            .grid()
            .all_slots()
            .map(|slot| SlotPreferences {
                slot_id: slot,
                date: slot.date,
                start_time: format_time(slot.start),
                participant_weights: snapshot.current_weights(&slot),
                heat: classifier.classify(&slot).category,
            })
            .collect())
    }

    pub fn heatmap(&self, event_id: &str) -> Result<HeatMap> {
        let event = self.event(event_id)?;
        let snapshot = event.store.snapshot();
        Ok(HeatClassifier::new(&snapshot).build_heatmap(event.grid()))
    }

    /// Top `k` blocks, or the configured default count when `k` is `None`.
    pub fn optimize(&self, event_id: &str, k: Option<usize>) -> Result<Vec<OptimalBlock>> {
        let k = k.unwrap_or(self.limits.default_top_k);
        self.event(event_id)?
            .rank(Some(k), &self.limits, self.limits.timeout())
    }

    /// The full ranking.
    pub fn optimize_all(&self, event_id: &str) -> Result<Vec<OptimalBlock>> {
        self.event(event_id)?
            .rank(None, &self.limits, self.limits.timeout())
    }

    /// Rank on the blocking pool, giving up once `timeout` has elapsed.
    ///
    /// # Errors
    /// [`CoreError::Timeout`] if the ranking does not finish in time; no
    /// partial ranking is returned.
    pub async fn optimize_with_timeout(
        &self,
        event_id: &str,
        k: Option<usize>,
        timeout: Duration,
    ) -> Result<Vec<OptimalBlock>> {
        let event = self.event(event_id)?;
        let limits = self.limits.clone();
        let k = k.or(Some(limits.default_top_k));
        let timeout_ms = timeout.as_millis() as u64;

        let task = tokio::task::spawn_blocking(move || event.rank(k, &limits, timeout));
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(CoreError::Io(std::io::Error::other(join))),
            Err(_) => {
                tracing::warn!(event_id, timeout_ms, "optimization timed out");
                Err(CoreError::Timeout { timeout_ms })
            }
        }
    }

    /// Copy of every event and its committed preferences.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut events: Vec<EventRecord> = self
            .read()
            .values()
            .map(|event| EventRecord {
                id: event.id.clone(),
                created_at: event.created_at,
                config: event.config.clone(),
                preferences: (*event.store.snapshot()).clone(),
                optimal_blocks: event.optimal_blocks(),
            })
            .collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        RegistrySnapshot { events }
    }

    /// Rebuild a registry, re-validating every stored event.
    pub fn from_snapshot(limits: OptimizerConfig, snapshot: RegistrySnapshot) -> Result<Self> {
        let registry = Self::new(limits);
        {
            let mut events = registry.write();
            for record in snapshot.events {
                let event = registry.build_event(
                    record.id.clone(),
                    record.config,
                    record.created_at,
                    record.preferences,
                )?;
                *event
                    .optimal_blocks
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = record.optimal_blocks;
                events.insert(record.id, Arc::new(event));
            }
        }
        tracing::debug!(events = registry.read().len(), "registry restored");
        Ok(registry)
    }

    fn invited(&self, event_id: &str, participant: &str) -> Result<Arc<Event>> {
        let event = self.event(event_id)?;
        if !event.necessity.contains_key(participant) {
            return Err(CoreError::participant_not_found(participant));
        }
        Ok(event)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<EventId, Arc<Event>>> {
        self.events.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<EventId, Arc<Event>>> {
        self.events.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EventConfig {
        EventConfig {
            available_days: vec!["2025-05-01".into()],
            start_time: "09:00".into(),
            end_time: "11:00".into(),
            duration_minutes: 30,
            participant_necessity: BTreeMap::from([
                ("alice@example.com".to_string(), 3),
                ("bob@example.com".to_string(), 1),
            ]),
        }
    }

    fn no_deletions() -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn create_and_list() {
        let registry = EventRegistry::default();
        let id = registry.create_event(config()).unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        let events = registry.list_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].total_slots, 8);
        assert_eq!(events[0].participants, 2);
        assert_eq!(events[0].start_time, "09:00");
    }

    #[test]
    fn create_rejects_invalid_and_oversized() {
        let registry = EventRegistry::default();
        let mut bad = config();
        bad.duration_minutes = 25;
        assert!(matches!(registry.create_event(bad), Err(CoreError::Config(_))));

        let small = EventRegistry::new(OptimizerConfig {
            max_total_slots: 4,
            ..OptimizerConfig::default()
        });
        assert!(matches!(
            small.create_event(config()),
            Err(CoreError::ResourceExceeded { slots: 8, limit: 4 })
        ));
        assert!(small.list_events().is_empty());
    }

    #[test]
    fn submit_requires_known_event_and_participant() {
        let registry = EventRegistry::default();
        let id = registry.create_event(config()).unwrap();

        let err = registry
            .submit_preferences("missing", "alice@example.com", [("09:00-09:30@2025-05-01", 5u8)], no_deletions())
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "Event", .. }));

        let err = registry
            .submit_preferences(&id, "mallory@example.com", [("09:00-09:30@2025-05-01", 5u8)], no_deletions())
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "Participant", .. }));
    }

    #[test]
    fn aggregated_preferences_cover_every_slot() {
        let registry = EventRegistry::default();
        let id = registry.create_event(config()).unwrap();
        registry
            .submit_preferences(&id, "alice@example.com", [("09:00-09:30@2025-05-01", 5u8)], no_deletions())
            .unwrap();

        let slots = registry.get_aggregated_preferences(&id).unwrap();
        assert_eq!(slots.len(), 8);
        assert_eq!(slots[0].slot_id.id(), "2025-05-01T09:00");
        assert_eq!(slots[0].participant_weights["alice@example.com"], Weight::Preferred);
        assert_eq!(slots[0].heat, HeatCategory::High);
        assert_eq!(slots[2].heat, HeatCategory::None);

        let json = serde_json::to_value(&slots[0]).unwrap();
        assert_eq!(json["slotId"], "2025-05-01T09:00");
        assert_eq!(json["startTime"], "09:00");
        assert_eq!(json["heat"], "high");
    }

    #[test]
    fn optimize_uses_default_k_and_records_result() {
        let registry = EventRegistry::default();
        let id = registry.create_event(config()).unwrap();
        registry
            .submit_preferences(&id, "alice@example.com", [("10:00-10:30@2025-05-01", 5u8)], no_deletions())
            .unwrap();

        let blocks = registry.optimize(&id, None).unwrap();
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0].slot_ids(), vec!["2025-05-01T10:00", "2025-05-01T10:15"]);
        assert_eq!(blocks[0].total_score, 30);
        assert_eq!(registry.event(&id).unwrap().optimal_blocks(), blocks);

        assert_eq!(registry.optimize_all(&id).unwrap().len(), 7);
        assert_eq!(registry.optimize(&id, Some(1)).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn optimize_with_timeout_returns_ranking() {
        let registry = EventRegistry::default();
        let id = registry.create_event(config()).unwrap();
        let blocks = registry
            .optimize_with_timeout(&id, Some(2), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(blocks.len(), 2);
    }

    #[tokio::test]
    async fn optimize_with_timeout_unknown_event() {
        let registry = EventRegistry::default();
        let err = registry
            .optimize_with_timeout("nope", None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn delete_then_lookup_fails() {
        let registry = EventRegistry::default();
        let id = registry.create_event(config()).unwrap();
        registry.delete_event(&id).unwrap();
        assert!(matches!(registry.event(&id), Err(CoreError::NotFound { .. })));
        assert!(registry.delete_event(&id).is_err());
    }

    #[test]
    fn snapshot_round_trip_keeps_preferences() {
        let registry = EventRegistry::default();
        let id = registry.create_event(config()).unwrap();
        registry
            .submit_preferences(&id, "bob@example.com", [("09:30-10:30@2025-05-01", 3u8)], no_deletions())
            .unwrap();
        registry.optimize(&id, Some(1)).unwrap();

        let json = serde_json::to_string(&registry.snapshot()).unwrap();
        let restored =
            EventRegistry::from_snapshot(OptimizerConfig::default(), serde_json::from_str(&json).unwrap()).unwrap();

        assert_eq!(restored.snapshot(), registry.snapshot());
        assert_eq!(
            restored.submitted_ranges(&id, "bob@example.com").unwrap().len(),
            1
        );
        assert_eq!(restored.event(&id).unwrap().optimal_blocks().len(), 1);
    }

    #[test]
    fn commit_draft_goes_through_invitation_check() {
        let registry = EventRegistry::default();
        let id = registry.create_event(config()).unwrap();

        let mut draft = PreferenceDraft::new("alice@example.com");
        draft.stage_addition("09:00-10:00@2025-05-01".parse().unwrap(), Weight::Available);
        let receipt = registry.commit_draft(&id, draft).unwrap();
        assert_eq!(receipt.slots, 4);

        let stranger = PreferenceDraft::new("eve@example.com");
        assert!(registry.commit_draft(&id, stranger).is_err());
    }
}
