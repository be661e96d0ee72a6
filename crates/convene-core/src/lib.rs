//! # Convene Core Library
//!
//! Availability aggregation and meeting-block optimization for group
//! scheduling. Participants submit weighted time preferences, the organizer
//! ranks participants by necessity, and the engine finds the contiguous
//! blocks of the event's duration that suit the group best.
//!
//! ## Architecture
//!
//! - **Grid**: each event's days × 15-minute slots, with slot and range ids
//! - **Preferences**: per-participant ranges, committed atomically and read
//!   through consistent snapshots
//! - **Aggregation / Optimizer**: necessity-weighted slot scores and a
//!   prefix-sum sliding window that never crosses a date
//! - **Heat**: a separate, display-only bucketing of slots
//! - **Registry**: the event-level operation surface, plus serializable
//!   snapshots for whoever persists them
//!
//! ## Key Components
//!
//! - [`EventRegistry`]: create events, submit preferences, optimize
//! - [`PreferenceStore`]: per-event committed preferences
//! - [`BlockOptimizer`]: ranked contiguous blocks
//! - [`EngineConfig`]: TOML-backed engine settings

pub mod aggregation;
pub mod config;
pub mod error;
pub mod event;
pub mod grid;
pub mod heat;
pub mod optimizer;
pub mod preferences;
pub mod registry;

pub use aggregation::{AggregationEngine, Necessity, NecessityMap};
pub use config::{data_dir, EngineConfig, OptimizerConfig, OutputConfig};
pub use error::{ConfigError, CoreError, OverlapError, RangeError, Result};
pub use event::EventConfig;
pub use grid::{EventWindow, SlotRange, TimeGrid, TimeSlot};
pub use heat::{HeatCategory, HeatCell, HeatClassifier, HeatMap};
pub use optimizer::{BlockOptimizer, OptimalBlock};
pub use preferences::{
    ParticipantId, PreferenceDraft, PreferenceSnapshot, PreferenceStore, SubmitReceipt,
    Submission, Weight,
};
pub use registry::{
    Event, EventId, EventRecord, EventRegistry, EventSummary, RegistrySnapshot, SlotPreferences,
};
