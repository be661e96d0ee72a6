//! Display-only heat classification of slots.
//!
//! Independent of the ranking score: counts how many participants picked each
//! preference level and normalizes by the number of participants who
//! responded anywhere in the event. Necessity plays no part here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::grid::{format_time, TimeGrid, TimeSlot};
use crate::preferences::{PreferenceSnapshot, Weight};

/// Coarse display bucket for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeatCategory {
    None,
    Low,
    MediumLow,
    Medium,
    MediumHigh,
    High,
}

impl HeatCategory {
    pub const ALL: [HeatCategory; 6] = [
        Self::None,
        Self::Low,
        Self::MediumLow,
        Self::Medium,
        Self::MediumHigh,
        Self::High,
    ];

    /// Bucket a weighted score; first matching threshold wins.
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            Self::High
        } else if score >= 5.0 {
            Self::MediumHigh
        } else if score >= 3.0 {
            Self::Medium
        } else if score >= 1.0 {
            Self::MediumLow
        } else {
            Self::Low
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::MediumLow => "medium-low",
            Self::Medium => "medium",
            Self::MediumHigh => "medium-high",
            Self::High => "high",
        }
    }

    /// Character for ASCII visualization.
    pub fn heat_char(&self) -> char {
        match self {
            Self::None => ' ',
            Self::Low => '.',
            Self::MediumLow => '░',
            Self::Medium => '▒',
            Self::MediumHigh => '▓',
            Self::High => '█',
        }
    }
}

/// Per-level response counts for one slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub preferred: u32,
    pub available: u32,
    pub if_necessary: u32,
}

impl LevelCounts {
    pub fn total(&self) -> u32 {
        self.preferred + self.available + self.if_necessary
    }
}

/// A classified slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatCell {
    pub slot: TimeSlot,
    pub counts: LevelCounts,
    pub weighted_score: f64,
    pub category: HeatCategory,
}

/// Buckets slots for display.
pub struct HeatClassifier<'a> {
    snapshot: &'a PreferenceSnapshot,
    responded: usize,
}

impl<'a> HeatClassifier<'a> {
    pub fn new(snapshot: &'a PreferenceSnapshot) -> Self {
        Self {
            snapshot,
            responded: snapshot.responded_count(),
        }
    }

    pub fn counts(&self, slot: &TimeSlot) -> LevelCounts {
        let mut counts = LevelCounts::default();
        for (_, prefs) in self.snapshot.iter() {
            match prefs.weight_at(slot) {
                Some(Weight::Preferred) => counts.preferred += 1,
                Some(Weight::Available) => counts.available += 1,
                Some(Weight::IfNecessary) => counts.if_necessary += 1,
                None => {}
            }
        }
        counts
    }

    /// `(c5 × 10 + c3 × 3 + c1) / R`, or 0 when nobody responded.
    pub fn weighted_score(&self, counts: &LevelCounts) -> f64 {
        if self.responded == 0 || counts.total() == 0 {
            return 0.0;
        }
        let raw = counts.preferred * 10 + counts.available * 3 + counts.if_necessary;
        raw as f64 / self.responded as f64
    }

    pub fn classify(&self, slot: &TimeSlot) -> HeatCell {
        let counts = self.counts(slot);
        let weighted_score = self.weighted_score(&counts);
        let category = if counts.total() == 0 || self.responded == 0 {
            HeatCategory::None
        } else {
            HeatCategory::from_score(weighted_score)
        };
        HeatCell {
            slot: *slot,
            counts,
            weighted_score,
            category,
        }
    }

    /// Classify the whole grid.
    pub fn build_heatmap(&self, grid: &TimeGrid) -> HeatMap {
        HeatMap {
            days: grid.days().to_vec(),
            slots_per_day: grid.slots_per_day(),
            responded: self.responded,
            cells: grid.all_slots().map(|slot| self.classify(&slot)).collect(),
        }
    }
}

/// Every slot of an event, classified, day-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatMap {
    pub days: Vec<NaiveDate>,
    pub slots_per_day: usize,
    pub responded: usize,
    pub cells: Vec<HeatCell>,
}

impl HeatMap {
    pub fn get_cell(&self, slot: &TimeSlot) -> Option<&HeatCell> {
        let day = self.days.binary_search(&slot.date).ok()?;
        self.cells[day * self.slots_per_day..(day + 1) * self.slots_per_day]
            .iter()
            .find(|cell| cell.slot == *slot)
    }

    pub fn day_cells(&self, date: NaiveDate) -> &[HeatCell] {
        match self.days.binary_search(&date) {
            Ok(day) => &self.cells[day * self.slots_per_day..(day + 1) * self.slots_per_day],
            Err(_) => &[],
        }
    }

    /// Slots in the given category, chronologically.
    pub fn slots_in(&self, category: HeatCategory) -> Vec<TimeSlot> {
        self.cells
            .iter()
            .filter(|cell| cell.category == category)
            .map(|cell| cell.slot)
            .collect()
    }

    /// Render as one row per day and one column per slot.
    pub fn render_ascii(&self) -> String {
        let mut output = String::new();

        output.push_str("\nAvailability Heatmap\n");
        output.push_str(&"=".repeat(60));
        output.push('\n');

        if self.cells.is_empty() {
            output.push_str("No slots in this event.\n");
            return output;
        }

        output.push_str(&format!("Responded participants: {}\n\n", self.responded));

        output.push_str(&" ".repeat(11));
        for cell in self.day_cells(self.days[0]) {
            let label = format_time(cell.slot.start);
            if label.ends_with(":00") {
                output.push_str(&label[..2]);
            } else {
                output.push(' ');
            }
        }
        output.push('\n');

        for &date in &self.days {
            output.push_str(&format!("{} ", date.format("%Y-%m-%d")));
            for cell in self.day_cells(date) {
                output.push(cell.category.heat_char());
            }
            output.push('\n');
        }

        output.push('\n');
        output.push_str(&"=".repeat(60));
        output.push('\n');
        let legend: Vec<String> = HeatCategory::ALL
            .iter()
            .map(|category| format!("'{}' {}", category.heat_char(), category.name()))
            .collect();
        output.push_str(&format!("Legend: {}\n", legend.join("  ")));
        output
    }
}
