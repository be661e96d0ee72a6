//! Ranking of contiguous meeting blocks.
//!
//! Each day is scored once, turned into a prefix-sum array, and every window
//! of `block_length` slots is read off in O(1). Windows never cross a date.
//! Candidates from all days are then merged into one ranking: higher total
//! first, earlier start slot first on ties.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::aggregation::AggregationEngine;
use crate::error::{CoreError, Result};
use crate::grid::{TimeGrid, TimeSlot};

/// A contiguous run of slots on one date and its summed score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimalBlock {
    #[serde(rename = "slotIds")]
    pub slots: Vec<TimeSlot>,
    pub total_score: i64,
}

impl OptimalBlock {
    pub fn start(&self) -> Option<TimeSlot> {
        self.slots.first().copied()
    }

    pub fn slot_ids(&self) -> Vec<String> {
        self.slots.iter().map(TimeSlot::id).collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    total: i64,
    start: TimeSlot,
    day: usize,
    offset: usize,
}

/// Finds and ranks blocks of the event's duration.
pub struct BlockOptimizer<'a> {
    grid: &'a TimeGrid,
    engine: AggregationEngine<'a>,
    max_total_slots: Option<usize>,
    deadline: Option<(Instant, Duration)>,
}

impl<'a> BlockOptimizer<'a> {
    pub fn new(grid: &'a TimeGrid, engine: AggregationEngine<'a>) -> Self {
        Self {
            grid,
            engine,
            max_total_slots: None,
            deadline: None,
        }
    }

    /// Refuse grids larger than `limit` slots.
    pub fn with_slot_limit(mut self, limit: usize) -> Self {
        self.max_total_slots = Some(limit);
        self
    }

    /// Fail with a timeout once `budget` has elapsed from now.
    pub fn with_timeout(mut self, budget: Duration) -> Self {
        self.deadline = Some((Instant::now() + budget, budget));
        self
    }

    /// Ranked blocks, best first; all of them when `k` is `None`.
    ///
    /// An empty universe, or a duration longer than every day, yields an
    /// empty ranking rather than an error.
    ///
    /// # Errors
    /// [`CoreError::Config`] for an invalid duration,
    /// [`CoreError::ResourceExceeded`] above the slot limit and
    /// [`CoreError::Timeout`] past the deadline.
    pub fn top_blocks(&self, k: Option<usize>) -> Result<Vec<OptimalBlock>> {
        let total_slots = self.grid.total_slots();
        if let Some(limit) = self.max_total_slots {
            if total_slots > limit {
                tracing::warn!(total_slots, limit, "event grid exceeds slot limit");
                return Err(CoreError::ResourceExceeded {
                    slots: total_slots,
                    limit,
                });
            }
        }

        let block_len = self.grid.block_length()?;
        let mut candidates = Vec::new();

        for (day, &date) in self.grid.days().iter().enumerate() {
            self.check_deadline()?;

            let scores = self.engine.day_scores(self.grid, date);
            if scores.len() < block_len {
                continue;
            }

            let mut prefix = Vec::with_capacity(scores.len() + 1);
            prefix.push(0i64);
            for score in &scores {
                prefix.push(prefix[prefix.len() - 1] + score);
            }

            for (offset, start) in self.grid.slots_for_day(date).enumerate() {
                if offset + block_len > scores.len() {
                    break;
                }
                candidates.push(Candidate {
                    total: prefix[offset + block_len] - prefix[offset],
                    start,
                    day,
                    offset,
                });
            }
        }
        self.check_deadline()?;

        candidates.sort_by(|a, b| b.total.cmp(&a.total).then(a.start.cmp(&b.start)));
        let found = candidates.len();
        if let Some(k) = k {
            candidates.truncate(k);
        }

        let blocks: Vec<OptimalBlock> = candidates
            .iter()
            .map(|c| self.materialize(c, block_len))
            .collect();

        tracing::debug!(
            days = self.grid.days().len(),
            block_len,
            candidates = found,
            returned = blocks.len(),
            "block ranking finished"
        );
        Ok(blocks)
    }

    fn materialize(&self, candidate: &Candidate, block_len: usize) -> OptimalBlock {
        let date = self.grid.days()[candidate.day];
        OptimalBlock {
            slots: self
                .grid
                .slots_for_day(date)
                .skip(candidate.offset)
                .take(block_len)
                .collect(),
            total_score: candidate.total,
        }
    }

    fn check_deadline(&self) -> Result<()> {
        match self.deadline {
            Some((deadline, budget)) if Instant::now() > deadline => Err(CoreError::Timeout {
                timeout_ms: budget.as_millis() as u64,
            }),
            _ => Ok(()),
        }
    }
}
