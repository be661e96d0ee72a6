//! Discretized calendar for one event.
//!
//! The slot universe is the cross product of the event's available days and
//! the 15-minute slots between the daily start and end time.

mod slot;

pub use slot::{is_aligned, minutes_of_day, SlotRange, TimeSlot, SLOT_MINUTES};
pub(crate) use slot::{format_time, parse_date, parse_time};

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RangeError};

/// Longest event duration the grid accepts, in minutes.
pub const MAX_DURATION_MINUTES: u32 = 1435;

/// Organizer-set parameters of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    available_days: Vec<NaiveDate>,
    day_start: NaiveTime,
    day_end: NaiveTime,
    duration_minutes: u32,
}

impl EventWindow {
    /// Build a window, sorting the days chronologically.
    ///
    /// An empty day list is accepted here and yields an empty universe; the
    /// event payload boundary is where a missing day set becomes an error.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for duplicate days, misaligned or inverted
    /// day bounds.
    pub fn new(
        mut available_days: Vec<NaiveDate>,
        day_start: NaiveTime,
        day_end: NaiveTime,
        duration_minutes: u32,
    ) -> Result<Self, ConfigError> {
        for time in [day_start, day_end] {
            if !is_aligned(time) {
                return Err(ConfigError::MisalignedTime(time));
            }
        }
        if day_start >= day_end {
            return Err(ConfigError::InvertedWindow {
                start: day_start,
                end: day_end,
            });
        }

        available_days.sort();
        if let Some(pair) = available_days.windows(2).find(|w| w[0] == w[1]) {
            return Err(ConfigError::DuplicateDay(pair[0]));
        }

        Ok(Self {
            available_days,
            day_start,
            day_end,
            duration_minutes,
        })
    }

    pub fn available_days(&self) -> &[NaiveDate] {
        &self.available_days
    }

    pub fn day_start(&self) -> NaiveTime {
        self.day_start
    }

    pub fn day_end(&self) -> NaiveTime {
        self.day_end
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }
}

/// Pure slot arithmetic over an [`EventWindow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeGrid {
    window: EventWindow,
}

impl TimeGrid {
    pub fn new(window: EventWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &EventWindow {
        &self.window
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.window.available_days
    }

    /// Number of slots on each available day.
    pub fn slots_per_day(&self) -> usize {
        let span = minutes_of_day(self.window.day_end) - minutes_of_day(self.window.day_start);
        (span / SLOT_MINUTES) as usize
    }

    /// Size of the whole slot universe.
    pub fn total_slots(&self) -> usize {
        self.slots_per_day() * self.window.available_days.len()
    }

    /// All slots of `date` between day start and day end, in order.
    ///
    /// The sequence is produced from the window alone, so calling it again
    /// yields the same slots.
    pub fn slots_for_day(&self, date: NaiveDate) -> impl Iterator<Item = TimeSlot> {
        let start = self.window.day_start;
        let step = Duration::minutes(SLOT_MINUTES as i64);
        (0..self.slots_per_day() as i32).map(move |i| TimeSlot::new(date, start + step * i))
    }

    /// Every slot of the universe, day by day.
    pub fn all_slots(&self) -> impl Iterator<Item = TimeSlot> + '_ {
        self.window
            .available_days
            .iter()
            .flat_map(move |&date| self.slots_for_day(date))
    }

    /// Check a start/end pair against the grid and the daily window.
    ///
    /// # Errors
    /// [`RangeError::Misaligned`], [`RangeError::Inverted`] or
    /// [`RangeError::OutOfBounds`].
    pub fn validate_range(&self, start: NaiveTime, end: NaiveTime) -> Result<(), RangeError> {
        for time in [start, end] {
            if !is_aligned(time) {
                return Err(RangeError::Misaligned(time));
            }
        }
        if start >= end {
            return Err(RangeError::Inverted { start, end });
        }
        if start < self.window.day_start || end > self.window.day_end {
            return Err(RangeError::OutOfBounds {
                start,
                end,
                day_start: self.window.day_start,
                day_end: self.window.day_end,
            });
        }
        Ok(())
    }

    /// [`validate_range`](Self::validate_range) plus date membership.
    pub fn validate_slot_range(&self, range: &SlotRange) -> Result<(), RangeError> {
        self.validate_range(range.start, range.end)?;
        if self.window.available_days.binary_search(&range.date).is_err() {
            return Err(RangeError::UnknownDate(range.date));
        }
        Ok(())
    }

    /// Whether `slot` belongs to the universe.
    pub fn contains(&self, slot: &TimeSlot) -> bool {
        self.window.available_days.binary_search(&slot.date).is_ok()
            && is_aligned(slot.start)
            && slot.start >= self.window.day_start
            && slot.start < self.window.day_end
    }

    /// Number of consecutive slots an event occupies.
    ///
    /// # Errors
    /// [`ConfigError::InvalidDuration`] unless the duration is a positive
    /// multiple of 15 no longer than [`MAX_DURATION_MINUTES`].
    pub fn block_length(&self) -> Result<usize, ConfigError> {
        let minutes = self.window.duration_minutes;
        if minutes == 0 || minutes % SLOT_MINUTES != 0 || minutes > MAX_DURATION_MINUTES {
            return Err(ConfigError::InvalidDuration {
                minutes,
                max: MAX_DURATION_MINUTES,
            });
        }
        Ok((minutes / SLOT_MINUTES) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, day).unwrap()
    }

    fn grid(days: Vec<NaiveDate>, duration: u32) -> TimeGrid {
        TimeGrid::new(EventWindow::new(days, t(9, 0), t(11, 0), duration).unwrap())
    }

    #[test]
    fn window_sorts_days_and_rejects_duplicates() {
        let window = EventWindow::new(vec![d(3), d(1)], t(9, 0), t(10, 0), 30).unwrap();
        assert_eq!(window.available_days(), &[d(1), d(3)]);

        let dup = EventWindow::new(vec![d(1), d(1)], t(9, 0), t(10, 0), 30);
        assert_eq!(dup, Err(ConfigError::DuplicateDay(d(1))));
    }

    #[test]
    fn window_rejects_bad_bounds() {
        assert_eq!(
            EventWindow::new(vec![d(1)], t(10, 0), t(9, 0), 30),
            Err(ConfigError::InvertedWindow { start: t(10, 0), end: t(9, 0) })
        );
        assert_eq!(
            EventWindow::new(vec![d(1)], t(9, 5), t(10, 0), 30),
            Err(ConfigError::MisalignedTime(t(9, 5)))
        );
    }

    #[test]
    fn slots_for_day_is_ordered_and_restartable() {
        let grid = grid(vec![d(1)], 30);
        let first: Vec<_> = grid.slots_for_day(d(1)).collect();
        let second: Vec<_> = grid.slots_for_day(d(1)).collect();
        assert_eq!(first.len(), 8);
        assert_eq!(first, second);
        assert_eq!(first[0].id(), "2025-05-01T09:00");
        assert_eq!(first[7].id(), "2025-05-01T10:45");
        assert!(first.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn all_slots_spans_every_day() {
        let grid = grid(vec![d(1), d(2)], 30);
        assert_eq!(grid.total_slots(), 16);
        assert_eq!(grid.all_slots().count(), 16);
    }

    #[test]
    fn validate_range_cases() {
        let grid = grid(vec![d(1)], 30);
        assert!(grid.validate_range(t(9, 0), t(11, 0)).is_ok());
        assert_eq!(
            grid.validate_range(t(9, 10), t(10, 0)),
            Err(RangeError::Misaligned(t(9, 10)))
        );
        assert_eq!(
            grid.validate_range(t(10, 0), t(10, 0)),
            Err(RangeError::Inverted { start: t(10, 0), end: t(10, 0) })
        );
        assert!(matches!(
            grid.validate_range(t(8, 45), t(10, 0)),
            Err(RangeError::OutOfBounds { .. })
        ));
        assert!(matches!(
            grid.validate_range(t(10, 0), t(11, 15)),
            Err(RangeError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn validate_slot_range_checks_date() {
        let grid = grid(vec![d(1)], 30);
        let range = SlotRange::new(d(2), t(9, 0), t(10, 0));
        assert_eq!(
            grid.validate_slot_range(&range),
            Err(RangeError::UnknownDate(d(2)))
        );
    }

    #[test]
    fn block_length_requires_multiple_of_fifteen() {
        assert_eq!(grid(vec![d(1)], 60).block_length(), Ok(4));
        assert!(grid(vec![d(1)], 0).block_length().is_err());
        assert!(grid(vec![d(1)], 50).block_length().is_err());
        assert!(grid(vec![d(1)], 1440).block_length().is_err());
        assert_eq!(grid(vec![d(1)], 1425).block_length(), Ok(95));
    }

    #[test]
    fn empty_day_set_is_an_empty_universe() {
        let grid = grid(vec![], 30);
        assert_eq!(grid.total_slots(), 0);
        assert_eq!(grid.all_slots().count(), 0);
    }

    #[test]
    fn contains_respects_bounds() {
        let grid = grid(vec![d(1)], 30);
        assert!(grid.contains(&TimeSlot::new(d(1), t(10, 45))));
        assert!(!grid.contains(&TimeSlot::new(d(1), t(11, 0))));
        assert!(!grid.contains(&TimeSlot::new(d(2), t(9, 0))));
    }
}
