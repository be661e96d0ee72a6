//! Slot and slot-range identifiers.
//!
//! A [`TimeSlot`] is written `YYYY-MM-DDTHH:MM` and a [`SlotRange`] is written
//! `HH:MM-HH:MM@YYYY-MM-DD`; both round-trip through `Display`/`FromStr` and
//! serialize as those strings.

use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RangeError;

/// Width of a single slot in minutes.
pub const SLOT_MINUTES: u32 = 15;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Whether a time sits exactly on the 15-minute grid.
pub fn is_aligned(time: NaiveTime) -> bool {
    time.second() == 0 && time.nanosecond() == 0 && time.minute() % SLOT_MINUTES == 0
}

/// Minutes elapsed since midnight.
pub fn minutes_of_day(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight() / 60
}

pub(crate) fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT).ok()
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

pub(crate) fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// The smallest schedulable unit: 15 minutes starting at `start` on `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start: NaiveTime,
}

impl TimeSlot {
    pub fn new(date: NaiveDate, start: NaiveTime) -> Self {
        Self { date, start }
    }

    /// The `YYYY-MM-DDTHH:MM` identifier.
    pub fn id(&self) -> String {
        self.to_string()
    }

    pub fn end(&self) -> NaiveTime {
        self.start + Duration::minutes(SLOT_MINUTES as i64)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}T{}",
            self.date.format(DATE_FORMAT),
            self.start.format(TIME_FORMAT)
        )
    }
}

impl FromStr for TimeSlot {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || RangeError::MalformedSlot(s.to_string());
        let (date, time) = s.split_once('T').ok_or_else(malformed)?;
        let date = parse_date(date).ok_or_else(malformed)?;
        let start = parse_time(time).ok_or_else(malformed)?;
        if !is_aligned(start) {
            return Err(RangeError::Misaligned(start));
        }
        Ok(Self { date, start })
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = RangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}

/// A half-open time range `[start, end)` on one date.
///
/// Parsing only checks syntax; grid membership is checked by
/// [`TimeGrid::validate_slot_range`](super::TimeGrid::validate_slot_range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotRange {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SlotRange {
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        Self { date, start, end }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Same date and the half-open intervals intersect.
    pub fn overlaps(&self, other: &SlotRange) -> bool {
        self.date == other.date && self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, slot: &TimeSlot) -> bool {
        slot.date == self.date && self.start <= slot.start && slot.start < self.end
    }

    /// Slots covered by this range, in chronological order.
    pub fn slots(&self) -> impl Iterator<Item = TimeSlot> + '_ {
        let step = Duration::minutes(SLOT_MINUTES as i64);
        let count = (self.duration_minutes().max(0) as u32 / SLOT_MINUTES) as i32;
        (0..count).map(move |i| TimeSlot::new(self.date, self.start + step * i))
    }

    /// What remains of `self` once `cut` is removed: zero, one or two ranges.
    pub fn subtract(&self, cut: &SlotRange) -> Vec<SlotRange> {
        if !self.overlaps(cut) {
            return vec![*self];
        }
        let mut rest = Vec::with_capacity(2);
        if self.start < cut.start {
            rest.push(SlotRange::new(self.date, self.start, cut.start));
        }
        if cut.end < self.end {
            rest.push(SlotRange::new(self.date, cut.end, self.end));
        }
        rest
    }
}

impl fmt::Display for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}@{}",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT),
            self.date.format(DATE_FORMAT)
        )
    }
}

impl FromStr for SlotRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || RangeError::Malformed(s.to_string());
        let (times, date) = s.split_once('@').ok_or_else(malformed)?;
        let (start, end) = times.split_once('-').ok_or_else(malformed)?;
        Ok(Self {
            date: parse_date(date).ok_or_else(malformed)?,
            start: parse_time(start).ok_or_else(malformed)?,
            end: parse_time(end).ok_or_else(malformed)?,
        })
    }
}

impl TryFrom<String> for SlotRange {
    type Error = RangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotRange> for String {
    fn from(range: SlotRange) -> Self {
        range.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 29).unwrap()
    }

    #[test]
    fn slot_id_format() {
        let slot = TimeSlot::new(d(), t(17, 0));
        assert_eq!(slot.id(), "2025-04-29T17:00");
        assert_eq!("2025-04-29T17:00".parse::<TimeSlot>().unwrap(), slot);
        assert_eq!(slot.end(), t(17, 15));
    }

    #[test]
    fn slot_rejects_bad_ids() {
        assert!(matches!(
            "2025-04-29 17:00".parse::<TimeSlot>(),
            Err(RangeError::MalformedSlot(_))
        ));
        assert_eq!(
            "2025-04-29T17:10".parse::<TimeSlot>(),
            Err(RangeError::Misaligned(t(17, 10)))
        );
    }

    #[test]
    fn range_parse_and_display() {
        let range: SlotRange = "17:00-18:30@2025-04-29".parse().unwrap();
        assert_eq!(range, SlotRange::new(d(), t(17, 0), t(18, 30)));
        assert_eq!(range.to_string(), "17:00-18:30@2025-04-29");
        assert_eq!(range.duration_minutes(), 90);
    }

    #[test]
    fn range_rejects_malformed() {
        for raw in ["17:00-18:30", "17:00@2025-04-29", "aa:00-18:30@2025-04-29", "17:00-18:30@29/04/2025"] {
            assert!(
                matches!(raw.parse::<SlotRange>(), Err(RangeError::Malformed(_))),
                "{raw} should be malformed"
            );
        }
    }

    #[test]
    fn range_expands_to_slots() {
        let range = SlotRange::new(d(), t(9, 0), t(10, 0));
        let ids: Vec<_> = range.slots().map(|s| s.id()).collect();
        assert_eq!(
            ids,
            vec![
                "2025-04-29T09:00",
                "2025-04-29T09:15",
                "2025-04-29T09:30",
                "2025-04-29T09:45"
            ]
        );
        assert!(range.contains(&TimeSlot::new(d(), t(9, 45))));
        assert!(!range.contains(&TimeSlot::new(d(), t(10, 0))));
    }

    #[test]
    fn overlap_is_half_open_and_same_day() {
        let a = SlotRange::new(d(), t(9, 0), t(10, 0));
        let b = SlotRange::new(d(), t(9, 30), t(10, 30));
        let touching = SlotRange::new(d(), t(10, 0), t(11, 0));
        let other_day = SlotRange::new(d().succ_opt().unwrap(), t(9, 0), t(10, 0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&touching));
        assert!(!a.overlaps(&other_day));
    }

    #[test]
    fn subtract_splits_range() {
        let a = SlotRange::new(d(), t(9, 0), t(12, 0));
        let cut = SlotRange::new(d(), t(10, 0), t(11, 0));
        assert_eq!(
            a.subtract(&cut),
            vec![
                SlotRange::new(d(), t(9, 0), t(10, 0)),
                SlotRange::new(d(), t(11, 0), t(12, 0))
            ]
        );
        assert!(a.subtract(&a).is_empty());
        let disjoint = SlotRange::new(d(), t(13, 0), t(14, 0));
        assert_eq!(a.subtract(&disjoint), vec![a]);
    }

    #[test]
    fn serializes_as_strings() {
        let range = SlotRange::new(d(), t(9, 0), t(9, 30));
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(json, "\"09:00-09:30@2025-04-29\"");
        let back: SlotRange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, range);
    }
}
