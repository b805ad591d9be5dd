//! Slot grid and the unavailable-slots view derived from bookings.

use chrono::{Days, NaiveDate, NaiveTime, Timelike};
use std::collections::HashSet;

/// Hourly slots starting at `open_hour`, the last one starting before `close_hour`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGrid {
    open_hour: u32,
    close_hour: u32,
}

impl Default for SlotGrid {
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 18,
        }
    }
}

impl SlotGrid {
    pub fn new(open_hour: u32, close_hour: u32) -> Option<Self> {
        (open_hour < close_hour && close_hour <= 24).then_some(Self {
            open_hour,
            close_hour,
        })
    }

    pub fn open_hour(&self) -> u32 {
        self.open_hour
    }

    pub fn close_hour(&self) -> u32 {
        self.close_hour
    }

    pub fn times(&self) -> impl Iterator<Item = NaiveTime> + '_ {
        (self.open_hour..self.close_hour).filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        time.minute() == 0
            && time.second() == 0
            && time.nanosecond() == 0
            && (self.open_hour..self.close_hour).contains(&time.hour())
    }
}

/// `days` consecutive dates starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    days: u32,
}

impl DateRange {
    pub fn new(start: NaiveDate, days: u32) -> Option<Self> {
        start
            .checked_add_days(Days::new(u64::from(days)))
            .map(|_| Self { start, days })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// First date after the range.
    pub fn end(&self) -> NaiveDate {
        self.start + Days::new(u64::from(self.days))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.days as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Blocked slots of one service over a date range.
///
/// Built from a single snapshot of held slots; `iter` walks the grid lazily and can be called
/// any number of times with the same result.
#[derive(Debug, Clone)]
pub struct UnavailableSlots {
    grid: SlotGrid,
    range: DateRange,
    held: HashSet<Slot>,
}

impl UnavailableSlots {
    pub fn new(
        grid: SlotGrid,
        range: DateRange,
        held: impl IntoIterator<Item = (NaiveDate, NaiveTime)>,
    ) -> Self {
        Self {
            grid,
            range,
            held: held
                .into_iter()
                .map(|(date, time)| Slot { date, time })
                .collect(),
        }
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn iter(&self) -> impl Iterator<Item = Slot> + '_ {
        self.range
            .dates()
            .flat_map(move |date| self.grid.times().map(move |time| Slot { date, time }))
            .filter(move |slot| self.held.contains(slot))
    }
}
