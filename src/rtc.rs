//! Hardware-clock view of the virtual clock: calendar time in, calendar time out.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Timelike};

use crate::clock::state::{max_virtual_seconds, min_virtual_seconds};
use crate::clock::{ClockState, SharedClock};
use crate::error::ClockError;

/// Broken-down UTC time on the proleptic Gregorian calendar.
/// Months and days are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CalendarTime {
    /// Converts Unix seconds to calendar time. Fails only outside the range
    /// chrono can represent (roughly ±262,000 years).
    pub fn from_unix_seconds(seconds: i64) -> Result<Self, ClockError> {
        let time = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
            ClockError::InvalidCalendarTime(format!("{seconds}s is outside the calendar range"))
        })?;
        Ok(Self {
            year: time.year(),
            month: time.month(),
            day: time.day(),
            hour: time.hour(),
            minute: time.minute(),
            second: time.second(),
        })
    }

    /// Converts back to Unix seconds, rejecting undefined fields such as
    /// day 32, February 30 or hour 24.
    pub fn to_unix_seconds(&self) -> Result<i64, ClockError> {
        let time = NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|date| date.and_hms_opt(self.hour, self.minute, self.second))
            .ok_or_else(|| ClockError::InvalidCalendarTime(self.to_string()))?;
        Ok(time.and_utc().timestamp())
    }

    /// Whether `seconds` can be shown as calendar time at all.
    pub fn is_representable(seconds: i64) -> bool {
        (min_virtual_seconds()..=max_virtual_seconds()).contains(&seconds)
    }
}

impl fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Read/set contract a host time subsystem expects from a hardware clock.
pub trait HardwareClock {
    fn read_time(&self) -> Result<CalendarTime, ClockError>;
    fn set_time(&self, time: &CalendarTime) -> Result<(), ClockError>;
}

/// [`HardwareClock`] backed by the engine's virtual seconds. Micros are
/// neither reported nor touched, matching RTC granularity.
///
/// The clock state only ever holds seconds with a calendar date, so
/// `read_time` always succeeds.
#[derive(Debug, Clone)]
pub struct VirtualRtc {
    clock: SharedClock,
}

impl VirtualRtc {
    pub fn new(clock: SharedClock) -> Self {
        Self { clock }
    }
}

impl HardwareClock for VirtualRtc {
    fn read_time(&self) -> Result<CalendarTime, ClockError> {
        CalendarTime::from_unix_seconds(self.clock.read(ClockState::virtual_seconds))
    }

    fn set_time(&self, time: &CalendarTime) -> Result<(), ClockError> {
        let seconds = time.to_unix_seconds()?;
        self.clock.update(|state| state.set_virtual_seconds(seconds))
    }
}
