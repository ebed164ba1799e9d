//! Calendar dates used as daily stock keys.
//!
//! Dates travel as `YYYY-MM-DD` strings. "Today" comes from a [`Clock`] so
//! request handlers never read the wall clock directly.

use chrono::{Local, NaiveDate};

/// Route alias that resolves to the day before today.
pub const PREVIOUS_DAY: &str = "previous-day";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of the current calendar date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;

    fn previous_day(&self) -> NaiveDate {
        let today = self.today();
        today.pred_opt().unwrap_or(today)
    }
}

/// Server-local calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Parses a strict `YYYY-MM-DD` date.
///
/// The value must have exactly that shape and survive a round trip through
/// the calendar unchanged, so `2023-02-30` and `2024-1-01` are rejected.
pub fn parse_stock_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 {
        return None;
    }
    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    let date = NaiveDate::parse_from_str(s, DATE_FORMAT).ok()?;
    (format_stock_date(date) == s).then_some(date)
}

pub fn format_stock_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// How a date route parameter was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateParam {
    Explicit(NaiveDate),
    PreviousDay(NaiveDate),
}

impl DateParam {
    pub fn date(&self) -> NaiveDate {
        match self {
            DateParam::Explicit(d) | DateParam::PreviousDay(d) => *d,
        }
    }

    /// Resolves a route parameter that may be the `previous-day` alias.
    pub fn resolve(param: &str, clock: &dyn Clock) -> Option<Self> {
        if param == PREVIOUS_DAY {
            Some(DateParam::PreviousDay(clock.previous_day()))
        } else {
            parse_stock_date(param).map(DateParam::Explicit)
        }
    }
}
