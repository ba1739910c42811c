// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Nanosecond-precision time points.
//!
//! [`Instant`] is the scalar the whole crate is built on: a signed 64-bit
//! count of nanoseconds since 1970-01-01T00:00:00 UTC. The minimum bit
//! pattern (`i64::MIN`) is reserved for the **NaT** ("not a time")
//! sentinel, so the representable span runs from late 1677 to early 2262.
//!
//! NaT deliberately breaks the usual comparison laws: it is an *unknown*
//! value, so every ordering predicate involving it — including equality
//! with itself — is false, and every calendar field of it is `-1`. Code
//! that needs a total order for storage (sorting, binary search) uses the
//! raw integer via [`Instant::raw`] / [`Instant::cmp_raw`] instead of the
//! public comparison operators.

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc, Weekday};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

pub(crate) const NANOS_PER_MICRO: i64 = 1_000;
pub(crate) const NANOS_PER_MILLI: i64 = 1_000_000;
pub(crate) const NANOS_PER_SECOND: i64 = 1_000_000_000;
pub(crate) const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
pub(crate) const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;
pub(crate) const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;

/// A point in time with nanosecond resolution, or the NaT sentinel.
#[derive(Debug, Clone, Copy)]
pub struct Instant(i64);

/// Calendar components extractable from an [`Instant`].
///
/// An explicit enum instead of by-name lookup keeps the field set
/// exhaustive and the dispatch a plain `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Year,
    Quarter,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Microsecond,
    /// Nanosecond remainder within the microsecond (0..=999).
    Nanosecond,
    /// Day of week, 0 = Monday .. 6 = Sunday.
    Weekday,
    DayOfYear,
    /// ISO week number.
    Week,
}

/// How string construction treats unparseable elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// The first failure aborts the whole construction.
    Strict,
    /// Failing elements become NaT.
    Lenient,
}

impl Instant {
    /// The "not a time" sentinel.
    pub const NAT: Instant = Instant(i64::MIN);

    /// Earliest representable instant (1677-09-21T00:12:43.145224193).
    pub const MIN: Instant = Instant(i64::MIN + 1);

    /// Latest representable instant (2262-04-11T23:47:16.854775807).
    pub const MAX: Instant = Instant(i64::MAX);

    /// Wrap a raw nanosecond count. `i64::MIN` yields NaT.
    #[inline]
    pub const fn from_nanos(nanos: i64) -> Self {
        Instant(nanos)
    }

    /// The raw nanosecond count (the NaT bit pattern for NaT).
    #[inline]
    pub const fn raw(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_nat(&self) -> bool {
        self.0 == i64::MIN
    }

    /// Build from calendar components. `micro` is the microsecond within
    /// the second, `nano` the nanosecond within the microsecond.
    pub fn from_calendar(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        micro: u32,
        nano: u32,
    ) -> Result<Self> {
        if micro >= 1_000_000 || nano >= 1_000 {
            return Err(Error::OutOfRange {
                what: "sub-second component",
            });
        }
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(Error::OutOfRange {
            what: "calendar date",
        })?;
        let naive = date
            .and_hms_nano_opt(hour, minute, second, micro * 1_000 + nano)
            .ok_or(Error::OutOfRange {
                what: "time of day",
            })?;
        Self::from_naive(naive)
    }

    pub(crate) fn from_naive(naive: NaiveDateTime) -> Result<Self> {
        let nanos = naive
            .and_utc()
            .timestamp_nanos_opt()
            .ok_or(Error::OutOfRange { what: "instant" })?;
        if nanos == i64::MIN {
            // The minimum bit pattern is reserved for NaT.
            return Err(Error::OutOfRange { what: "instant" });
        }
        Ok(Instant(nanos))
    }

    /// The instant as a `chrono` datetime, or `None` for NaT.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        if self.is_nat() {
            None
        } else {
            Some(DateTime::from_timestamp_nanos(self.0))
        }
    }

    pub(crate) fn naive(&self) -> Option<NaiveDateTime> {
        self.to_datetime().map(|dt| dt.naive_utc())
    }

    /// Extract a calendar field. Returns `-1` for every field of NaT.
    pub fn field(&self, field: Field) -> i64 {
        let Some(naive) = self.naive() else {
            return -1;
        };
        match field {
            Field::Year => naive.year() as i64,
            Field::Quarter => ((naive.month() - 1) / 3 + 1) as i64,
            Field::Month => naive.month() as i64,
            Field::Day => naive.day() as i64,
            Field::Hour => naive.hour() as i64,
            Field::Minute => naive.minute() as i64,
            Field::Second => naive.second() as i64,
            Field::Microsecond => (naive.nanosecond() / 1_000) as i64,
            Field::Nanosecond => (naive.nanosecond() % 1_000) as i64,
            Field::Weekday => naive.weekday().num_days_from_monday() as i64,
            Field::DayOfYear => naive.ordinal() as i64,
            Field::Week => naive.iso_week().week() as i64,
        }
    }

    // ── convenience accessors ─────────────────────────────────────────

    #[inline]
    pub fn year(&self) -> i64 {
        self.field(Field::Year)
    }

    #[inline]
    pub fn quarter(&self) -> i64 {
        self.field(Field::Quarter)
    }

    #[inline]
    pub fn month(&self) -> i64 {
        self.field(Field::Month)
    }

    #[inline]
    pub fn day(&self) -> i64 {
        self.field(Field::Day)
    }

    #[inline]
    pub fn hour(&self) -> i64 {
        self.field(Field::Hour)
    }

    #[inline]
    pub fn minute(&self) -> i64 {
        self.field(Field::Minute)
    }

    /// Day of week, 0 = Monday .. 6 = Sunday, -1 for NaT.
    #[inline]
    pub fn weekday(&self) -> i64 {
        self.field(Field::Weekday)
    }

    pub(crate) fn chrono_weekday(&self) -> Option<Weekday> {
        self.naive().map(|n| n.weekday())
    }

    // ── ordering for storage ──────────────────────────────────────────

    /// Total order over the raw representation (NaT sorts first). This
    /// is the ordering used by sorting and binary search; the public
    /// comparison operators implement NaT's unknown-value semantics
    /// instead.
    #[inline]
    pub fn cmp_raw(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }

    // ── arithmetic ────────────────────────────────────────────────────

    /// Checked translation by a duration. NaT is preserved; an overflow
    /// of the representable span fails.
    pub fn checked_add_delta(&self, delta: TimeDelta) -> Result<Self> {
        if self.is_nat() {
            return Ok(Self::NAT);
        }
        let ns = delta
            .num_nanoseconds()
            .ok_or(Error::OutOfRange { what: "duration" })?;
        let raw = self
            .0
            .checked_add(ns)
            .filter(|&v| v != i64::MIN)
            .ok_or(Error::OutOfRange { what: "instant" })?;
        Ok(Instant(raw))
    }

    /// Difference to another instant, `None` when either side is NaT.
    pub fn delta_since(&self, other: &Self) -> Option<TimeDelta> {
        if self.is_nat() || other.is_nat() {
            return None;
        }
        self.0.checked_sub(other.0).map(TimeDelta::nanoseconds)
    }

    /// Truncate to midnight. NaT is preserved.
    pub fn normalize(&self) -> Self {
        if self.is_nat() {
            return Self::NAT;
        }
        Instant(self.0.div_euclid(NANOS_PER_DAY) * NANOS_PER_DAY)
    }
}

// ── comparison: NaT is not comparable, not even to itself ─────────────────

impl PartialEq for Instant {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        !self.is_nat() && !other.is_nat() && self.0 == other.0
    }
}

impl PartialOrd for Instant {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.is_nat() || other.is_nat() {
            None
        } else {
            Some(self.0.cmp(&other.0))
        }
    }
}

// ── arithmetic operators ──────────────────────────────────────────────────

impl Add<TimeDelta> for Instant {
    type Output = Instant;

    /// Panics when the result leaves the representable span; use
    /// [`Instant::checked_add_delta`] for a fallible version.
    #[inline]
    fn add(self, rhs: TimeDelta) -> Instant {
        self.checked_add_delta(rhs)
            .expect("instant out of representable range")
    }
}

impl Sub<TimeDelta> for Instant {
    type Output = Instant;

    #[inline]
    fn sub(self, rhs: TimeDelta) -> Instant {
        self.checked_add_delta(-rhs)
            .expect("instant out of representable range")
    }
}

// ── Display ───────────────────────────────────────────────────────────────

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(naive) = self.naive() else {
            return write!(f, "NaT");
        };
        write!(f, "{}", naive.format("%Y-%m-%d %H:%M:%S"))?;
        let subsec = naive.nanosecond();
        if subsec != 0 {
            if subsec % 1_000 == 0 {
                write!(f, ".{:06}", subsec / 1_000)?;
            } else {
                write!(f, ".{:09}", subsec)?;
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// String parsing
// ═══════════════════════════════════════════════════════════════════════════

/// Resolution of a parsed (possibly partial) time string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Resolution {
    Year,
    Quarter,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    /// Fractional seconds down to some power-of-ten granule.
    Subsecond,
}

/// A parsed time string as the half-open span it denotes.
///
/// `"2005"` spans the whole year, `"2005-11"` the month, and a fully
/// specified timestamp a single granule.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Partial {
    pub start: Instant,
    /// Exclusive end of the denoted span.
    pub end: Instant,
    pub resolution: Resolution,
}

fn is_nat_text(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("nat") || s.eq_ignore_ascii_case("nan")
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn expand_two_digit_year(yy: i32) -> i32 {
    if yy < 70 {
        2000 + yy
    } else {
        1900 + yy
    }
}

fn add_months(year: i32, month: u32, n: u32) -> (i32, u32) {
    let total = year as i64 * 12 + (month as i64 - 1) + n as i64;
    (total.div_euclid(12) as i32, total.rem_euclid(12) as u32 + 1)
}

fn month_span(year: i32, month: u32, months: u32) -> Result<(Instant, Instant)> {
    let start = Instant::from_calendar(year, month, 1, 0, 0, 0, 0, 0)?;
    let (ey, em) = add_months(year, month, months);
    let end = Instant::from_calendar(ey, em, 1, 0, 0, 0, 0, 0)?;
    Ok((start, end))
}

/// Parse quarter forms `YYYYQq` and `qQYY` (case-insensitive).
fn parse_quarter(s: &str) -> Option<(i32, u32)> {
    let pos = s.find(['Q', 'q'])?;
    let (lhs, rhs) = (&s[..pos], &s[pos + 1..]);
    if lhs.len() == 4 && rhs.len() == 1 && all_digits(lhs) && all_digits(rhs) {
        let year: i32 = lhs.parse().ok()?;
        let q: u32 = rhs.parse().ok()?;
        (1..=4).contains(&q).then_some((year, q))
    } else if lhs.len() == 1 && rhs.len() == 2 && all_digits(lhs) && all_digits(rhs) {
        let q: u32 = lhs.parse().ok()?;
        let yy: i32 = rhs.parse().ok()?;
        (1..=4).contains(&q).then_some((expand_two_digit_year(yy), q))
    } else {
        None
    }
}

fn parse_date_part(s: &str) -> Result<(i32, u32, u32, Resolution)> {
    let fail = || Error::Unparseable(s.to_string());
    if all_digits(s) && s.len() == 8 {
        // compact YYYYMMDD
        let y = s[..4].parse().map_err(|_| fail())?;
        let m = s[4..6].parse().map_err(|_| fail())?;
        let d = s[6..8].parse().map_err(|_| fail())?;
        return Ok((y, m, d, Resolution::Day));
    }
    let parts: Vec<&str> = s.split(['-', '/']).collect();
    match parts.as_slice() {
        [y] if all_digits(y) && y.len() == 4 => {
            Ok((y.parse().map_err(|_| fail())?, 1, 1, Resolution::Year))
        }
        [y, m] if all_digits(y) && y.len() == 4 && all_digits(m) => {
            let month: u32 = m.parse().map_err(|_| fail())?;
            if !(1..=12).contains(&month) {
                return Err(fail());
            }
            Ok((y.parse().map_err(|_| fail())?, month, 1, Resolution::Month))
        }
        [y, m, d] if all_digits(y) && y.len() == 4 && all_digits(m) && all_digits(d) => Ok((
            y.parse().map_err(|_| fail())?,
            m.parse().map_err(|_| fail())?,
            d.parse().map_err(|_| fail())?,
            Resolution::Day,
        )),
        _ => Err(fail()),
    }
}

/// Parse an ISO-like, possibly partial time string into its span.
///
/// Accepted forms: `YYYY`, `YYYYQq`, `qQYY`, `YYYY-MM`, `YYYY-MM-DD`
/// (also `/`-separated and compact `YYYYMMDD`), optionally followed by
/// `HH`, `HH:MM`, `HH:MM:SS` or `HH:MM:SS.frac` after a space or `T`.
pub(crate) fn parse_partial(text: &str) -> Result<Partial> {
    let s = text.trim();
    let fail = || Error::Unparseable(text.to_string());

    if let Some((year, q)) = parse_quarter(s) {
        let (start, end) = month_span(year, (q - 1) * 3 + 1, 3)?;
        return Ok(Partial {
            start,
            end,
            resolution: Resolution::Quarter,
        });
    }

    let (date_part, time_part) = match s.split_once([' ', 'T']) {
        Some((d, t)) => (d, Some(t.trim())),
        None => (s, None),
    };
    let (year, month, day, date_reso) = parse_date_part(date_part)?;

    let Some(time_part) = time_part.filter(|t| !t.is_empty()) else {
        let (start, end) = match date_reso {
            Resolution::Year => month_span(year, 1, 12)?,
            Resolution::Month => month_span(year, month, 1)?,
            _ => {
                let start = Instant::from_calendar(year, month, day, 0, 0, 0, 0, 0)?;
                (start, start.checked_add_delta(TimeDelta::days(1))?)
            }
        };
        return Ok(Partial {
            start,
            end,
            resolution: date_reso,
        });
    };

    // A time component demands a fully specified date.
    if date_reso != Resolution::Day {
        return Err(fail());
    }

    let (hms, frac) = match time_part.split_once('.') {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (time_part, None),
    };
    let fields: Vec<&str> = hms.split(':').collect();
    if fields.len() > 3 || !fields.iter().all(|p| all_digits(p)) {
        return Err(fail());
    }
    let hour: u32 = fields[0].parse().map_err(|_| fail())?;
    let minute: u32 = fields
        .get(1)
        .map_or(Ok(0), |p| p.parse())
        .map_err(|_| fail())?;
    let second: u32 = fields
        .get(2)
        .map_or(Ok(0), |p| p.parse())
        .map_err(|_| fail())?;

    let (subnanos, granule, resolution) = match frac {
        None => {
            let (g, r) = match fields.len() {
                1 => (NANOS_PER_HOUR, Resolution::Hour),
                2 => (NANOS_PER_MINUTE, Resolution::Minute),
                _ => (NANOS_PER_SECOND, Resolution::Second),
            };
            (0u32, g, r)
        }
        Some(frac) => {
            if fields.len() != 3 || !all_digits(frac) || frac.len() > 9 {
                return Err(fail());
            }
            let scale = 10u32.pow(9 - frac.len() as u32);
            let ns: u32 = frac.parse().map_err(|_| fail())?;
            (ns * scale, scale as i64, Resolution::Subsecond)
        }
    };

    let start = Instant::from_calendar(
        year,
        month,
        day,
        hour,
        minute,
        second,
        subnanos / 1_000,
        subnanos % 1_000,
    )?;
    Ok(Partial {
        start,
        end: start.checked_add_delta(TimeDelta::nanoseconds(granule))?,
        resolution,
    })
}

/// Strict ISO-style parser: the engine's default injected parser.
///
/// Partial strings resolve to the start of their span (`"2005"` parses
/// to 2005-01-01T00:00:00); empty, `"NaT"` and `"nan"` parse to NaT.
pub fn parse_instant(text: &str) -> Result<Instant> {
    if is_nat_text(text.trim()) {
        return Ok(Instant::NAT);
    }
    parse_partial(text).map(|p| p.start)
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
