// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Calendar-arithmetic stepping rules.
//!
//! An [`Offset`] is either a fixed-duration tick (day, hour, minute, …)
//! or an *anchored* rule whose boundaries are defined by the calendar:
//! business days, month/quarter/year ends or begins (optionally business
//! only), a fixed weekday, or the N-th weekday of each month.
//!
//! # Advancing
//!
//! `advance(x, n)` applies the rule `n` times. Anchored rules compute the
//! target boundary in closed form over a month/week grid — there is no
//! day-by-day stepping anywhere in this module, so `advance` terminates
//! in a bounded number of operations for every rule. With `i` the first
//! grid boundary at or after `x`:
//!
//! ```text
//! n = 0            → b(i)                      (rollforward)
//! n > 0, off-grid  → b(i + step·(n − 1))       (the roll counts as one)
//! otherwise        → b(i + step·n)
//! ```
//!
//! Time of day is preserved by every date-anchored rule.
//!
//! The one deliberate exception to "advance makes progress" is
//! [`Offset::MinuteOfHour`], which *replaces* the minute field and never
//! moves the date; range generation guards against it with an iteration
//! cap.

use crate::error::{Error, Result};
use crate::instant::{
    Instant, NANOS_PER_DAY, NANOS_PER_HOUR, NANOS_PER_MICRO, NANOS_PER_MILLI, NANOS_PER_MINUTE,
    NANOS_PER_SECOND,
};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Weekday};
use std::fmt;

/// Whether an anchored rule sits on the first or last day of its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Begin,
    End,
}

/// Fixed-duration units for [`Offset::Tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickUnit {
    Day,
    Hour,
    Minute,
    Second,
    Milli,
    Micro,
}

impl TickUnit {
    /// Length of one unit in nanoseconds.
    pub const fn nanos(self) -> i64 {
        match self {
            TickUnit::Day => NANOS_PER_DAY,
            TickUnit::Hour => NANOS_PER_HOUR,
            TickUnit::Minute => NANOS_PER_MINUTE,
            TickUnit::Second => NANOS_PER_SECOND,
            TickUnit::Milli => NANOS_PER_MILLI,
            TickUnit::Micro => NANOS_PER_MICRO,
        }
    }

    const fn code(self) -> &'static str {
        match self {
            TickUnit::Day => "D",
            TickUnit::Hour => "H",
            TickUnit::Minute => "T",
            TickUnit::Second => "S",
            TickUnit::Milli => "L",
            TickUnit::Micro => "U",
        }
    }
}

/// A calendar-arithmetic stepping rule.
///
/// Offsets are immutable values; two offsets are equal iff they are the
/// same variant with the same parameters. They compose only through
/// repeated application ([`Offset::advance`]), never by merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    /// Fixed stride of `n` ticks.
    Tick { unit: TickUnit, n: i64 },
    /// `n` business days (Monday–Friday).
    BusinessDay { n: i64 },
    /// Month begin/end, optionally restricted to business days.
    Month { position: Position, business: bool },
    /// Quarter begin/end anchored so that `anchor` (1–12) is the final
    /// month of one quarter.
    Quarter {
        anchor: u32,
        position: Position,
        business: bool,
    },
    /// Year begin/end anchored on month `anchor` (1–12).
    Year {
        anchor: u32,
        position: Position,
        business: bool,
    },
    /// Every instant falling on `weekday`.
    Week { weekday: Weekday },
    /// The `week`-th (1–4) `weekday` of each month.
    WeekOfMonth { week: u32, weekday: Weekday },
    /// Replaces the minute field with a fixed value. Pathological on
    /// purpose: it never advances the date.
    MinuteOfHour { minute: u32 },
}

pub(crate) const MONTH_CODES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

pub(crate) const WEEKDAY_CODES: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

pub(crate) fn weekday_code(weekday: Weekday) -> &'static str {
    WEEKDAY_CODES[weekday.num_days_from_monday() as usize]
}

// ── calendar helpers ──────────────────────────────────────────────────────

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
    }
}

fn weekend_to_friday(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - TimeDelta::days(1),
        Weekday::Sun => date - TimeDelta::days(2),
        _ => date,
    }
}

fn weekend_to_monday(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date + TimeDelta::days(2),
        Weekday::Sun => date + TimeDelta::days(1),
        _ => date,
    }
}

fn ymd(year: i64, month: u32, day: u32) -> Result<NaiveDate> {
    let year = i32::try_from(year).map_err(|_| Error::OutOfRange { what: "offset step" })?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or(Error::OutOfRange { what: "offset step" })
}

impl Offset {
    // ── constructors ──────────────────────────────────────────────────

    pub const fn day() -> Self {
        Offset::Tick {
            unit: TickUnit::Day,
            n: 1,
        }
    }

    pub const fn hour() -> Self {
        Offset::Tick {
            unit: TickUnit::Hour,
            n: 1,
        }
    }

    pub const fn minute() -> Self {
        Offset::Tick {
            unit: TickUnit::Minute,
            n: 1,
        }
    }

    pub const fn second() -> Self {
        Offset::Tick {
            unit: TickUnit::Second,
            n: 1,
        }
    }

    pub const fn business_day() -> Self {
        Offset::BusinessDay { n: 1 }
    }

    pub const fn month_end() -> Self {
        Offset::Month {
            position: Position::End,
            business: false,
        }
    }

    pub const fn month_begin() -> Self {
        Offset::Month {
            position: Position::Begin,
            business: false,
        }
    }

    pub const fn business_month_end() -> Self {
        Offset::Month {
            position: Position::End,
            business: true,
        }
    }

    pub const fn quarter_end(anchor: u32) -> Self {
        Offset::Quarter {
            anchor,
            position: Position::End,
            business: false,
        }
    }

    pub const fn year_end(anchor: u32) -> Self {
        Offset::Year {
            anchor,
            position: Position::End,
            business: false,
        }
    }

    pub const fn week(weekday: Weekday) -> Self {
        Offset::Week { weekday }
    }

    pub const fn week_of_month(week: u32, weekday: Weekday) -> Self {
        Offset::WeekOfMonth { week, weekday }
    }

    pub const fn minute_of_hour(minute: u32) -> Self {
        Offset::MinuteOfHour { minute }
    }

    // ── application ───────────────────────────────────────────────────

    /// Apply the rule `n` times (`n` may be negative; `n == 0` rolls
    /// forward to the nearest boundary at or after the instant). NaT in,
    /// NaT out.
    pub fn advance(&self, x: Instant, n: i64) -> Result<Instant> {
        if x.is_nat() {
            return Ok(Instant::NAT);
        }
        match *self {
            Offset::Tick { unit, n: mult } => {
                let stride = unit
                    .nanos()
                    .checked_mul(mult)
                    .and_then(|s| s.checked_mul(n))
                    .ok_or(Error::OutOfRange {
                        what: "offset multiple",
                    })?;
                x.checked_add_delta(TimeDelta::nanoseconds(stride))
            }
            Offset::MinuteOfHour { minute } => {
                let naive = x.naive().expect("checked for NaT above");
                let t = naive.time();
                let replaced =
                    NaiveTime::from_hms_nano_opt(t.hour(), minute, t.second(), t.nanosecond())
                        .ok_or(Error::OutOfRange {
                            what: "minute of hour",
                        })?;
                Instant::from_naive(NaiveDateTime::new(naive.date(), replaced))
            }
            _ => {
                let naive = x.naive().expect("checked for NaT above");
                let date = self.advance_date(naive.date(), n)?;
                Instant::from_naive(NaiveDateTime::new(date, naive.time()))
            }
        }
    }

    /// True iff `advance(x, 0) == x` under the rule's normalization.
    /// Always false for NaT; always true for ticks.
    pub fn is_on_boundary(&self, x: Instant) -> bool {
        if x.is_nat() {
            return false;
        }
        self.advance(x, 0)
            .map(|y| y.raw() == x.raw())
            .unwrap_or(false)
    }

    /// Scale the rule by `k`. Supported for ticks and business days;
    /// anchored rules are not linearly composable.
    pub fn multiply(&self, k: i64) -> Result<Offset> {
        if k < 1 {
            return Err(Error::InvalidFrequency(format!(
                "multiplier must be positive, got {k}"
            )));
        }
        let scaled = |n: i64| {
            n.checked_mul(k).ok_or(Error::OutOfRange {
                what: "offset multiple",
            })
        };
        match *self {
            Offset::Tick { unit, n } => Ok(Offset::Tick {
                unit,
                n: scaled(n)?,
            }),
            Offset::BusinessDay { n } => Ok(Offset::BusinessDay { n: scaled(n)? }),
            _ => Err(Error::InvalidFrequency(format!(
                "{}: anchored offsets do not take a multiplier",
                self.to_code()
            ))),
        }
    }

    /// Canonical frequency code. Inverse of the resolver's `parse` for
    /// every code in the supported table; `MinuteOfHour` has no
    /// parseable code.
    pub fn to_code(&self) -> String {
        fn prefixed(n: i64, base: &str) -> String {
            if n == 1 {
                base.to_string()
            } else {
                format!("{n}{base}")
            }
        }
        match *self {
            Offset::Tick { unit, n } => prefixed(n, unit.code()),
            Offset::BusinessDay { n } => prefixed(n, "B"),
            Offset::Month { position, business } => {
                let mut code = String::new();
                if business {
                    code.push('B');
                }
                code.push('M');
                if position == Position::Begin {
                    code.push('S');
                }
                code
            }
            Offset::Quarter {
                anchor,
                position,
                business,
            } => anchored_code("Q", anchor, position, business),
            Offset::Year {
                anchor,
                position,
                business,
            } => anchored_code("A", anchor, position, business),
            Offset::Week { weekday } => format!("W-{}", weekday_code(weekday)),
            Offset::WeekOfMonth { week, weekday } => {
                format!("WOM-{}{}", week, weekday_code(weekday))
            }
            Offset::MinuteOfHour { minute } => format!("MIN@{minute}"),
        }
    }

    // ── date-level grid arithmetic ────────────────────────────────────

    fn advance_date(&self, date: NaiveDate, n: i64) -> Result<NaiveDate> {
        match *self {
            Offset::BusinessDay { n: mult } => {
                let steps = mult.checked_mul(n).ok_or(Error::OutOfRange {
                    what: "offset multiple",
                })?;
                let dn = date.num_days_from_ce() as i64;
                let wd = date.weekday().num_days_from_monday() as i64;
                // 0001-01-01 (day number 1) is a Monday, so weeks since
                // then and the weekday give a business-day numbering.
                let weeks = (dn - 1 - wd) / 7;
                let (i, on) = if wd <= 4 {
                    (weeks * 5 + wd, true)
                } else {
                    ((weeks + 1) * 5, false)
                };
                let j = if steps > 0 && !on {
                    i + steps - 1
                } else {
                    i + steps
                };
                let dn2 = j.div_euclid(5) * 7 + j.rem_euclid(5) + 1;
                let dn2 = i32::try_from(dn2).map_err(|_| Error::OutOfRange {
                    what: "offset step",
                })?;
                NaiveDate::from_num_days_from_ce_opt(dn2).ok_or(Error::OutOfRange {
                    what: "offset step",
                })
            }
            Offset::Week { weekday } => {
                let dn = date.num_days_from_ce() as i64;
                let wd = date.weekday().num_days_from_monday() as i64;
                let target = weekday.num_days_from_monday() as i64;
                let to_next = (target - wd).rem_euclid(7);
                let steps = if n > 0 && to_next != 0 { n - 1 } else { n };
                let dn2 = dn + to_next + 7 * steps;
                let dn2 = i32::try_from(dn2).map_err(|_| Error::OutOfRange {
                    what: "offset step",
                })?;
                NaiveDate::from_num_days_from_ce_opt(dn2).ok_or(Error::OutOfRange {
                    what: "offset step",
                })
            }
            _ => {
                let step = self.grid_months();
                let anchor_rem = self.grid_anchor_rem();
                let total = date.year() as i64 * 12 + (date.month() as i64 - 1);
                let mut g = total - (total - anchor_rem).rem_euclid(step);
                // The boundary of the grid month at or before `date`'s
                // month can still precede `date` (business rolls, Nth
                // weekdays); at most two bumps reach the next boundary.
                for _ in 0..3 {
                    if self.boundary_in_month(g)? >= date {
                        break;
                    }
                    g += step;
                }
                let on = self.boundary_in_month(g)? == date;
                let j = if n > 0 && !on {
                    g + step * (n - 1)
                } else {
                    g + step * n
                };
                self.boundary_in_month(j)
            }
        }
    }

    /// Grid spacing in months for month-anchored rules.
    fn grid_months(&self) -> i64 {
        match self {
            Offset::Quarter { .. } => 3,
            Offset::Year { .. } => 12,
            _ => 1,
        }
    }

    fn grid_anchor_rem(&self) -> i64 {
        match *self {
            Offset::Quarter { anchor, .. } => (anchor as i64 - 1).rem_euclid(3),
            Offset::Year { anchor, .. } => anchor as i64 - 1,
            _ => 0,
        }
    }

    /// The rule's boundary date within the grid month `total` (counted
    /// in months from year 0).
    fn boundary_in_month(&self, total: i64) -> Result<NaiveDate> {
        let year = total.div_euclid(12);
        let month = (total.rem_euclid(12) + 1) as u32;
        match *self {
            Offset::Month { position, business }
            | Offset::Quarter {
                position, business, ..
            }
            | Offset::Year {
                position, business, ..
            } => {
                let year32 = i32::try_from(year).map_err(|_| Error::OutOfRange {
                    what: "offset step",
                })?;
                match position {
                    Position::Begin => {
                        let first = ymd(year, month, 1)?;
                        Ok(if business {
                            weekend_to_monday(first)
                        } else {
                            first
                        })
                    }
                    Position::End => {
                        let last = ymd(year, month, days_in_month(year32, month))?;
                        Ok(if business { weekend_to_friday(last) } else { last })
                    }
                }
            }
            Offset::WeekOfMonth { week, weekday } => {
                let first = ymd(year, month, 1)?;
                let first_wd = first.weekday().num_days_from_monday() as i64;
                let target = weekday.num_days_from_monday() as i64;
                let day = 1 + (target - first_wd).rem_euclid(7) as u32 + 7 * (week - 1);
                ymd(year, month, day)
            }
            _ => unreachable!("not a month-grid rule"),
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_code())
    }
}

fn anchored_code(letter: &str, anchor: u32, position: Position, business: bool) -> String {
    let mut code = String::new();
    if business {
        code.push('B');
    }
    code.push_str(letter);
    if position == Position::Begin {
        code.push('S');
    }
    code.push('-');
    code.push_str(MONTH_CODES[(anchor as usize - 1) % 12]);
    code
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
