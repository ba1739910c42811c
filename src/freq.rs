// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Frequency resolution: codes → offsets, and offsets ← observed data.
//!
//! # Codes
//!
//! A frequency code is an optional positive multiplier followed by a base
//! code from the canonical table (`B`, `D`, `H`, `T`/`min`, `S`, `L`/`ms`,
//! `U`/`us`, `M`, `MS`, `BM`, `BMS`, `W-MON`…`W-SUN`, `Q-JAN`…, `QS-`,
//! `BQ-`, `BQS-`, `A-JAN`…, `AS-`, `BA-`, `BAS-`, `WOM-1MON`…`WOM-4FRI`).
//! Matching is case-insensitive — `"w-mon"` and `"b"` resolve fine — with
//! one exception inherited from the historical grammar: `"ms"` is
//! milliseconds while `"MS"` is month-start, so that pair is matched
//! before case folding.
//!
//! # Legacy aliases
//!
//! The deprecated rule names (`WEEKDAY`, `EOM`, `W@MON`, `Q@JAN`, …) live
//! in [`LEGACY_ALIASES`], a plain data table consulted before the modern
//! grammar. The offset algebra itself never branches on legacy-ness;
//! [`legacy_code`] is the reverse lookup for callers that still speak the
//! old names.
//!
//! # Inference
//!
//! [`infer`] recovers an offset from an explicit, evenly spaced sequence
//! of instants: a unique pairwise delta yields a tick (or a weekly rule),
//! otherwise every anchored rule consistent with *all* consecutive pairs
//! is a candidate. Exactly one survivor wins; several survivors — rules
//! that agree on the observed points but diverge later — are an
//! [`Error::AmbiguousFrequency`]; none means the spacing is irregular and
//! `None` is returned.

use crate::error::{Error, Result};
use crate::instant::{Instant, NANOS_PER_DAY};
use crate::offset::{Offset, Position, TickUnit, MONTH_CODES, WEEKDAY_CODES};
use chrono::Weekday;

/// Minimum number of points [`infer`] needs.
pub const MIN_INFER_LENGTH: usize = 3;

/// A frequency-like input, resolved once at the boundary.
///
/// Internal code only ever holds a resolved [`Offset`]; this union exists
/// so call sites can pass a code string, a `(multiplier, base)` pair, or
/// an offset interchangeably.
#[derive(Debug, Clone, Copy)]
pub enum FreqSpec<'a> {
    Code(&'a str),
    Scaled(i64, &'a str),
    Offset(Offset),
}

impl<'a> From<&'a str> for FreqSpec<'a> {
    fn from(code: &'a str) -> Self {
        FreqSpec::Code(code)
    }
}

impl<'a> From<(i64, &'a str)> for FreqSpec<'a> {
    fn from((n, code): (i64, &'a str)) -> Self {
        FreqSpec::Scaled(n, code)
    }
}

impl<'a> From<Offset> for FreqSpec<'a> {
    fn from(offset: Offset) -> Self {
        FreqSpec::Offset(offset)
    }
}

/// Deprecated rule names and their modern equivalents. Data, not code:
/// extending or auditing the mapping never touches the offset algebra.
pub const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("WEEKDAY", "B"),
    ("EOM", "BM"),
    ("W@MON", "W-MON"),
    ("W@TUE", "W-TUE"),
    ("W@WED", "W-WED"),
    ("W@THU", "W-THU"),
    ("W@FRI", "W-FRI"),
    ("Q@JAN", "BQ-JAN"),
    ("Q@FEB", "BQ-FEB"),
    ("Q@MAR", "BQ-MAR"),
    ("A@JAN", "BA-JAN"),
    ("A@FEB", "BA-FEB"),
    ("A@MAR", "BA-MAR"),
    ("A@APR", "BA-APR"),
    ("A@MAY", "BA-MAY"),
    ("A@JUN", "BA-JUN"),
    ("A@JUL", "BA-JUL"),
    ("A@AUG", "BA-AUG"),
    ("A@SEP", "BA-SEP"),
    ("A@OCT", "BA-OCT"),
    ("A@NOV", "BA-NOV"),
    ("A@DEC", "BA-DEC"),
    ("WOM@1FRI", "WOM-1FRI"),
    ("WOM@2FRI", "WOM-2FRI"),
    ("WOM@3FRI", "WOM-3FRI"),
    ("WOM@4FRI", "WOM-4FRI"),
];

/// Resolve any frequency-like input to an [`Offset`].
pub fn to_offset<'a>(spec: impl Into<FreqSpec<'a>>) -> Result<Offset> {
    match spec.into() {
        FreqSpec::Offset(offset) => Ok(offset),
        FreqSpec::Code(code) => parse_code(code),
        FreqSpec::Scaled(n, base) => {
            let offset = parse_base(base.trim(), base)?;
            apply_multiplier(offset, n)
        }
    }
}

/// The deprecated name for an offset, if the legacy table has one.
pub fn legacy_code(offset: &Offset) -> Option<&'static str> {
    let modern = offset.to_code();
    LEGACY_ALIASES
        .iter()
        .find(|(_, m)| *m == modern)
        .map(|(old, _)| *old)
}

fn parse_code(code: &str) -> Result<Offset> {
    let s = code.trim();
    if s.is_empty() {
        return Err(Error::InvalidFrequency("empty frequency code".into()));
    }
    if let Some((_, modern)) = LEGACY_ALIASES.iter().find(|(old, _)| *old == s) {
        return parse_code(modern);
    }
    let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let (num, base) = s.split_at(digits);
    if base.is_empty() {
        return Err(Error::InvalidFrequency(s.into()));
    }
    let offset = parse_base(base, s)?;
    if num.is_empty() {
        return Ok(offset);
    }
    let n: i64 = num
        .parse()
        .map_err(|_| Error::InvalidFrequency(s.into()))?;
    apply_multiplier(offset, n)
}

fn apply_multiplier(offset: Offset, n: i64) -> Result<Offset> {
    if n == 1 {
        Ok(offset)
    } else {
        offset.multiply(n)
    }
}

/// Resolve a base code (no multiplier) to its unit offset. `original` is
/// the full input, kept for error messages.
fn parse_base(base: &str, original: &str) -> Result<Offset> {
    // the single case-sensitive pair of the grammar
    if base == "ms" {
        return Ok(Offset::Tick {
            unit: TickUnit::Milli,
            n: 1,
        });
    }
    let up = base.to_ascii_uppercase();
    let simple = match up.as_str() {
        "B" => Some(Offset::business_day()),
        "D" => Some(Offset::day()),
        "H" => Some(Offset::hour()),
        "T" | "MIN" => Some(Offset::minute()),
        "S" => Some(Offset::second()),
        "L" => Some(Offset::Tick {
            unit: TickUnit::Milli,
            n: 1,
        }),
        "U" | "US" => Some(Offset::Tick {
            unit: TickUnit::Micro,
            n: 1,
        }),
        "M" => Some(Offset::month_end()),
        "MS" => Some(Offset::month_begin()),
        "BM" => Some(Offset::business_month_end()),
        "BMS" => Some(Offset::Month {
            position: Position::Begin,
            business: true,
        }),
        "W" => Some(Offset::week(Weekday::Sun)),
        "Q" => Some(Offset::quarter_end(12)),
        "BQ" => Some(Offset::Quarter {
            anchor: 12,
            position: Position::End,
            business: true,
        }),
        "QS" => Some(Offset::Quarter {
            anchor: 1,
            position: Position::Begin,
            business: false,
        }),
        "BQS" => Some(Offset::Quarter {
            anchor: 1,
            position: Position::Begin,
            business: true,
        }),
        "A" => Some(Offset::year_end(12)),
        "BA" => Some(Offset::Year {
            anchor: 12,
            position: Position::End,
            business: true,
        }),
        "AS" => Some(Offset::Year {
            anchor: 1,
            position: Position::Begin,
            business: false,
        }),
        "BAS" => Some(Offset::Year {
            anchor: 1,
            position: Position::Begin,
            business: true,
        }),
        _ => None,
    };
    if let Some(offset) = simple {
        return Ok(offset);
    }

    if let Some(rest) = up.strip_prefix("W-") {
        return Ok(Offset::week(parse_weekday(rest, original)?));
    }
    if let Some(rest) = up.strip_prefix("WOM-") {
        let mut chars = rest.chars();
        let week = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .filter(|w| (1..=4).contains(w))
            .ok_or_else(|| Error::UnknownFrequency(original.into()))?;
        let weekday = parse_weekday(chars.as_str(), original)?;
        return Ok(Offset::week_of_month(week, weekday));
    }
    for (prefix, position, business) in [
        ("BQS-", Position::Begin, true),
        ("BQ-", Position::End, true),
        ("QS-", Position::Begin, false),
        ("Q-", Position::End, false),
    ] {
        if let Some(rest) = up.strip_prefix(prefix) {
            return Ok(Offset::Quarter {
                anchor: parse_month(rest, original)?,
                position,
                business,
            });
        }
    }
    for (prefix, position, business) in [
        ("BAS-", Position::Begin, true),
        ("BA-", Position::End, true),
        ("AS-", Position::Begin, false),
        ("A-", Position::End, false),
    ] {
        if let Some(rest) = up.strip_prefix(prefix) {
            return Ok(Offset::Year {
                anchor: parse_month(rest, original)?,
                position,
                business,
            });
        }
    }
    Err(Error::UnknownFrequency(original.into()))
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn parse_weekday(code: &str, original: &str) -> Result<Weekday> {
    WEEKDAY_CODES
        .iter()
        .position(|&c| c == code)
        .map(|i| WEEKDAYS[i])
        .ok_or_else(|| Error::UnknownFrequency(original.into()))
}

fn parse_month(code: &str, original: &str) -> Result<u32> {
    MONTH_CODES
        .iter()
        .position(|&c| c == code)
        .map(|i| i as u32 + 1)
        .ok_or_else(|| Error::UnknownFrequency(original.into()))
}

// ═══════════════════════════════════════════════════════════════════════════
// Inference
// ═══════════════════════════════════════════════════════════════════════════

/// Infer the offset implied by an evenly spaced sequence.
///
/// Returns `Ok(None)` when the spacing is irregular or non-monotonic,
/// [`Error::InsufficientData`] for fewer than [`MIN_INFER_LENGTH`]
/// points, and [`Error::AmbiguousFrequency`] when several rules fit the
/// observed points but would diverge on later ones.
pub fn infer(values: &[Instant]) -> Result<Option<Offset>> {
    if values.len() < MIN_INFER_LENGTH {
        return Err(Error::InsufficientData {
            len: values.len(),
            min: MIN_INFER_LENGTH,
        });
    }
    if values.iter().any(Instant::is_nat) {
        return Ok(None);
    }
    if values.windows(2).any(|w| w[0].raw() >= w[1].raw()) {
        return Ok(None);
    }

    let deltas: Vec<i64> = values.windows(2).map(|w| w[1].raw() - w[0].raw()).collect();
    if deltas.iter().all(|&d| d == deltas[0]) {
        return Ok(infer_tick(deltas[0], values[0]));
    }

    let survivors: Vec<Offset> = anchored_candidates(values[0])
        .into_iter()
        .filter(|off| fits(off, values))
        .collect();
    match survivors.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        several => {
            let codes: Vec<String> = several.iter().map(Offset::to_code).collect();
            Err(Error::AmbiguousFrequency(codes.join(", ")))
        }
    }
}

/// Like [`infer`] but renders the deprecated rule name, erroring out on
/// irregular input the way the historical API did.
pub fn infer_legacy_rule(values: &[Instant]) -> Result<String> {
    match infer(values)? {
        Some(offset) => Ok(legacy_code(&offset)
            .map(str::to_string)
            .unwrap_or_else(|| offset.to_code())),
        None => Err(Error::AmbiguousFrequency(
            "unable to infer frequency from irregular spacing".into(),
        )),
    }
}

fn infer_tick(delta: i64, first: Instant) -> Option<Offset> {
    const WEEK: i64 = 7 * NANOS_PER_DAY;
    if delta == WEEK {
        return first.chrono_weekday().map(Offset::week);
    }
    for unit in [
        TickUnit::Day,
        TickUnit::Hour,
        TickUnit::Minute,
        TickUnit::Second,
        TickUnit::Milli,
        TickUnit::Micro,
    ] {
        if delta % unit.nanos() == 0 {
            return Some(Offset::Tick {
                unit,
                n: delta / unit.nanos(),
            });
        }
    }
    // spacing below a microsecond is outside the offset taxonomy
    None
}

/// Anchored rules worth testing against a sequence starting at `first`.
fn anchored_candidates(first: Instant) -> Vec<Offset> {
    let mut out = vec![Offset::business_day()];
    for business in [false, true] {
        for position in [Position::Begin, Position::End] {
            out.push(Offset::Month { position, business });
        }
    }
    let month = first.month();
    let day = first.day();
    if month > 0 {
        let anchor = month as u32;
        for business in [false, true] {
            for position in [Position::Begin, Position::End] {
                out.push(Offset::Quarter {
                    anchor,
                    position,
                    business,
                });
                out.push(Offset::Year {
                    anchor,
                    position,
                    business,
                });
            }
        }
    }
    if let Some(weekday) = first.chrono_weekday() {
        out.push(Offset::week(weekday));
        let week = (day - 1) / 7 + 1;
        if (1..=4).contains(&week) {
            out.push(Offset::week_of_month(week as u32, weekday));
        }
    }
    out
}

fn fits(offset: &Offset, values: &[Instant]) -> bool {
    if !offset.is_on_boundary(values[0]) {
        return false;
    }
    values.windows(2).all(|w| {
        offset
            .advance(w[0], 1)
            .map(|next| next.raw() == w[1].raw())
            .unwrap_or(false)
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
