// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Temporal Index Module
//!
//! Nanosecond-precision temporal index primitives: an ordered, possibly
//! duplicated sequence of time points with frequency-aware construction,
//! a reserved "not a time" sentinel, calendar-offset arithmetic,
//! partial-string lookup, frequency inference, set algebra and
//! pad/backfill alignment.
//!
//! # Core types
//!
//! - [`Instant`] — integer-nanosecond time point, or the [`Instant::NAT`] sentinel.
//! - [`Offset`] — a calendar stepping rule (fixed tick or anchored rule).
//! - [`FreqSpec`] — frequency-like input, resolved once at the boundary.
//! - [`TemporalIndex`] — the index: values + optional frequency/timezone.
//! - [`DateRange`] — start/end/periods/freq generator.
//! - [`Loc`] — lookup result: position, contiguous range, or mask.
//! - [`FillMethod`] — alignment fill policy (exact, pad, backfill).
//! - [`Error`] — the crate-wide failure taxonomy.
//!
//! # Frequency codes
//!
//! | Code | Rule |
//! |------|------|
//! | `B` | business day |
//! | `D`, `H`, `T`/`min`, `S`, `L`/`ms`, `U`/`us` | fixed ticks |
//! | `M`, `MS`, `BM`, `BMS` | month end/begin, business variants |
//! | `Q-JAN`…, `QS-`, `BQ-`, `BQS-` | anchored quarters |
//! | `A-JAN`…, `AS-`, `BA-`, `BAS-` | anchored years |
//! | `W-MON`…`W-SUN` | weekly on a fixed weekday |
//! | `WOM-1MON`…`WOM-4FRI` | N-th weekday of month |
//!
//! Deprecated aliases (`WEEKDAY`, `EOM`, `W@MON`, …) resolve through
//! [`freq::LEGACY_ALIASES`] to the same offsets as their modern codes.
//!
//! # Example
//!
//! ```
//! use tempindex::{date_range, Loc};
//!
//! let rng = date_range("2000-01-01", "2000-01-01 00:18", "5min").unwrap();
//! assert_eq!(rng.len(), 4);
//! assert_eq!(rng.get_loc("2000-01-01 00:10").unwrap(), Loc::Single(2));
//! ```

mod align;
mod error;
pub mod freq;
mod index;
mod instant;
mod offset;

// ── Re-exports ────────────────────────────────────────────────────────────

pub use align::FillMethod;
pub use error::{Error, Result};
pub use freq::FreqSpec;
pub use index::{bdate_range, date_range, parse_tz, DateRange, Loc, TemporalIndex};
pub use instant::{parse_instant, Field, Instant, ParseMode};
pub use offset::{Offset, Position, TickUnit};

// Calendar scalars from the underlying calendar crate that appear in
// this crate's public API.
pub use chrono::{TimeDelta, Weekday};
