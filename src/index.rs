// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! The temporal index: an ordered, duplicate-permitting sequence of
//! [`Instant`]s with an optional attached frequency and timezone.
//!
//! # Core types
//!
//! - [`TemporalIndex`] — the index itself.
//! - [`DateRange`] — the start/end/periods/freq generator.
//! - [`Loc`] — the result of a label lookup: a single position, a
//!   contiguous range, or a boolean mask.
//!
//! # Invariants
//!
//! If a frequency is attached, every adjacent pair of values satisfies
//! `freq.advance(a, 1) == b`. Every transformation that cannot prove
//! this for its result drops the frequency to `None` rather than carry a
//! stale one. An index is wholly timezone-naive or wholly aware; mixing
//! the two in comparisons or set algebra is a hard error, never a silent
//! coercion.
//!
//! All operations are copy-on-write: the original index is never mutated
//! except for its lazily populated `is_monotonic` / `is_unique` caches,
//! which are write-once cells.

use crate::error::{Error, Result};
use crate::freq::{self, FreqSpec};
use crate::instant::{parse_partial, Field, Instant, ParseMode, Resolution, NANOS_PER_SECOND};
use crate::offset::Offset;
use chrono::{LocalResult, NaiveDateTime, Offset as _, TimeDelta, TimeZone};
use chrono_tz::Tz;
use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::{Add, Range, Sub};

/// Result of a label lookup on a [`TemporalIndex`].
///
/// Callers distinguish the arities by matching: a unique key yields
/// `Single`, a duplicated or partial key on a monotonic index a
/// contiguous `Range`, and a duplicated key on a non-monotonic index a
/// `Mask` over all positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loc {
    Single(usize),
    Range(Range<usize>),
    Mask(Vec<bool>),
}

/// An ordered sequence of instants with optional frequency, timezone
/// and name.
#[derive(Debug, Clone)]
pub struct TemporalIndex {
    values: Vec<Instant>,
    freq: Option<Offset>,
    tz: Option<Tz>,
    name: Option<String>,
    monotonic: OnceCell<bool>,
    unique: OnceCell<bool>,
}

/// Parse a timezone identifier through the zone database collaborator.
pub fn parse_tz(name: &str) -> Result<Tz> {
    if name.eq_ignore_ascii_case("utc") {
        return Ok(Tz::UTC);
    }
    name.parse::<Tz>()
        .map_err(|_| Error::Unparseable(name.to_string()))
}

/// Interpret a wall-clock time in `tz`, erroring on nonexistent local
/// times and taking the earlier of ambiguous ones.
pub(crate) fn localize(naive: NaiveDateTime, tz: Tz) -> Result<Instant> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
            let nanos = dt.timestamp_nanos_opt().ok_or(Error::OutOfRange {
                what: "localized instant",
            })?;
            Ok(Instant::from_nanos(nanos))
        }
        LocalResult::None => Err(Error::Unparseable(format!(
            "{naive} does not exist in zone {}",
            tz.name()
        ))),
    }
}

impl TemporalIndex {
    // ── construction ──────────────────────────────────────────────────

    /// Build from explicit values. Order and duplicates are preserved;
    /// no frequency is attached.
    pub fn from_instants(values: Vec<Instant>) -> Self {
        TemporalIndex {
            values,
            freq: None,
            tz: None,
            name: None,
            monotonic: OnceCell::new(),
            unique: OnceCell::new(),
        }
    }

    /// Build from strings through an injected parser. `Strict` aborts
    /// the whole construction on the first unparseable element,
    /// `Lenient` substitutes NaT per element.
    pub fn from_strs<P>(items: &[&str], parser: P, mode: ParseMode) -> Result<Self>
    where
        P: Fn(&str) -> Result<Instant>,
    {
        let values = items
            .iter()
            .map(|s| match parser(s) {
                Ok(v) => Ok(v),
                Err(e) => match mode {
                    ParseMode::Strict => Err(e),
                    ParseMode::Lenient => Ok(Instant::NAT),
                },
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_instants(values))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a frequency after validating the adjacency invariant
    /// against the values.
    pub fn try_with_freq<'a>(self, spec: impl Into<FreqSpec<'a>>) -> Result<Self> {
        let offset = freq::to_offset(spec)?;
        if !self.values_conform(&self.values, &offset) {
            return Err(Error::InvalidFrequency(format!(
                "frequency {} does not conform to the index values",
                offset.to_code()
            )));
        }
        Ok(TemporalIndex {
            freq: Some(offset),
            ..self
        })
    }

    /// Interpret the (naive) values as wall time in `tz`, producing an
    /// aware index.
    pub fn tz_localize(&self, tz: Tz) -> Result<Self> {
        if self.tz.is_some() {
            return Err(Error::TzMismatch);
        }
        let values = self
            .values
            .iter()
            .map(|v| match v.naive() {
                None => Ok(Instant::NAT),
                Some(naive) => localize(naive, tz),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TemporalIndex {
            values,
            freq: self.freq,
            tz: Some(tz),
            name: self.name.clone(),
            monotonic: OnceCell::new(),
            unique: OnceCell::new(),
        })
    }

    /// New index with the same tz/name but different values; the
    /// caller states which frequency survived.
    fn derive(&self, values: Vec<Instant>, freq: Option<Offset>) -> Self {
        TemporalIndex {
            values,
            freq,
            tz: self.tz,
            name: self.name.clone(),
            monotonic: OnceCell::new(),
            unique: OnceCell::new(),
        }
    }

    // ── accessors ─────────────────────────────────────────────────────

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn values(&self) -> &[Instant] {
        &self.values
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<Instant> {
        self.values.get(i).copied()
    }

    #[inline]
    pub fn first(&self) -> Option<Instant> {
        self.values.first().copied()
    }

    #[inline]
    pub fn last(&self) -> Option<Instant> {
        self.values.last().copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instant> {
        self.values.iter()
    }

    #[inline]
    pub fn freq(&self) -> Option<Offset> {
        self.freq
    }

    /// The attached frequency's canonical code.
    pub fn freq_code(&self) -> Option<String> {
        self.freq.map(|f| f.to_code())
    }

    #[inline]
    pub fn tz(&self) -> Option<Tz> {
        self.tz
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// True iff values are non-decreasing in storage order. Computed at
    /// most once per instance.
    pub fn is_monotonic(&self) -> bool {
        *self
            .monotonic
            .get_or_init(|| self.values.windows(2).all(|w| w[0].raw() <= w[1].raw()))
    }

    /// True iff no value occurs twice. Computed at most once per
    /// instance.
    pub fn is_unique(&self) -> bool {
        *self.unique.get_or_init(|| {
            let mut seen = HashSet::with_capacity(self.values.len());
            self.values.iter().all(|v| seen.insert(v.raw()))
        })
    }

    /// The attached frequency, or one recovered by inference. Never
    /// attaches the inferred value to the index.
    pub fn inferred_freq(&self) -> Option<Offset> {
        self.freq.or_else(|| freq::infer(&self.values).ok().flatten())
    }

    /// Raw value equality (tz-sensitive, frequency- and name-blind).
    pub fn equals(&self, other: &Self) -> bool {
        self.tz == other.tz
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.raw() == b.raw())
    }

    /// Extract a calendar field for every element (`-1` for NaT). On an
    /// aware index fields are wall-clock in the index's zone.
    pub fn field_values(&self, field: Field) -> Vec<i64> {
        self.values
            .iter()
            .map(|v| self.to_wall(*v).field(field))
            .collect()
    }

    // ── timezone plumbing ─────────────────────────────────────────────

    /// Shift a stored (UTC) instant onto the wall clock of the index's
    /// zone; identity for naive indices and NaT.
    fn to_wall(&self, v: Instant) -> Instant {
        match self.tz {
            None => v,
            Some(tz) => match v.naive() {
                None => Instant::NAT,
                Some(naive) => {
                    let secs = tz.offset_from_utc_datetime(&naive).fix().local_minus_utc();
                    Instant::from_nanos(v.raw() + secs as i64 * NANOS_PER_SECOND)
                }
            },
        }
    }

    /// Inverse of [`Self::to_wall`].
    fn from_wall(&self, v: Instant) -> Result<Instant> {
        match self.tz {
            None => Ok(v),
            Some(tz) => match v.naive() {
                None => Ok(Instant::NAT),
                Some(naive) => localize(naive, tz),
            },
        }
    }

    fn check_tz(&self, other: &Self) -> Result<()> {
        match (self.tz, other.tz) {
            (None, None) => Ok(()),
            (Some(a), Some(b)) if a == b => Ok(()),
            _ => Err(Error::TzMismatch),
        }
    }

    /// Apply an offset on the wall clock of the index.
    fn advance_wall(&self, v: Instant, offset: &Offset, n: i64) -> Result<Instant> {
        if self.tz.is_none() {
            return offset.advance(v, n);
        }
        let moved = offset.advance(self.to_wall(v), n)?;
        self.from_wall(moved)
    }

    /// Whether `values` satisfy the adjacency invariant under `offset`,
    /// measured on the wall clock.
    fn values_conform(&self, values: &[Instant], offset: &Offset) -> bool {
        values.windows(2).all(|w| {
            let (a, b) = (self.to_wall(w[0]), self.to_wall(w[1]));
            if a.is_nat() || b.is_nat() {
                return false;
            }
            offset
                .advance(a, 1)
                .map(|next| next.raw() == b.raw())
                .unwrap_or(false)
        })
    }

    // ── lookup ────────────────────────────────────────────────────────

    /// Count of values strictly below `raw` (monotonic index only).
    fn lower_bound(&self, raw: i64) -> usize {
        self.values.partition_point(|v| v.raw() < raw)
    }

    fn locate_exact(&self, raw: i64) -> Option<Loc> {
        if self.is_monotonic() {
            let lo = self.lower_bound(raw);
            let hi = self.values.partition_point(|v| v.raw() <= raw);
            match hi - lo {
                0 => None,
                1 => Some(Loc::Single(lo)),
                _ => Some(Loc::Range(lo..hi)),
            }
        } else {
            let mask: Vec<bool> = self.values.iter().map(|v| v.raw() == raw).collect();
            match mask.iter().filter(|&&m| m).count() {
                0 => None,
                1 => Some(Loc::Single(mask.iter().position(|&m| m).expect("one match"))),
                _ => Some(Loc::Mask(mask)),
            }
        }
    }

    /// Locate an exact instant key. Duplicates yield a `Range` (or a
    /// `Mask` on a non-monotonic index); a miss is a
    /// [`Error::KeyNotFound`] embedding the key.
    pub fn get_loc_instant(&self, key: Instant) -> Result<Loc> {
        self.locate_exact(key.raw())
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    /// Locate a (possibly partial) string key.
    ///
    /// On a monotonic index the key's span is resolved to the
    /// contiguous run of matching values — a year string matches the
    /// whole year, a date string every value on that date. On a
    /// non-monotonic index only exact keys are admissible; a partial
    /// key cannot guarantee contiguity and fails.
    pub fn get_loc(&self, key: &str) -> Result<Loc> {
        let partial = parse_partial(key).map_err(|_| Error::KeyNotFound(key.to_string()))?;
        let (start, end) = self.localized_span(partial.start, partial.end)?;
        if self.is_monotonic() {
            let lo = self.lower_bound(start.raw());
            let hi = self.lower_bound(end.raw());
            return match hi - lo {
                0 => Err(Error::KeyNotFound(key.to_string())),
                1 => Ok(Loc::Single(lo)),
                _ => Ok(Loc::Range(lo..hi)),
            };
        }
        // Coarse keys denote a span and cannot guarantee contiguity on
        // an unordered index; day-or-finer keys degrade to an exact
        // lookup of the span start.
        if matches!(
            partial.resolution,
            Resolution::Year | Resolution::Quarter | Resolution::Month
        ) {
            return Err(Error::NonMonotonic("partial-string lookup"));
        }
        self.locate_exact(start.raw())
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    /// A parsed span, moved from wall clock to storage clock for aware
    /// indices.
    fn localized_span(&self, start: Instant, end: Instant) -> Result<(Instant, Instant)> {
        Ok((self.from_wall(start)?, self.from_wall(end)?))
    }

    /// Resolve a label range to half-open positions. Both bounds are
    /// inclusive and may be partial-precision labels: a month string as
    /// the upper bound covers through the end of that month.
    pub fn slice_locs(&self, start: Option<&str>, end: Option<&str>) -> Result<(usize, usize)> {
        if !self.is_monotonic() {
            return Err(Error::NonMonotonic("label slicing"));
        }
        let lo = match start {
            None => 0,
            Some(label) => {
                let p = parse_partial(label)?;
                self.lower_bound(self.from_wall(p.start)?.raw())
            }
        };
        let hi = match end {
            None => self.len(),
            Some(label) => {
                let p = parse_partial(label)?;
                self.lower_bound(self.from_wall(p.end)?.raw())
            }
        };
        Ok((lo, hi))
    }

    /// Label-range slice (inclusive bounds, partial labels allowed).
    /// The attached frequency survives: a label slice is contiguous.
    pub fn slice_range(&self, start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let (lo, hi) = self.slice_locs(start, end)?;
        Ok(self.derive(self.values[lo..hi.max(lo)].to_vec(), self.freq))
    }

    // ── positional views ──────────────────────────────────────────────

    /// Positional slice; contiguous, so the frequency survives.
    pub fn slice(&self, range: Range<usize>) -> Self {
        self.derive(self.values[range].to_vec(), self.freq)
    }

    /// Arbitrary positional selection. The frequency survives only when
    /// the selected values still satisfy the adjacency invariant.
    pub fn take(&self, indices: &[usize]) -> Result<Self> {
        let values = indices
            .iter()
            .map(|&i| {
                self.values.get(i).copied().ok_or(Error::OutOfRange {
                    what: "take position",
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let kept = self.freq.filter(|f| self.values_conform(&values, f));
        Ok(self.derive(values, kept))
    }

    /// Boolean-mask selection; a contiguous mask preserves the
    /// frequency, anything gappy drops it (checked, not assumed).
    pub fn select_mask(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.len() {
            return Err(Error::OutOfRange {
                what: "mask length",
            });
        }
        let values: Vec<Instant> = self
            .values
            .iter()
            .zip(mask)
            .filter_map(|(v, &keep)| keep.then_some(*v))
            .collect();
        let kept = self.freq.filter(|f| self.values_conform(&values, f));
        Ok(self.derive(values, kept))
    }

    // ── set algebra ───────────────────────────────────────────────────

    /// Setwise union, sorted ascending and deduplicated. A union with
    /// an empty operand returns the other side verbatim. The shared (or
    /// single-sided) frequency is carried only when the merged values
    /// still form one unbroken grid.
    pub fn union(&self, other: &Self) -> Result<Self> {
        self.check_tz(other)?;
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }
        let merged = if self.is_monotonic() && other.is_monotonic() {
            merge_union(&self.values, &other.values)
        } else {
            let mut all = self.values.clone();
            all.extend_from_slice(&other.values);
            sorted_unique(all)
        };
        let kept = self.carried_freq(other, &merged);
        Ok(self.derive(merged, kept))
    }

    /// Setwise intersection, sorted ascending.
    pub fn intersection(&self, other: &Self) -> Result<Self> {
        self.check_tz(other)?;
        let a = self.sorted_values();
        let b = other.sorted_values();
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].raw().cmp(&b[j].raw()) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    out.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        let kept = self.carried_freq(other, &out);
        Ok(self.derive(out, kept))
    }

    /// Setwise difference (`self` minus `other`), sorted ascending.
    pub fn difference(&self, other: &Self) -> Result<Self> {
        self.check_tz(other)?;
        let a = self.sorted_values();
        let b = other.sorted_values();
        let mut out = Vec::new();
        let mut j = 0;
        for v in a {
            while j < b.len() && b[j].raw() < v.raw() {
                j += 1;
            }
            if j >= b.len() || b[j].raw() != v.raw() {
                out.push(v);
            }
        }
        let kept = self.freq.filter(|f| self.values_conform(&out, f));
        Ok(self.derive(out, kept))
    }

    fn sorted_values(&self) -> Vec<Instant> {
        if self.is_monotonic() && self.is_unique() {
            self.values.clone()
        } else {
            sorted_unique(self.values.clone())
        }
    }

    fn carried_freq(&self, other: &Self, values: &[Instant]) -> Option<Offset> {
        let f = match (self.freq, other.freq) {
            (Some(a), Some(b)) => {
                if a == b {
                    a
                } else {
                    return None;
                }
            }
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => return None,
        };
        self.values_conform(values, &f).then_some(f)
    }

    // ── transformations ───────────────────────────────────────────────

    /// Advance every element `n` steps by the attached frequency.
    pub fn shift(&self, n: i64) -> Result<Self> {
        match self.freq {
            Some(f) => self.shift_by(n, f),
            None => Err(Error::NullFrequency),
        }
    }

    /// Advance every element `n` steps by an explicit frequency.
    pub fn shift_by<'a>(&self, n: i64, spec: impl Into<FreqSpec<'a>>) -> Result<Self> {
        let offset = freq::to_offset(spec)?;
        let values = self
            .values
            .iter()
            .map(|v| self.advance_wall(*v, &offset, n))
            .collect::<Result<Vec<_>>>()?;
        let kept = self.freq.filter(|f| self.values_conform(&values, f));
        Ok(self.derive(values, kept))
    }

    /// Map every element to the nearest boundary of `spec`, breaking
    /// exact ties toward the later boundary. The snap frequency is
    /// attached only when the snapped values actually form its grid.
    pub fn snap<'a>(&self, spec: impl Into<FreqSpec<'a>>) -> Result<Self> {
        let offset = freq::to_offset(spec)?;
        let mut out = Vec::with_capacity(self.len());
        for &v in &self.values {
            if v.is_nat() {
                out.push(v);
                continue;
            }
            let wall = self.to_wall(v);
            let snapped = if offset.is_on_boundary(wall) {
                wall
            } else {
                let before = offset.advance(wall, -1)?;
                let after = offset.advance(wall, 0)?;
                if wall.raw() - before.raw() < after.raw() - wall.raw() {
                    before
                } else {
                    after
                }
            };
            out.push(self.from_wall(snapped)?);
        }
        let kept = Some(offset).filter(|f| self.values_conform(&out, f));
        Ok(self.derive(out, kept))
    }

    /// Positional insert. The frequency survives only when the new
    /// value sits on the grid at that position.
    pub fn insert(&self, pos: usize, value: Instant) -> Result<Self> {
        if pos > self.len() {
            return Err(Error::OutOfRange {
                what: "insert position",
            });
        }
        let mut values = self.values.clone();
        values.insert(pos, value);
        let kept = self.freq.filter(|f| self.values_conform(&values, f));
        Ok(self.derive(values, kept))
    }

    /// Tile the whole sequence `n` times. Repetition breaks strict
    /// spacing, so the frequency is dropped unless `n == 1`.
    pub fn repeat(&self, n: usize) -> Self {
        if n == 1 {
            return self.clone();
        }
        let mut values = Vec::with_capacity(self.len() * n);
        for _ in 0..n {
            values.extend_from_slice(&self.values);
        }
        self.derive(values, None)
    }

    /// Distinct values that occur more than once, in first-occurrence
    /// order.
    pub fn get_duplicates(&self) -> Vec<Instant> {
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for v in &self.values {
            *counts.entry(v.raw()).or_insert(0) += 1;
        }
        let mut emitted = HashSet::new();
        self.values
            .iter()
            .filter(|v| counts[&v.raw()] > 1 && emitted.insert(v.raw()))
            .copied()
            .collect()
    }

    /// First occurrences of the distinct values, original order.
    pub fn unique(&self) -> Self {
        if self.is_unique() {
            return self.clone();
        }
        let mut seen = HashSet::new();
        let values: Vec<Instant> = self
            .values
            .iter()
            .filter(|v| seen.insert(v.raw()))
            .copied()
            .collect();
        self.derive(values, None)
    }

    /// Position of the earliest non-NaT value (first on ties).
    pub fn argmin(&self) -> Option<usize> {
        let mut best: Option<(usize, i64)> = None;
        for (i, v) in self.values.iter().enumerate() {
            if v.is_nat() {
                continue;
            }
            if best.map_or(true, |(_, raw)| v.raw() < raw) {
                best = Some((i, v.raw()));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Position of the latest non-NaT value (first on ties).
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, i64)> = None;
        for (i, v) in self.values.iter().enumerate() {
            if v.is_nat() {
                continue;
            }
            if best.map_or(true, |(_, raw)| v.raw() > raw) {
                best = Some((i, v.raw()));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Ascending copy plus the permutation that produces it.
    pub fn sort(&self) -> (Self, Vec<usize>) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.values[i].raw());
        let values: Vec<Instant> = order.iter().map(|&i| self.values[i]).collect();
        let kept = self.freq.filter(|f| self.values_conform(&values, f));
        (self.derive(values, kept), order)
    }

    /// Truncate every element to midnight (wall-clock midnight on an
    /// aware index).
    pub fn normalize(&self) -> Result<Self> {
        let values = self
            .values
            .iter()
            .map(|v| self.from_wall(self.to_wall(*v).normalize()))
            .collect::<Result<Vec<_>>>()?;
        let kept = self.freq.filter(|f| self.values_conform(&values, f));
        Ok(self.derive(values, kept))
    }
}

impl PartialEq for TemporalIndex {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl std::ops::Index<usize> for TemporalIndex {
    type Output = Instant;

    fn index(&self, i: usize) -> &Instant {
        &self.values[i]
    }
}

impl<'a> IntoIterator for &'a TemporalIndex {
    type Item = &'a Instant;
    type IntoIter = std::slice::Iter<'a, Instant>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Translate every element by a fixed duration. Tick frequencies are
/// translation-invariant and survive; anchored frequencies are
/// re-validated and dropped when the shifted values leave their grid.
///
/// Panics when any element leaves the representable span.
impl Add<TimeDelta> for &TemporalIndex {
    type Output = TemporalIndex;

    fn add(self, rhs: TimeDelta) -> TemporalIndex {
        let values: Vec<Instant> = self
            .values
            .iter()
            .map(|v| {
                v.checked_add_delta(rhs)
                    .expect("instant out of representable range")
            })
            .collect();
        let kept = self.freq.filter(|f| {
            matches!(f, Offset::Tick { .. }) || self.values_conform(&values, f)
        });
        self.derive(values, kept)
    }
}

impl Sub<TimeDelta> for &TemporalIndex {
    type Output = TemporalIndex;

    fn sub(self, rhs: TimeDelta) -> TemporalIndex {
        self + (-rhs)
    }
}

impl fmt::Display for TemporalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TemporalIndex[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")?;
        if let Some(code) = self.freq_code() {
            write!(f, " freq={code}")?;
        }
        if let Some(tz) = self.tz {
            write!(f, " tz={}", tz.name())?;
        }
        Ok(())
    }
}

fn sorted_unique(mut values: Vec<Instant>) -> Vec<Instant> {
    values.sort_by(Instant::cmp_raw);
    values.dedup_by(|a, b| a.raw() == b.raw());
    values
}

fn merge_union(a: &[Instant], b: &[Instant]) -> Vec<Instant> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        let take_a = j >= b.len() || (i < a.len() && a[i].raw() <= b[j].raw());
        let v = if take_a {
            let v = a[i];
            i += 1;
            v
        } else {
            let v = b[j];
            j += 1;
            v
        };
        if out.last().map_or(true, |last: &Instant| last.raw() != v.raw()) {
            out.push(v);
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════
// Range generation
// ═══════════════════════════════════════════════════════════════════════════

/// Iteration guard for range generation: an offset that fails to make
/// progress (or a run past this cap) aborts with
/// [`Error::InfiniteLoop`].
const MAX_RANGE_STEPS: usize = 100_000;

/// Generator for regular indices.
///
/// Exactly two of `start`, `end` and `periods` must be given — all
/// three, or fewer than two, fail ([`Error::Unspecified`]); an explicit
/// `freq` never counts toward the two. A fractional `periods` is floored
/// (documented historical quirk: `10.5` means `10`).
///
/// ```
/// use tempindex::{parse_instant, DateRange, Offset};
///
/// let idx = DateRange {
///     start: Some(parse_instant("2000-01-01").unwrap()),
///     periods: Some(3.0),
///     freq: Some(Offset::business_day()),
///     ..Default::default()
/// }
/// .build()
/// .unwrap();
/// assert_eq!(idx.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DateRange {
    pub start: Option<Instant>,
    pub end: Option<Instant>,
    pub periods: Option<f64>,
    /// Stepping rule; defaults to calendar days.
    pub freq: Option<Offset>,
    pub tz: Option<Tz>,
    /// Truncate `start`/`end` to midnight before generating.
    pub normalize: bool,
    pub name: Option<String>,
}

impl DateRange {
    pub fn build(&self) -> Result<TemporalIndex> {
        let given = self.start.is_some() as u8 + self.end.is_some() as u8
            + self.periods.is_some() as u8;
        if given != 2 {
            return Err(Error::Unspecified);
        }
        let offset = self.freq.unwrap_or_else(Offset::day);
        let norm = |v: Option<Instant>| {
            if self.normalize {
                v.map(|x| x.normalize())
            } else {
                v
            }
        };
        let (start, end) = (norm(self.start), norm(self.end));
        let periods = self.periods.map(|p| p.floor() as i64);

        let mut out: Vec<Instant> = Vec::new();
        match (start, end, periods) {
            (Some(s), Some(e), None) => {
                let mut cur = offset.advance(s, 0)?;
                let mut steps = 0usize;
                while !cur.is_nat() && cur.raw() <= e.raw() {
                    out.push(cur);
                    steps += 1;
                    if steps > MAX_RANGE_STEPS {
                        return Err(Error::InfiniteLoop {
                            iterations: MAX_RANGE_STEPS,
                        });
                    }
                    let next = offset.advance(cur, 1)?;
                    if next.raw() <= cur.raw() {
                        return Err(Error::InfiniteLoop { iterations: steps });
                    }
                    cur = next;
                }
            }
            (Some(s), None, Some(p)) => {
                let mut cur = offset.advance(s, 0)?;
                for step in 0..p.max(0) {
                    out.push(cur);
                    let next = offset.advance(cur, 1)?;
                    if next.raw() <= cur.raw() && step + 1 < p {
                        return Err(Error::InfiniteLoop {
                            iterations: step as usize + 1,
                        });
                    }
                    cur = next;
                }
            }
            (None, Some(e), Some(p)) => {
                let mut cur = if offset.is_on_boundary(e) {
                    e
                } else {
                    offset.advance(e, -1)?
                };
                for step in 0..p.max(0) {
                    out.push(cur);
                    let prev = offset.advance(cur, -1)?;
                    if prev.raw() >= cur.raw() && step + 1 < p {
                        return Err(Error::InfiniteLoop {
                            iterations: step as usize + 1,
                        });
                    }
                    cur = prev;
                }
                out.reverse();
            }
            _ => unreachable!("exactly two of start/end/periods checked above"),
        }

        let (values, tz) = match self.tz {
            None => (out, None),
            Some(tz) => {
                let localized = out
                    .iter()
                    .map(|v| localize(v.naive().expect("generated values are not NaT"), tz))
                    .collect::<Result<Vec<_>>>()?;
                (localized, Some(tz))
            }
        };
        Ok(TemporalIndex {
            values,
            freq: Some(offset),
            tz,
            name: self.name.clone(),
            monotonic: OnceCell::new(),
            unique: OnceCell::new(),
        })
    }
}

/// Regular index between two labels (inclusive), default daily.
pub fn date_range<'a>(start: &str, end: &str, spec: impl Into<FreqSpec<'a>>) -> Result<TemporalIndex> {
    DateRange {
        start: Some(crate::instant::parse_instant(start)?),
        end: Some(crate::instant::parse_instant(end)?),
        freq: Some(freq::to_offset(spec)?),
        ..Default::default()
    }
    .build()
}

/// Business-day index between two labels (inclusive).
pub fn bdate_range(start: &str, end: &str) -> Result<TemporalIndex> {
    date_range(start, end, Offset::business_day())
}

// ═══════════════════════════════════════════════════════════════════════════
// Persisted representation
// ═══════════════════════════════════════════════════════════════════════════

// The on-disk shape is `{values, offset_code, tz, name}` with the
// frequency as its canonical code; deserialization re-parses the code
// through the resolver (legacy aliases included), so a reconstructed
// index is behaviorally identical to a freshly generated one.
#[cfg(feature = "serde")]
mod serde_impls {
    use super::*;
    use serde::de::Error as _;
    use serde::ser::SerializeStruct;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for TemporalIndex {
        fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut s = serializer.serialize_struct("TemporalIndex", 4)?;
            let raw: Vec<i64> = self.values.iter().map(Instant::raw).collect();
            s.serialize_field("values", &raw)?;
            s.serialize_field("offset_code", &self.freq_code())?;
            s.serialize_field("tz", &self.tz.map(|t| t.name().to_string()))?;
            s.serialize_field("name", &self.name)?;
            s.end()
        }
    }

    impl<'de> Deserialize<'de> for TemporalIndex {
        fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            #[derive(Deserialize)]
            struct Raw {
                values: Vec<i64>,
                offset_code: Option<String>,
                tz: Option<String>,
                name: Option<String>,
            }

            let raw = Raw::deserialize(deserializer)?;
            let freq = raw
                .offset_code
                .map(|code| freq::to_offset(code.as_str()))
                .transpose()
                .map_err(D::Error::custom)?;
            let tz = raw
                .tz
                .map(|t| parse_tz(&t))
                .transpose()
                .map_err(D::Error::custom)?;
            Ok(TemporalIndex {
                values: raw.values.into_iter().map(Instant::from_nanos).collect(),
                freq,
                tz,
                name: raw.name,
                monotonic: OnceCell::new(),
                unique: OnceCell::new(),
            })
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instant::parse_instant;

    fn ts(text: &str) -> Instant {
        parse_instant(text).unwrap()
    }

    fn index_of(texts: &[&str]) -> TemporalIndex {
        TemporalIndex::from_strs(texts, parse_instant, ParseMode::Strict).unwrap()
    }

    /// The duplicated fixture the duplicate-lookup contract is written
    /// against: three days three times each, then a lone fourth.
    fn dup_index() -> TemporalIndex {
        index_of(&[
            "2000-01-02",
            "2000-01-02",
            "2000-01-02",
            "2000-01-03",
            "2000-01-03",
            "2000-01-03",
            "2000-01-04",
            "2000-01-04",
            "2000-01-04",
            "2000-01-05",
        ])
    }

    #[test]
    fn strict_construction_aborts_on_bad_element() {
        let err = TemporalIndex::from_strs(
            &["2005-01-01", "2005-01-02", "Jn 3, 2005", "2005-01-04"],
            parse_instant,
            ParseMode::Strict,
        );
        assert!(err.is_err());
    }

    #[test]
    fn lenient_construction_substitutes_nat() {
        let idx = TemporalIndex::from_strs(
            &["2000-01-01", "bogus", "2000-01-04"],
            parse_instant,
            ParseMode::Lenient,
        )
        .unwrap();
        assert_eq!(idx.len(), 3);
        assert!(idx[1].is_nat());
        assert_eq!(idx.field_values(Field::Year), vec![2000, -1, 2000]);
    }

    #[test]
    fn monotonic_and_unique_flags() {
        let idx = dup_index();
        assert!(idx.is_monotonic());
        assert!(!idx.is_unique());
        let idx = index_of(&["2000-01-04", "2000-01-01", "2000-01-02"]);
        assert!(!idx.is_monotonic());
        assert!(idx.is_unique());
    }

    #[test]
    fn generator_counts_points() {
        let rng = date_range("2000-01-01 00:00", "2000-01-01 00:18", "5min").unwrap();
        assert_eq!(rng.len(), 4);
        assert_eq!(rng[3], ts("2000-01-01 00:15"));
        assert_eq!(rng.freq_code().as_deref(), Some("5T"));
    }

    #[test]
    fn generator_requires_two_of_three() {
        let base = DateRange {
            start: Some(ts("2000-01-01")),
            ..Default::default()
        };
        assert!(matches!(base.build(), Err(Error::Unspecified)));
        let ends_only = DateRange {
            end: Some(ts("2000-01-01")),
            ..Default::default()
        };
        assert!(matches!(ends_only.build(), Err(Error::Unspecified)));
        // an explicit freq never counts toward the two
        let freq_and_periods = DateRange {
            periods: Some(10.0),
            freq: Some(Offset::hour()),
            ..Default::default()
        };
        assert!(matches!(freq_and_periods.build(), Err(Error::Unspecified)));
        let all_three = DateRange {
            start: Some(ts("2000-01-01")),
            end: Some(ts("2000-02-01")),
            periods: Some(5.0),
            ..Default::default()
        };
        assert!(matches!(all_three.build(), Err(Error::Unspecified)));
    }

    #[test]
    fn generator_floors_fractional_periods() {
        let rng = DateRange {
            start: Some(ts("2000-01-01")),
            periods: Some(10.5),
            ..Default::default()
        }
        .build()
        .unwrap();
        assert_eq!(rng.len(), 10);
    }

    #[test]
    fn generator_anchored_backward_from_end() {
        let rng = DateRange {
            end: Some(ts("2000-01-01")),
            periods: Some(20.0),
            freq: Some(freq::to_offset("5D").unwrap()),
            ..Default::default()
        }
        .build()
        .unwrap();
        assert_eq!(rng.len(), 20);
        assert_eq!(rng.last().unwrap(), ts("2000-01-01"));
        assert_eq!(rng.freq_code().as_deref(), Some("5D"));
    }

    #[test]
    fn generator_rolls_start_onto_grid() {
        // 1999-12-25 is a Saturday; the first business day is Monday the 27th.
        let rng = DateRange {
            start: Some(ts("1999-12-25")),
            periods: Some(20.0),
            freq: Some(Offset::business_day()),
            ..Default::default()
        }
        .build()
        .unwrap();
        assert_eq!(rng[0], ts("1999-12-27"));
        assert_eq!(rng.len(), 20);
    }

    #[test]
    fn generator_catches_non_advancing_offset() {
        let res = DateRange {
            start: Some(ts("2011-11-11")),
            end: Some(ts("2011-11-12")),
            freq: Some(Offset::minute_of_hour(5)),
            ..Default::default()
        }
        .build();
        assert!(matches!(res, Err(Error::InfiniteLoop { .. })));
    }

    #[test]
    fn generator_normalize_floors_bounds() {
        let rng = DateRange {
            start: Some(ts("2000-01-01 08:15")),
            periods: Some(3.0),
            normalize: true,
            ..Default::default()
        }
        .build()
        .unwrap();
        assert_eq!(rng[0], ts("2000-01-01"));
        // without normalize, the time of day rides along
        let rng = DateRange {
            start: Some(ts("2000-01-01 08:15")),
            periods: Some(3.0),
            freq: Some(Offset::business_day()),
            ..Default::default()
        }
        .build()
        .unwrap();
        assert!(rng.iter().all(|v| v.hour() == 8 && v.minute() == 15));
    }

    #[test]
    fn get_loc_arities_on_duplicates() {
        let idx = dup_index();
        assert_eq!(
            idx.get_loc_instant(ts("2000-01-05")).unwrap(),
            Loc::Single(9)
        );
        assert_eq!(
            idx.get_loc_instant(ts("2000-01-02")).unwrap(),
            Loc::Range(0..3)
        );
        let err = idx.get_loc_instant(ts("2000-01-06")).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(_)));
    }

    #[test]
    fn key_error_embeds_the_key() {
        let idx = index_of(&["2000-01-03"]);
        let err = idx.get_loc("2000-01-01").unwrap_err();
        assert!(err.to_string().contains("2000-01-01"), "{err}");
        let err = idx.get_loc_instant(ts("1999-05-05")).unwrap_err();
        assert!(err.to_string().contains("1999-05-05"), "{err}");
    }

    #[test]
    fn partial_year_lookup_is_a_contiguous_slice() {
        let rng = date_range("2000-01-01", "2010-01-01", "D").unwrap();
        assert_eq!(rng.get_loc("2009").unwrap(), Loc::Range(3288..3653));
    }

    #[test]
    fn partial_month_and_quarter_lookup() {
        let rng = DateRange {
            start: Some(ts("2005-01-01")),
            periods: Some(500.0),
            ..Default::default()
        }
        .build()
        .unwrap();
        match rng.get_loc("2005-11").unwrap() {
            Loc::Range(r) => assert_eq!(r.len(), 30),
            other => panic!("expected range, got {other:?}"),
        }

        let rng = DateRange {
            start: Some(ts("2000-06-01")),
            periods: Some(500.0),
            ..Default::default()
        }
        .build()
        .unwrap();
        for key in ["2001Q1", "1Q01"] {
            match rng.get_loc(key).unwrap() {
                Loc::Range(r) => assert_eq!(r.len(), 90, "{key}"),
                other => panic!("expected range for {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn partial_lookup_requires_monotonicity() {
        let idx = index_of(&["2005-03-01", "2005-01-01", "2005-02-01"]);
        assert!(matches!(
            idx.get_loc("2005"),
            Err(Error::NonMonotonic(_))
        ));
        // exact keys still work on a shuffled index
        assert_eq!(idx.get_loc("2005-01-01").unwrap(), Loc::Single(1));
    }

    #[test]
    fn duplicate_exact_key_on_shuffled_index_is_a_mask() {
        let idx = index_of(&["2000-01-02", "2000-01-01", "2000-01-02"]);
        assert_eq!(
            idx.get_loc_instant(ts("2000-01-02")).unwrap(),
            Loc::Mask(vec![true, false, true])
        );
    }

    #[test]
    fn label_slice_with_partial_bounds() {
        let rng = DateRange {
            start: Some(ts("2005-01-01")),
            periods: Some(500.0),
            ..Default::default()
        }
        .build()
        .unwrap();
        let by_month = rng.slice_locs(Some("2005-05"), Some("2006-02")).unwrap();
        let by_day = rng
            .slice_locs(Some("2005-05-01"), Some("2006-02-28"))
            .unwrap();
        assert_eq!(by_month, by_day);

        let open_end = rng.slice_locs(Some("2005-05"), None).unwrap();
        assert_eq!(open_end.1, rng.len());

        let sliced = rng.slice_range(Some("2005-05"), Some("2006-02")).unwrap();
        assert_eq!(sliced.freq_code().as_deref(), Some("D"));
        assert_eq!(sliced.first().unwrap(), ts("2005-05-01"));
    }

    #[test]
    fn range_slice_with_duplicate_bounds() {
        let idx = index_of(&[
            "2000-01-01",
            "2000-01-02",
            "2000-01-02",
            "2000-01-03",
            "2000-01-04",
        ]);
        let (lo, hi) = idx.slice_locs(Some("2000-01-02"), None).unwrap();
        assert_eq!((lo, hi), (1, 5));
        let (lo, hi) = idx
            .slice_locs(Some("2000-01-02"), Some("2000-01-03"))
            .unwrap();
        assert_eq!((lo, hi), (1, 4));
    }

    #[test]
    fn union_of_overlapping_ranges_keeps_freq() {
        let rng = date_range("2000-01-01", "2002-01-01", "D").unwrap();
        let result = rng.slice(0..50).union(&rng.slice(50..100)).unwrap();
        assert_eq!(result.freq_code().as_deref(), Some("D"));
        let result = rng.slice(0..50).union(&rng.slice(30..100)).unwrap();
        assert_eq!(result.freq_code().as_deref(), Some("D"));
        assert_eq!(result.len(), 100);
    }

    #[test]
    fn union_across_a_gap_drops_freq() {
        let rng = date_range("2000-01-01", "2002-01-01", "D").unwrap();
        let result = rng.slice(0..50).union(&rng.slice(60..100)).unwrap();
        assert!(result.freq().is_none());
    }

    #[test]
    fn union_with_empty_is_identity() {
        let rng = date_range("2001-01-01", "2001-02-01", "D").unwrap();
        let empty = TemporalIndex::from_instants(vec![]);
        let result = rng.union(&empty).unwrap();
        assert!(result.equals(&rng));
        assert_eq!(result.freq_code().as_deref(), Some("D"));
        let result = empty.union(&rng).unwrap();
        assert!(result.equals(&rng));
    }

    #[test]
    fn union_is_idempotent() {
        let rng = date_range("2000-01-01", "2000-02-01", "D").unwrap();
        let result = rng.union(&rng).unwrap();
        assert!(result.equals(&rng));
        assert_eq!(result.freq(), rng.freq());
    }

    #[test]
    fn union_with_plain_values_on_the_grid_keeps_freq() {
        let rng = date_range("2000-01-01", "2002-01-01", "D").unwrap();
        let nofreq = TemporalIndex::from_instants(rng.slice(25..75).values().to_vec());
        assert!(nofreq.freq().is_none());
        let result = rng.slice(0..50).union(&nofreq).unwrap();
        assert_eq!(result.freq_code().as_deref(), Some("D"));
        let result = rng.slice(0..50).intersection(&nofreq).unwrap();
        assert_eq!(result.freq_code().as_deref(), Some("D"));
    }

    #[test]
    fn intersection_keeps_freq_on_overlap() {
        let rng = date_range("2000-01-01", "2002-01-01", "D").unwrap();
        let result = rng.slice(0..50).intersection(&rng.slice(25..75)).unwrap();
        assert_eq!(result.freq_code().as_deref(), Some("D"));
        assert_eq!(result.len(), 25);
    }

    #[test]
    fn difference_drops_interior_values() {
        let rng = date_range("2000-01-01", "2000-01-10", "D").unwrap();
        let mid = rng.slice(3..5);
        let result = rng.difference(&mid).unwrap();
        assert_eq!(result.len(), rng.len() - 2);
        assert!(result.freq().is_none());
        // removing a suffix keeps the grid unbroken
        let tail = rng.slice(7..10);
        let result = rng.difference(&tail).unwrap();
        assert_eq!(result.freq_code().as_deref(), Some("D"));
    }

    #[test]
    fn shift_requires_some_frequency() {
        let idx = index_of(&["2000-01-01", "2000-01-02", "2000-01-04"]);
        assert!(matches!(idx.shift(1), Err(Error::NullFrequency)));
        assert!(idx.shift_by(1, "D").is_ok());
    }

    #[test]
    fn shift_advances_every_element() {
        let rng = DateRange {
            start: Some(ts("2000-01-01")),
            periods: Some(5.0),
            freq: Some(Offset::hour()),
            ..Default::default()
        }
        .build()
        .unwrap();
        let shifted = rng.shift_by(1, "5T").unwrap();
        assert_eq!(shifted[0], ts("2000-01-01 00:05"));
        assert_eq!(shifted.freq_code().as_deref(), Some("H"));

        let shifted = rng.shift(2).unwrap();
        assert_eq!(shifted[0], ts("2000-01-01 02:00"));

        // positional sugar from the original API: index ± k ≡ shift(±k)
        assert!(shifted.equals(&(&rng + TimeDelta::hours(2))));
    }

    #[test]
    fn delta_translation_keeps_tick_freq() {
        let rng = date_range("2000-01-01", "2000-01-10", "D").unwrap();
        let shifted = &rng + TimeDelta::days(1);
        let back = &shifted - TimeDelta::days(1);
        assert!(back.equals(&rng));
        assert_eq!(shifted.freq_code().as_deref(), Some("D"));
        // anchored grids do not survive arbitrary translation
        let bdays = bdate_range("2000-01-03", "2000-01-14").unwrap();
        assert!((&bdays + TimeDelta::days(1)).freq().is_none());
    }

    #[test]
    fn snap_to_weekly_boundaries() {
        let dti = index_of(&[
            "2002-01-01",
            "2002-01-02",
            "2002-01-03",
            "2002-01-04",
            "2002-01-05",
            "2002-01-06",
            "2002-01-07",
        ]);
        let res = dti.snap("W-MON").unwrap();
        let expected = [
            "2001-12-31",
            "2001-12-31",
            "2001-12-31",
            "2002-01-07",
            "2002-01-07",
            "2002-01-07",
            "2002-01-07",
        ];
        for (got, want) in res.iter().zip(expected) {
            assert_eq!(*got, ts(want));
        }
        // duplicated boundaries cannot carry the weekly grid
        assert!(res.freq().is_none());
    }

    #[test]
    fn snap_to_business_days() {
        let dti = index_of(&[
            "2002-01-01",
            "2002-01-02",
            "2002-01-03",
            "2002-01-04",
            "2002-01-05",
            "2002-01-06",
            "2002-01-07",
        ]);
        let res = dti.snap("B").unwrap();
        let expected = [
            "2002-01-01",
            "2002-01-02",
            "2002-01-03",
            "2002-01-04",
            "2002-01-04",
            "2002-01-07",
            "2002-01-07",
        ];
        for (got, want) in res.iter().zip(expected) {
            assert_eq!(*got, ts(want));
        }
    }

    #[test]
    fn insert_keeps_freq_only_on_the_grid() {
        let idx = index_of(&["2000-01-04", "2000-01-01", "2000-01-02"]);
        let result = idx.insert(2, ts("2000-01-05")).unwrap();
        assert!(result.equals(&index_of(&[
            "2000-01-04",
            "2000-01-01",
            "2000-01-05",
            "2000-01-02"
        ])));

        let rng = DateRange {
            start: Some(ts("2000-01-31")),
            periods: Some(3.0),
            freq: Some(Offset::month_end()),
            ..Default::default()
        }
        .build()
        .unwrap();
        let grown = rng.insert(3, ts("2000-04-30")).unwrap();
        assert_eq!(grown.freq_code().as_deref(), Some("M"));
        let broken = rng.insert(1, ts("2000-02-15")).unwrap();
        assert!(broken.freq().is_none());
    }

    #[test]
    fn repeat_tiles_and_drops_freq() {
        let rng = date_range("2000-01-01", "2000-01-03", "D").unwrap();
        let tiled = rng.repeat(5);
        assert_eq!(tiled.len(), 15);
        assert!(tiled.freq().is_none());
        // the tiles are whole copies of the sequence
        assert_eq!(tiled[3], rng[0]);
        assert!(rng.repeat(1).freq().is_some());
    }

    #[test]
    fn get_duplicates_in_first_occurrence_order() {
        let idx = index_of(&[
            "2000-01-01",
            "2000-01-02",
            "2000-01-02",
            "2000-01-03",
            "2000-01-03",
            "2000-01-04",
        ]);
        let dups = idx.get_duplicates();
        assert_eq!(dups, vec![ts("2000-01-02"), ts("2000-01-03")]);
    }

    #[test]
    fn unique_argmin_argmax_sort() {
        let idx = index_of(&["2000-01-04", "2000-01-01", "2000-01-02"]);
        assert_eq!(idx.argmin(), Some(1));
        assert_eq!(idx.argmax(), Some(0));

        let (ordered, indexer) = idx.sort();
        assert!(ordered.is_monotonic());
        assert_eq!(indexer, vec![1, 2, 0]);

        let uniq = dup_index_for_unique().unique();
        assert_eq!(uniq.len(), 2);
        assert!(uniq.is_unique());
    }

    fn dup_index_for_unique() -> TemporalIndex {
        index_of(&["2000-01-02", "2000-01-02", "2000-01-03"])
    }

    #[test]
    fn normalize_flattens_times() {
        let rng = DateRange {
            start: Some(ts("2000-01-01 08:15")),
            periods: Some(3.0),
            ..Default::default()
        }
        .build()
        .unwrap();
        let flat = rng.normalize().unwrap();
        assert!(flat.iter().all(|v| v.hour() == 0));
        assert_eq!(flat.freq_code().as_deref(), Some("D"));
    }

    #[test]
    fn mask_selection_preserves_contiguous_freq() {
        let rng = bdate_range("2000-01-01", "2000-03-01").unwrap();
        let mut mask = vec![false; rng.len()];
        for m in mask.iter_mut().take(20).skip(10) {
            *m = true;
        }
        let taken = rng.select_mask(&mask).unwrap();
        assert_eq!(taken.freq_code().as_deref(), Some("B"));
        mask[22] = true;
        let gappy = rng.select_mask(&mask).unwrap();
        assert!(gappy.freq().is_none());
    }

    #[test]
    fn aware_and_naive_never_mix() {
        let naive = date_range("2009-04-15", "2009-04-20", "D").unwrap();
        let eastern = naive.tz_localize(parse_tz("US/Eastern").unwrap()).unwrap();
        assert!(matches!(naive.union(&eastern), Err(Error::TzMismatch)));
        assert!(matches!(
            eastern.intersection(&naive),
            Err(Error::TzMismatch)
        ));
        assert!(!naive.equals(&eastern));
    }

    #[test]
    fn aware_generation_is_wall_clock() {
        let rng = DateRange {
            start: Some(ts("2009-04-15")),
            periods: Some(5.0),
            tz: Some(parse_tz("US/Eastern").unwrap()),
            ..Default::default()
        }
        .build()
        .unwrap();
        // wall-clock midnight is 04:00 UTC during daylight saving
        assert_eq!(rng[0].hour(), 4);
        assert_eq!(rng.field_values(Field::Hour), vec![0, 0, 0, 0, 0]);
        assert_eq!(rng.freq_code().as_deref(), Some("D"));

        let utc = DateRange {
            start: Some(ts("2009-04-15")),
            periods: Some(5.0),
            tz: Some(parse_tz("utc").unwrap()),
            ..Default::default()
        }
        .build()
        .unwrap();
        assert_eq!(utc[0].hour(), 0);
    }

    #[test]
    fn aware_string_lookup_uses_wall_time() {
        let rng = DateRange {
            start: Some(ts("2009-04-15")),
            periods: Some(10.0),
            tz: Some(parse_tz("US/Eastern").unwrap()),
            ..Default::default()
        }
        .build()
        .unwrap();
        assert_eq!(rng.get_loc("2009-04-17").unwrap(), Loc::Single(2));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip_reconstructs_behavior() {
        let rng = date_range("2000-01-01", "2000-02-01", "B")
            .unwrap()
            .with_name("sessions");
        let json = serde_json::to_string(&rng).unwrap();
        assert!(json.contains("\"offset_code\":\"B\""));
        let back: TemporalIndex = serde_json::from_str(&json).unwrap();
        assert!(back.equals(&rng));
        assert_eq!(back.freq(), rng.freq());
        assert_eq!(back.name(), Some("sessions"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_accepts_legacy_offset_codes() {
        let json = r#"{
            "values": [946857600000000000, 946944000000000000, 947030400000000000],
            "offset_code": "WEEKDAY",
            "tz": null,
            "name": null
        }"#;
        let idx: TemporalIndex = serde_json::from_str(json).unwrap();
        assert_eq!(idx.freq(), Some(Offset::business_day()));
    }
}
