// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Alignment of one index against another.
//!
//! [`TemporalIndex::get_indexer`] maps every position of a target index
//! to the source position that should supply its value — the actual
//! value substitution belongs to the consuming container. Misses are
//! `None`; `pad` fills from the nearest source value at or before the
//! target, `backfill` from the nearest at or after, and `limit` bounds
//! the number of *consecutive* propagated positions, not any time
//! distance.

use crate::error::{Error, Result};
use crate::index::TemporalIndex;

/// Fill policy for [`TemporalIndex::get_indexer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMethod {
    /// Exact matches only.
    None,
    /// Forward fill: the last source value at or before the target.
    Pad,
    /// Backward fill: the next source value at or after the target.
    Backfill,
}

impl TemporalIndex {
    /// Compute the indexer aligning `self` (the source of values) onto
    /// `target`.
    ///
    /// `Pad`/`Backfill` require a monotonic source — "nearest preceding/
    /// following" is meaningless otherwise — and process the target in
    /// its given order, so `limit` counts consecutive propagations along
    /// it. Exact alignment requires a unique source instead.
    pub fn get_indexer(
        &self,
        target: &TemporalIndex,
        method: FillMethod,
        limit: Option<usize>,
    ) -> Result<Vec<Option<usize>>> {
        self.check_tz_for_align(target)?;
        match method {
            FillMethod::None => self.indexer_exact(target),
            FillMethod::Pad => {
                if !self.is_monotonic() {
                    return Err(Error::NonMonotonic("pad alignment"));
                }
                Ok(self.indexer_fill(target, limit, false))
            }
            FillMethod::Backfill => {
                if !self.is_monotonic() {
                    return Err(Error::NonMonotonic("backfill alignment"));
                }
                Ok(self.indexer_fill(target, limit, true))
            }
        }
    }

    fn check_tz_for_align(&self, target: &TemporalIndex) -> Result<()> {
        match (self.tz(), target.tz()) {
            (None, None) => Ok(()),
            (Some(a), Some(b)) if a == b => Ok(()),
            _ => Err(Error::TzMismatch),
        }
    }

    fn indexer_exact(&self, target: &TemporalIndex) -> Result<Vec<Option<usize>>> {
        if !self.is_unique() {
            return Err(Error::NonUnique("exact alignment"));
        }
        let positions: std::collections::HashMap<i64, usize> = self
            .values()
            .iter()
            .enumerate()
            .map(|(i, v)| (v.raw(), i))
            .collect();
        Ok(target
            .values()
            .iter()
            .map(|t| {
                if t.is_nat() {
                    None
                } else {
                    positions.get(&t.raw()).copied()
                }
            })
            .collect())
    }

    fn indexer_fill(
        &self,
        target: &TemporalIndex,
        limit: Option<usize>,
        backward: bool,
    ) -> Vec<Option<usize>> {
        let source = self.values();
        let n = target.len();
        let mut out = vec![None; n];
        // consecutive propagations since the last exact hit; backfill
        // walks the target in reverse so the run is counted back from
        // the hit that supplies the value
        let mut run = 0usize;
        let order: Vec<usize> = if backward {
            (0..n).rev().collect()
        } else {
            (0..n).collect()
        };
        for idx in order {
            let t = target.values()[idx];
            if t.is_nat() {
                continue;
            }
            let at_or_before = source.partition_point(|v| v.raw() <= t.raw());
            let exact = at_or_before > 0 && source[at_or_before - 1].raw() == t.raw();
            if exact {
                run = 0;
                out[idx] = Some(at_or_before - 1);
                continue;
            }
            let candidate = if backward {
                // first source value strictly after the target
                (at_or_before < source.len()).then_some(at_or_before)
            } else {
                (at_or_before > 0).then(|| at_or_before - 1)
            };
            if let Some(pos) = candidate {
                run += 1;
                if limit.map_or(true, |l| run <= l) {
                    out[idx] = Some(pos);
                }
            }
        }
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{bdate_range, date_range, DateRange};
    use crate::instant::{parse_instant, Instant};
    use crate::offset::Offset;

    fn ts(text: &str) -> Instant {
        parse_instant(text).unwrap()
    }

    fn daily(periods: f64) -> TemporalIndex {
        DateRange {
            start: Some(ts("2000-01-01")),
            periods: Some(periods),
            freq: Some(Offset::day()),
            ..Default::default()
        }
        .build()
        .unwrap()
    }

    #[test]
    fn pad_with_limit_bounds_consecutive_propagations() {
        let target = daily(10.0);
        let source = target.slice(0..2);
        let indexer = source
            .get_indexer(&target, FillMethod::Pad, Some(5))
            .unwrap();
        // two exact hits, five propagations of the last value, then misses
        let expected: Vec<Option<usize>> = vec![
            Some(0),
            Some(1),
            Some(1),
            Some(1),
            Some(1),
            Some(1),
            Some(1),
            None,
            None,
            None,
        ];
        assert_eq!(indexer, expected);
    }

    #[test]
    fn backfill_with_limit_mirrors_pad() {
        let target = daily(10.0);
        let source = target.slice(8..10);
        let indexer = source
            .get_indexer(&target, FillMethod::Backfill, Some(5))
            .unwrap();
        let expected: Vec<Option<usize>> = vec![
            None,
            None,
            None,
            Some(0),
            Some(0),
            Some(0),
            Some(0),
            Some(0),
            Some(0),
            Some(1),
        ];
        assert_eq!(indexer, expected);
    }

    #[test]
    fn unlimited_pad_fills_everything_after_the_first_value() {
        let target = daily(6.0);
        let source = target.slice(0..2);
        let indexer = source.get_indexer(&target, FillMethod::Pad, None).unwrap();
        assert_eq!(
            indexer,
            vec![Some(0), Some(1), Some(1), Some(1), Some(1), Some(1)]
        );
    }

    #[test]
    fn pad_requires_monotonic_source() {
        let rng = bdate_range("2000-01-01", "2000-03-01").unwrap();
        // every other element, reversed: decidedly non-monotonic
        let indices: Vec<usize> = (0..rng.len()).step_by(2).rev().collect();
        let source = rng.take(&indices).unwrap();
        let err = source.get_indexer(&rng, FillMethod::Pad, None).unwrap_err();
        assert!(matches!(err, Error::NonMonotonic(_)));
    }

    #[test]
    fn exact_alignment_reports_misses() {
        let source = daily(5.0);
        let target = TemporalIndex::from_instants(vec![
            ts("2000-01-02"),
            ts("1999-12-31"),
            Instant::NAT,
            ts("2000-01-05"),
        ]);
        let indexer = source
            .get_indexer(&target, FillMethod::None, None)
            .unwrap();
        assert_eq!(indexer, vec![Some(1), None, None, Some(4)]);
    }

    #[test]
    fn exact_alignment_requires_unique_source() {
        let source = TemporalIndex::from_instants(vec![
            ts("2000-01-01"),
            ts("2000-01-01"),
            ts("2000-01-02"),
        ]);
        let target = daily(3.0);
        assert!(matches!(
            source.get_indexer(&target, FillMethod::None, None),
            Err(Error::NonUnique(_))
        ));
    }

    #[test]
    fn pad_target_before_all_sources_is_missing() {
        let source = daily(3.0);
        let target = TemporalIndex::from_instants(vec![
            ts("1999-12-30"),
            ts("2000-01-01"),
            ts("2000-01-01 12:00"),
        ]);
        let indexer = source.get_indexer(&target, FillMethod::Pad, None).unwrap();
        assert_eq!(indexer, vec![None, Some(0), Some(0)]);
    }

    #[test]
    fn alignment_never_mixes_naive_and_aware() {
        let naive = daily(3.0);
        let aware = naive
            .tz_localize(crate::index::parse_tz("utc").unwrap())
            .unwrap();
        assert!(matches!(
            naive.get_indexer(&aware, FillMethod::Pad, None),
            Err(Error::TzMismatch)
        ));
    }

    #[test]
    fn reindexing_onto_a_superset_marks_new_positions_missing() {
        // reindex-and-fill scenario: a daily series viewed on a denser grid
        let source = date_range("2000-01-01", "2000-01-05", "D").unwrap();
        let target = date_range("2000-01-01", "2000-01-05", "12H").unwrap();
        let exact = source
            .get_indexer(&target, FillMethod::None, None)
            .unwrap();
        assert_eq!(exact.iter().filter(|p| p.is_some()).count(), 5);
        let padded = source.get_indexer(&target, FillMethod::Pad, None).unwrap();
        assert!(padded.iter().all(|p| p.is_some()));
        assert_eq!(padded[1], Some(0));
    }
}
