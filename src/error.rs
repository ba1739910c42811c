// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Error taxonomy for the temporal index engine.
//!
//! Every failure in this crate is a synchronous logic/input error: no
//! variant is transient and none carries retry semantics. Construction
//! errors abort the whole construction; lookup errors leave the index
//! untouched.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for instants, offsets, frequency resolution,
/// index construction, lookup, and alignment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A calendar value or arithmetic result falls outside the
    /// representable nanosecond span (approx. years 1677–2262).
    #[error("{what} out of representable range (1677-09-21..2262-04-11)")]
    OutOfRange { what: &'static str },

    /// Naive and timezone-aware values may not be compared or combined.
    #[error("cannot mix timezone-naive and timezone-aware values")]
    TzMismatch,

    /// Lookup miss. The message embeds the literal key text so callers
    /// can see exactly what failed to resolve.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A string could not be parsed as a time point.
    #[error("could not parse {0:?} as a time point")]
    Unparseable(String),

    /// The range generator needs exactly two of start, end and periods.
    #[error("must specify exactly two of start, end, or periods")]
    Unspecified,

    /// A frequency code or multiplier is malformed, or an offset does
    /// not support the requested operation.
    #[error("invalid frequency: {0}")]
    InvalidFrequency(String),

    /// A frequency base code is not in the supported table.
    #[error("unknown frequency code: {0}")]
    UnknownFrequency(String),

    /// More than one offset is consistent with the observed spacing.
    #[error("ambiguous frequency: {0}")]
    AmbiguousFrequency(String),

    /// Too few points to infer a frequency.
    #[error("need at least {min} points to infer a frequency, got {len}")]
    InsufficientData { len: usize, min: usize },

    /// An operation that interpolates between neighbours requires a
    /// monotonic index.
    #[error("{0} requires a monotonic index")]
    NonMonotonic(&'static str),

    /// An operation that maps labels to single positions requires a
    /// unique index.
    #[error("{0} requires a unique index")]
    NonUnique(&'static str),

    /// Shift was requested but neither an explicit nor an attached
    /// frequency is available.
    #[error("cannot shift without an attached or explicit frequency")]
    NullFrequency,

    /// Offset application failed to make progress within the iteration
    /// guard while generating a range.
    #[error("offset did not advance within {iterations} iterations")]
    InfiniteLoop { iterations: usize },
}
