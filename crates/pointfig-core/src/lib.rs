//! Point & Figure chart construction
//!
//! A deterministic state machine that compresses a time-ordered price
//! stream into the canonical P&F column series: movements smaller than the
//! configured box size are filtered out, and a new column starts only when
//! price retraces by the configured number of boxes.
//!
//! ## Guarantees
//!
//! - Exact decimal arithmetic throughout the column logic; box-boundary
//!   comparisons and snapshot round-trips never touch binary floats
//! - Replay determinism: the same observation sequence always produces an
//!   equal chart
//! - Snapshot round-trip: `from_snapshot(to_snapshot(c)) == c`
//! - Linear and percent box scales, integral or fractional rounding, and
//!   the one-box step-back reversal rule
//!
//! The crate performs no I/O beyond reading the caller's observation
//! stream and holds no global state; callers serialize mutating calls on a
//! chart, and independent charts update concurrently without coordination.

pub mod atr;
pub mod boxes;
pub mod chart;
pub mod column;
pub mod decimal;
pub mod errors;
pub mod snapshot;
pub mod timestamp;

// Deterministic walk generators (test builds or the test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use atr::{OhlcBar, UseAdjusted, compute_atr};
pub use boxes::{BoxScale, BoxType, Boxes};
pub use chart::{Chart, LoadSummary, Observation};
pub use column::{Column, Direction, Outcome, Status, TimeSpan};
pub use errors::ChartError;
pub use snapshot::{BoxesSnapshot, ChartSnapshot, ColumnSnapshot};
