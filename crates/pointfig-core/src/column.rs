//! Single-column state machine
//!
//! A column is a maximal run of box moves in one direction. It consumes
//! `(price, time)` observations and reports one of three outcomes: the
//! column extended, the price fell inside its tolerance and was ignored,
//! or the price reversed far enough that the column is terminal and a
//! seeded successor is handed back to the owner.
//!
//! The construction rules follow du Plessis' definitive treatment: a fresh
//! column has no direction until a full box move commits one; gap moves
//! advance by every whole box they cover in a single call; and with a
//! one-box reversal count a column that never advanced past its first box
//! reverses in place instead of spawning a successor.
//!
//! Columns do not store their configuration; every operation borrows the
//! owning chart's [`Boxes`].

use crate::boxes::{BoxScale, Boxes};
use crate::decimal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Net direction of a column's movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// No full box move yet
    Unknown,
    Up,
    Down,
}

/// Observation outcome, without the successor payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Accepted,
    Ignored,
    Reversal,
}

/// Observation outcome as seen by the column's owner. On reversal the
/// seeded successor column rides in the variant; the owner must feed the
/// triggering price into it exactly once to complete placement.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted,
    Ignored,
    Reversal(Column),
}

impl Outcome {
    pub fn status(&self) -> Status {
        match self {
            Outcome::Accepted => Status::Accepted,
            Outcome::Ignored => Status::Ignored,
            Outcome::Reversal(_) => Status::Reversal,
        }
    }
}

/// First and most recent accepted observation times, nanoseconds since epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeSpan {
    pub first: i64,
    pub last: i64,
}

/// One vertical column of the chart.
///
/// `top == bottom == -1` is the empty sentinel; the first observation seeds
/// both bounds. Equality deliberately excludes the time span, so replayed
/// charts compare equal regardless of when observations arrived.
#[derive(Debug, Clone)]
pub struct Column {
    reversal_boxes: u32,
    direction: Direction,
    top: Decimal,
    bottom: Decimal,
    had_reversal: bool,
    time_span: TimeSpan,
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.reversal_boxes == other.reversal_boxes
            && self.direction == other.direction
            && self.top == other.top
            && self.bottom == other.bottom
            && self.had_reversal == other.had_reversal
    }
}

impl Column {
    /// Fresh, empty column.
    pub fn new(reversal_boxes: u32) -> Self {
        Self {
            reversal_boxes,
            direction: Direction::Unknown,
            top: Decimal::NEGATIVE_ONE,
            bottom: Decimal::NEGATIVE_ONE,
            had_reversal: false,
            time_span: TimeSpan::default(),
        }
    }

    /// Column with every field preset, used by snapshot reconstruction.
    pub(crate) fn from_parts(
        reversal_boxes: u32,
        direction: Direction,
        top: Decimal,
        bottom: Decimal,
        had_reversal: bool,
        time_span: TimeSpan,
    ) -> Self {
        Self {
            reversal_boxes,
            direction,
            top,
            bottom,
            had_reversal,
            time_span,
        }
    }

    pub fn reversal_boxes(&self) -> u32 {
        self.reversal_boxes
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn top(&self) -> Decimal {
        self.top
    }

    pub fn bottom(&self) -> Decimal {
        self.bottom
    }

    /// True when this column reversed direction in place via the
    /// one-step-back rule (only possible with `reversal_boxes == 1`).
    pub fn had_reversal(&self) -> bool {
        self.had_reversal
    }

    pub fn time_span(&self) -> TimeSpan {
        self.time_span
    }

    pub fn is_empty(&self) -> bool {
        self.top == Decimal::NEGATIVE_ONE && self.bottom == Decimal::NEGATIVE_ONE
    }

    /// Feed one observation into the column.
    pub fn add_value(&mut self, boxes: &Boxes, price: Decimal, time: i64) -> Outcome {
        match boxes.box_scale() {
            BoxScale::Linear => self.add_value_linear(boxes, price, time),
            BoxScale::Percent => self.add_value_percent(boxes, price, time),
        }
    }

    // === LINEAR SCALE ===

    fn add_value_linear(&mut self, boxes: &Boxes, price: Decimal, time: i64) -> Outcome {
        if self.is_empty() {
            return self.start_column(boxes, price, time);
        }

        let value = boxes.conditioned(price);

        match self.direction {
            Direction::Unknown => self.try_find_direction(boxes, value, time),
            Direction::Up => self.try_extend_up(boxes, value, time),
            Direction::Down => self.try_extend_down(boxes, value, time),
        }
    }

    fn start_column(&mut self, boxes: &Boxes, price: Decimal, time: i64) -> Outcome {
        self.top = boxes.round_down_to_box(price);
        self.bottom = self.top;
        self.time_span = TimeSpan { first: time, last: time };
        tracing::debug!(top = %self.top, "seeded new column");
        Outcome::Accepted
    }

    fn try_find_direction(&mut self, boxes: &Boxes, value: Decimal, time: i64) -> Outcome {
        // top == bottom here, so either bound works as the anchor. A gap
        // move can cover several boxes at once; take all of them.
        let box_size = boxes.box_size();

        if value >= self.top + box_size {
            self.direction = Direction::Up;
            let whole_boxes = ((value - self.top) / box_size).trunc();
            self.top += whole_boxes * box_size;
            self.time_span.last = time;
            return Outcome::Accepted;
        }
        if value <= self.bottom - box_size {
            self.direction = Direction::Down;
            // Negative box count moves the bottom downward
            let whole_boxes = ((value - self.bottom) / box_size).trunc();
            self.bottom += whole_boxes * box_size;
            self.time_span.last = time;
            return Outcome::Accepted;
        }

        Outcome::Ignored
    }

    fn try_extend_up(&mut self, boxes: &Boxes, value: Decimal, time: i64) -> Outcome {
        let box_size = boxes.box_size();

        if value >= self.top + box_size {
            let whole_boxes = ((value - self.top) / box_size).trunc();
            self.top += whole_boxes * box_size;
            self.time_span.last = time;
            return Outcome::Accepted;
        }

        let reversal = boxes.reversal_distance(self.reversal_boxes);
        if value <= self.top - reversal {
            if self.reversal_boxes == 1 {
                // In place only while the column spans its initial box; a
                // column that advanced further has the box below its top
                // occupied and must spawn a successor
                if self.bottom < self.top - box_size {
                    self.time_span.last = time;
                    return Outcome::Reversal(self.reversal_column(
                        boxes,
                        Direction::Down,
                        self.top - box_size,
                        time,
                    ));
                }
                let whole_boxes = ((value - self.bottom) / box_size).trunc();
                self.bottom += whole_boxes * box_size;
                self.had_reversal = true;
                self.direction = Direction::Down;
                self.time_span.last = time;
                return Outcome::Accepted;
            }
            self.time_span.last = time;
            return Outcome::Reversal(self.reversal_column(
                boxes,
                Direction::Down,
                self.top - reversal,
                time,
            ));
        }

        Outcome::Ignored
    }

    fn try_extend_down(&mut self, boxes: &Boxes, value: Decimal, time: i64) -> Outcome {
        let box_size = boxes.box_size();

        if value <= self.bottom - box_size {
            let whole_boxes = ((value - self.bottom) / box_size).trunc();
            self.bottom += whole_boxes * box_size;
            self.time_span.last = time;
            return Outcome::Accepted;
        }

        let reversal = boxes.reversal_distance(self.reversal_boxes);
        if value >= self.bottom + reversal {
            if self.reversal_boxes == 1 {
                if self.top > self.bottom + box_size {
                    self.time_span.last = time;
                    return Outcome::Reversal(self.reversal_column(
                        boxes,
                        Direction::Up,
                        self.bottom + box_size,
                        time,
                    ));
                }
                let whole_boxes = ((value - self.top) / box_size).trunc();
                self.top += whole_boxes * box_size;
                self.had_reversal = true;
                self.direction = Direction::Up;
                self.time_span.last = time;
                return Outcome::Accepted;
            }
            self.time_span.last = time;
            return Outcome::Reversal(self.reversal_column(
                boxes,
                Direction::Up,
                self.bottom + reversal,
                time,
            ));
        }

        Outcome::Ignored
    }

    /// Successor column seeded one box into the new direction. For a down
    /// successor the top sits one box under this column's top and the
    /// bottom at `value` (the reversal boundary); mirrored for up. The
    /// owner re-feeds the triggering price, which may extend the seeded
    /// bound further on a gap reversal.
    fn reversal_column(
        &self,
        boxes: &Boxes,
        direction: Direction,
        value: Decimal,
        time: i64,
    ) -> Column {
        let box_size = boxes.box_size();
        let (top, bottom) = match direction {
            Direction::Down => (self.top - box_size, value),
            Direction::Up => (value, self.bottom + box_size),
            Direction::Unknown => unreachable!("reversal columns always have a direction"),
        };
        Column {
            reversal_boxes: self.reversal_boxes,
            direction,
            top,
            bottom,
            had_reversal: false,
            time_span: TimeSpan { first: time, last: time },
        }
    }

    // === PERCENT SCALE ===

    fn add_value_percent(&mut self, boxes: &Boxes, price: Decimal, time: i64) -> Outcome {
        if self.is_empty() {
            // Percent columns seed from the raw value
            self.top = price;
            self.bottom = price;
            self.time_span = TimeSpan { first: time, last: time };
            return Outcome::Accepted;
        }

        match self.direction {
            Direction::Unknown => self.try_find_direction_percent(boxes, price, time),
            Direction::Up => self.try_extend_up_percent(boxes, price, time),
            Direction::Down => self.try_extend_down_percent(boxes, price, time),
        }
    }

    fn try_find_direction_percent(&mut self, boxes: &Boxes, value: Decimal, time: i64) -> Outcome {
        let up = boxes.up_factor();
        let down = boxes.down_factor();

        if value >= self.top * up {
            self.direction = Direction::Up;
            while value >= self.top * up {
                self.top *= up;
            }
            self.top = decimal::rescale(self.top, boxes.percent_exponent());
            self.time_span.last = time;
            return Outcome::Accepted;
        }
        if value <= self.bottom * down {
            self.direction = Direction::Down;
            while value <= self.bottom * down {
                self.bottom *= down;
            }
            self.bottom = decimal::rescale(self.bottom, boxes.percent_exponent());
            self.time_span.last = time;
            return Outcome::Accepted;
        }

        Outcome::Ignored
    }

    fn try_extend_up_percent(&mut self, boxes: &Boxes, value: Decimal, time: i64) -> Outcome {
        let up = boxes.up_factor();
        let down = boxes.down_factor();

        if value >= self.top * up {
            while value >= self.top * up {
                self.top *= up;
            }
            self.top = decimal::rescale(self.top, boxes.percent_exponent());
            self.time_span.last = time;
            return Outcome::Accepted;
        }

        if value <= self.top * boxes.reversal_down_factor(self.reversal_boxes) {
            if self.reversal_boxes == 1 {
                if self.bottom < self.top * down {
                    self.time_span.last = time;
                    let seed = decimal::rescale(self.top * down, boxes.percent_exponent());
                    return Outcome::Reversal(self.reversal_column_percent(
                        boxes,
                        Direction::Down,
                        seed,
                        time,
                    ));
                }
                while value <= self.bottom * down {
                    self.bottom *= down;
                }
                self.bottom = decimal::rescale(self.bottom, boxes.percent_exponent());
                self.had_reversal = true;
                self.direction = Direction::Down;
                self.time_span.last = time;
                return Outcome::Accepted;
            }
            self.time_span.last = time;
            let seed = decimal::rescale(
                self.top * boxes.reversal_down_factor(self.reversal_boxes),
                boxes.percent_exponent(),
            );
            return Outcome::Reversal(self.reversal_column_percent(
                boxes,
                Direction::Down,
                seed,
                time,
            ));
        }

        Outcome::Ignored
    }

    fn try_extend_down_percent(&mut self, boxes: &Boxes, value: Decimal, time: i64) -> Outcome {
        let up = boxes.up_factor();
        let down = boxes.down_factor();

        if value <= self.bottom * down {
            while value <= self.bottom * down {
                self.bottom *= down;
            }
            self.bottom = decimal::rescale(self.bottom, boxes.percent_exponent());
            self.time_span.last = time;
            return Outcome::Accepted;
        }

        if value >= self.bottom * boxes.reversal_up_factor(self.reversal_boxes) {
            if self.reversal_boxes == 1 {
                if self.top > self.bottom * up {
                    self.time_span.last = time;
                    let seed = decimal::rescale(self.bottom * up, boxes.percent_exponent());
                    return Outcome::Reversal(self.reversal_column_percent(
                        boxes,
                        Direction::Up,
                        seed,
                        time,
                    ));
                }
                while value >= self.top * up {
                    self.top *= up;
                }
                self.top = decimal::rescale(self.top, boxes.percent_exponent());
                self.had_reversal = true;
                self.direction = Direction::Up;
                self.time_span.last = time;
                return Outcome::Accepted;
            }
            self.time_span.last = time;
            let seed = decimal::rescale(
                self.bottom * boxes.reversal_up_factor(self.reversal_boxes),
                boxes.percent_exponent(),
            );
            return Outcome::Reversal(self.reversal_column_percent(
                boxes,
                Direction::Up,
                seed,
                time,
            ));
        }

        Outcome::Ignored
    }

    /// Percent successor: both bounds land on the working exponent so the
    /// multiplicative iteration stays deterministic across snapshots.
    fn reversal_column_percent(
        &self,
        boxes: &Boxes,
        direction: Direction,
        value: Decimal,
        time: i64,
    ) -> Column {
        let exponent = boxes.percent_exponent();
        let (top, bottom) = match direction {
            Direction::Down => (
                decimal::rescale(self.top * boxes.down_factor(), exponent),
                value,
            ),
            Direction::Up => (
                value,
                decimal::rescale(self.bottom * boxes.up_factor(), exponent),
            ),
            Direction::Unknown => unreachable!("reversal columns always have a direction"),
        };
        Column {
            reversal_boxes: self.reversal_boxes,
            direction,
            top,
            bottom,
            had_reversal: false,
            time_span: TimeSpan { first: time, last: time },
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Unknown => write!(f, "unknown"),
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bottom: {} top: {} direction: {}{}",
            self.bottom,
            self.top,
            self.direction,
            if self.had_reversal { " (step-back)" } else { "" }
        )
    }
}
