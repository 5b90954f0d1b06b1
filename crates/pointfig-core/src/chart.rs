//! Chart: the owner of a column sequence
//!
//! A `Chart` holds one `Boxes` configuration, the closed columns in
//! creation order, and the single open column every observation is routed
//! to. It rotates columns on reversal, tracks the price extrema across the
//! whole series, and records first/last-change/last-checked timestamps.
//!
//! The chart performs no I/O and holds no locks; callers must serialize
//! mutating calls on a given chart (one chart per symbol can be updated
//! concurrently without coordination).

use crate::boxes::{BoxScale, BoxType, Boxes};
use crate::column::{Column, Direction, Outcome, Status};
use crate::decimal;
use crate::errors::ChartError;
use crate::timestamp;
use rust_decimal::Decimal;
use std::fmt;
use std::io::BufRead;

/// A single `(price, time)` observation, time in nanoseconds since epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub price: Decimal,
    pub time: i64,
}

/// Tallies returned by [`Chart::load_data`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub accepted: u64,
    pub ignored: u64,
    pub reversals: u64,
    /// Lines that failed to parse and were skipped
    pub skipped: u64,
}

/// Point & Figure chart for one symbol.
#[derive(Debug, Clone)]
pub struct Chart {
    boxes: Boxes,
    symbol: String,
    reversal_boxes: u32,
    columns: Vec<Column>,
    current_column: Column,
    y_min: Decimal,
    y_max: Decimal,
    /// None until the first observation; epoch 0 is a valid timestamp
    first_date: Option<i64>,
    last_change_date: i64,
    last_checked_date: i64,
    current_direction: Direction,
}

impl Chart {
    /// Create an empty chart.
    ///
    /// Fails with a `DomainError` for a non-positive box size or a zero
    /// reversal count.
    pub fn new(
        symbol: impl Into<String>,
        box_size: Decimal,
        reversal_boxes: u32,
        box_type: BoxType,
        box_scale: BoxScale,
    ) -> Result<Self, ChartError> {
        if reversal_boxes < 1 {
            return Err(ChartError::domain("reversal_boxes must be at least 1"));
        }
        let boxes = Boxes::new(box_size, box_type, box_scale)?;

        Ok(Self {
            boxes,
            symbol: symbol.into(),
            reversal_boxes,
            columns: Vec::new(),
            current_column: Column::new(reversal_boxes),
            y_min: Decimal::MAX,
            y_max: Decimal::MIN,
            first_date: None,
            last_change_date: 0,
            last_checked_date: 0,
            current_direction: Direction::Unknown,
        })
    }

    /// Chart with every field preset, used by snapshot reconstruction.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        boxes: Boxes,
        symbol: String,
        reversal_boxes: u32,
        columns: Vec<Column>,
        current_column: Column,
        y_min: Decimal,
        y_max: Decimal,
        first_date: Option<i64>,
        last_change_date: i64,
        last_checked_date: i64,
        current_direction: Direction,
    ) -> Self {
        Self {
            boxes,
            symbol,
            reversal_boxes,
            columns,
            current_column,
            y_min,
            y_max,
            first_date,
            last_change_date,
            last_checked_date,
            current_direction,
        }
    }

    /// Route one observation through the open column.
    ///
    /// On a reversal the open column is closed, the seeded successor takes
    /// its place, and the triggering price is fed to it once more to finish
    /// placement. Price extrema and the last-change date move on every
    /// non-ignored outcome.
    pub fn add_value(&mut self, price: Decimal, time: i64) -> Status {
        if self.first_date.is_none() {
            self.first_date = Some(time);
        }
        self.last_checked_date = time;

        let outcome = self.current_column.add_value(&self.boxes, price, time);
        let status = outcome.status();

        match outcome {
            Outcome::Accepted => {
                self.fold_current_extrema();
                self.last_change_date = time;
            }
            Outcome::Ignored => {}
            Outcome::Reversal(successor) => {
                let closed = std::mem::replace(&mut self.current_column, successor);
                self.columns.push(closed);
                tracing::debug!(
                    symbol = %self.symbol,
                    columns = self.columns.len(),
                    "column reversal"
                );

                // Complete placement of the triggering price. The successor
                // is seeded at the reversal boundary, so this cannot recurse
                // into another reversal; on a gap move it extends the seeded
                // bound, otherwise it lands inside the seeded box.
                let refeed = self.current_column.add_value(&self.boxes, price, time);
                debug_assert!(
                    !matches!(refeed, Outcome::Reversal(_)),
                    "successor column reversed on its first observation"
                );

                self.fold_current_extrema();
                self.last_change_date = time;
            }
        }

        self.current_direction = self.current_column.direction();
        status
    }

    fn fold_current_extrema(&mut self) {
        if self.current_column.is_empty() {
            return;
        }
        if self.current_column.top() > self.y_max {
            self.y_max = self.current_column.top();
        }
        if self.current_column.bottom() < self.y_min {
            self.y_min = self.current_column.bottom();
        }
    }

    /// Consume a text stream of one observation per line
    /// (`timestamp<delimiter>price`) and feed every parsed pair through
    /// [`Chart::add_value`]. Malformed lines are skipped and counted.
    pub fn load_data(
        &mut self,
        input: impl BufRead,
        date_format: &str,
        delimiter: char,
    ) -> Result<LoadSummary, ChartError> {
        let mut summary = LoadSummary::default();

        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let observation = match parse_observation_line(&line, date_format, delimiter) {
                Ok(observation) => observation,
                Err(error) => {
                    tracing::warn!(%error, line, "skipping malformed observation");
                    summary.skipped += 1;
                    continue;
                }
            };

            match self.add_value(observation.price, observation.time) {
                Status::Accepted => summary.accepted += 1,
                Status::Ignored => summary.ignored += 1,
                Status::Reversal => summary.reversals += 1,
            }
        }

        // Keep the open column's bounds in the extrema even if its last
        // outcome was ignored.
        self.fold_current_extrema();
        self.current_direction = self.current_column.direction();

        Ok(summary)
    }

    /// Closed columns plus the always-present open column.
    pub fn number_of_columns(&self) -> usize {
        self.columns.len() + 1
    }

    /// Running extrema across all columns: `(y_min, y_max)`.
    pub fn y_limits(&self) -> (Decimal, Decimal) {
        (self.y_min, self.y_max)
    }

    /// Column by index; the open column sits after the closed ones.
    pub fn column(&self, index: usize) -> Option<&Column> {
        if index < self.columns.len() {
            self.columns.get(index)
        } else if index == self.columns.len() {
            Some(&self.current_column)
        } else {
            None
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn current_column(&self) -> &Column {
        &self.current_column
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn boxes(&self) -> &Boxes {
        &self.boxes
    }

    pub fn reversal_boxes(&self) -> u32 {
        self.reversal_boxes
    }

    pub fn current_direction(&self) -> Direction {
        self.current_direction
    }

    /// First observation time; 0 until any observation has arrived.
    pub fn first_date(&self) -> i64 {
        self.first_date.unwrap_or(0)
    }

    pub fn last_change_date(&self) -> i64 {
        self.last_change_date
    }

    pub fn last_checked_date(&self) -> i64 {
        self.last_checked_date
    }

    pub(crate) fn y_min(&self) -> Decimal {
        self.y_min
    }

    pub(crate) fn y_max(&self) -> Decimal {
        self.y_max
    }

    /// File-name style summary: `AAPL_2X3_linear.json`,
    /// `AAPL_0.04%X3_percent.svg`, …
    pub fn chart_name(&self, suffix: &str) -> String {
        format!(
            "{}_{}{}X{}_{}.{}",
            self.symbol,
            self.boxes.box_size(),
            if self.boxes.is_percent() { "%" } else { "" },
            self.reversal_boxes,
            self.boxes.box_scale(),
            suffix
        )
    }
}

/// Chart equality covers the configuration and the column series; the date
/// fields are deliberately excluded so replayed charts compare equal.
impl PartialEq for Chart {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
            && self.boxes == other.boxes
            && self.reversal_boxes == other.reversal_boxes
            && self.y_min == other.y_min
            && self.y_max == other.y_max
            && self.current_direction == other.current_direction
            && self.columns == other.columns
            && self.current_column == other.current_column
    }
}

impl fmt::Display for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "chart for {}: box size {}{} reversal {} ({})",
            self.symbol,
            self.boxes.box_size(),
            if self.boxes.is_percent() { "%" } else { "" },
            self.reversal_boxes,
            self.boxes.box_scale(),
        )?;
        for column in &self.columns {
            writeln!(f, "    {column}")?;
        }
        writeln!(f, "    {}", self.current_column)?;
        write!(
            f,
            "columns: {} y_min: {} y_max: {}",
            self.number_of_columns(),
            self.y_min,
            self.y_max
        )
    }
}

fn parse_observation_line(
    line: &str,
    date_format: &str,
    delimiter: char,
) -> Result<Observation, ChartError> {
    let mut fields = line.split(delimiter);
    let time_field = fields
        .next()
        .ok_or_else(|| ChartError::MalformedTimestamp {
            value: line.to_string(),
            format: date_format.to_string(),
        })?;
    let price_field = fields.next().ok_or_else(|| ChartError::MalformedDecimal {
        value: line.to_string(),
    })?;

    Ok(Observation {
        time: timestamp::parse_observation_time(time_field, date_format)?,
        price: decimal::parse(price_field)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    fn unit_chart(reversal_boxes: u32) -> Chart {
        Chart::new("TEST", dec!(1), reversal_boxes, BoxType::Integral, BoxScale::Linear).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(Chart::new("T", dec!(0), 3, BoxType::Integral, BoxScale::Linear).is_err());
        assert!(Chart::new("T", dec!(1), 0, BoxType::Integral, BoxScale::Linear).is_err());
    }

    #[test]
    fn extrema_track_column_bounds() {
        let mut chart = unit_chart(3);
        chart.add_value(dec!(10), 0);
        chart.add_value(dec!(13), 1);
        assert_eq!(chart.y_limits(), (dec!(10), dec!(13)));

        // Reversal extends the minimum through the successor column
        chart.add_value(dec!(9), 2);
        assert_eq!(chart.y_limits(), (dec!(9), dec!(13)));
    }

    #[test]
    fn reversal_rotates_columns() {
        let mut chart = unit_chart(3);
        for (price, time) in [(dec!(10), 0), (dec!(13), 1)] {
            chart.add_value(price, time);
        }
        assert_eq!(chart.number_of_columns(), 1);

        let status = chart.add_value(dec!(10), 2);
        assert_eq!(status, Status::Reversal);
        assert_eq!(chart.number_of_columns(), 2);
        assert_eq!(chart.current_direction(), Direction::Down);

        let closed = chart.column(0).unwrap();
        assert_eq!(closed.top(), dec!(13));
        assert_eq!(closed.bottom(), dec!(10));
        assert_eq!(closed.direction(), Direction::Up);
    }

    #[test]
    fn gap_reversal_places_full_move() {
        let mut chart = unit_chart(3);
        chart.add_value(dec!(10), 0);
        chart.add_value(dec!(15), 1);

        // Drop of 8 boxes: close at top 15, successor runs straight down to 7
        assert_eq!(chart.add_value(dec!(7), 2), Status::Reversal);
        let current = chart.current_column();
        assert_eq!(current.direction(), Direction::Down);
        assert_eq!(current.top(), dec!(14));
        assert_eq!(current.bottom(), dec!(7));
        assert_eq!(chart.y_limits(), (dec!(7), dec!(15)));
    }

    #[test]
    fn dates_follow_outcomes() {
        let mut chart = unit_chart(3);
        chart.add_value(dec!(10), 100);
        assert_eq!(chart.first_date(), 100);
        assert_eq!(chart.last_change_date(), 100);

        // Ignored outcome bumps only the checked date
        chart.add_value(dec!(10.4), 200);
        assert_eq!(chart.last_change_date(), 100);
        assert_eq!(chart.last_checked_date(), 200);

        chart.add_value(dec!(12), 300);
        assert_eq!(chart.last_change_date(), 300);
    }

    #[test]
    fn epoch_zero_first_observation_is_stamped() {
        // Timestamp 0 is a valid instant; it must stick as first_date
        let mut chart = unit_chart(3);
        chart.add_value(dec!(10), 0);
        assert_eq!(chart.first_date(), 0);

        chart.add_value(dec!(12), 500);
        assert_eq!(chart.first_date(), 0);
        assert_eq!(chart.last_change_date(), 500);
    }

    #[test]
    fn equality_ignores_dates() {
        let mut a = unit_chart(3);
        let mut b = unit_chart(3);
        for (i, price) in [dec!(10), dec!(11), dec!(13), dec!(10)].into_iter().enumerate() {
            a.add_value(price, i as i64);
            b.add_value(price, (i as i64) * 1_000 + 7);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn inequality_on_different_series() {
        let mut a = unit_chart(3);
        let mut b = unit_chart(3);
        a.add_value(dec!(10), 0);
        b.add_value(dec!(11), 0);
        assert_ne!(a, b);
    }

    #[test]
    fn load_data_counts_and_skips() {
        let mut chart = unit_chart(3);
        let input = Cursor::new(
            "2021-07-26,10\n\
             2021-07-27,11\n\
             garbage line\n\
             2021-07-28,not_a_price\n\
             2021-07-29,13\n",
        );

        let summary = chart.load_data(input, "%Y-%m-%d", ',').unwrap();
        assert_eq!(summary.accepted, 3);
        assert_eq!(summary.skipped, 2);
        assert_eq!(chart.current_column().top(), dec!(13));
        assert_eq!(chart.y_limits(), (dec!(10), dec!(13)));
    }

    #[test]
    fn load_data_tolerates_field_whitespace() {
        let mut chart = unit_chart(3);
        let input = Cursor::new("2021-07-26 , 10 \n 2021-07-27 , 12\n");
        let summary = chart.load_data(input, "%Y-%m-%d", ',').unwrap();
        assert_eq!(summary.accepted, 2);
        assert_eq!(chart.current_column().top(), dec!(12));
    }

    #[test]
    fn chart_name_encodes_config() {
        let chart = unit_chart(3);
        assert_eq!(chart.chart_name("json"), "TEST_1X3_linear.json");

        let percent =
            Chart::new("AAPL", dec!(0.04), 1, BoxType::Fractional, BoxScale::Percent).unwrap();
        assert_eq!(percent.chart_name("svg"), "AAPL_0.04%X1_percent.svg");
    }

    #[test]
    fn ignored_is_idempotent() {
        let mut chart = unit_chart(3);
        chart.add_value(dec!(10), 0);
        chart.add_value(dec!(13), 1);

        assert_eq!(chart.add_value(dec!(11.5), 2), Status::Ignored);
        let snapshot = chart.clone();
        assert_eq!(chart.add_value(dec!(11.5), 3), Status::Ignored);
        assert_eq!(chart, snapshot);
    }
}
