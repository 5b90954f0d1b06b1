//! Snapshot serialization
//!
//! A snapshot is the round-trippable document form of a chart: decimals as
//! canonical strings, timestamps as nanosecond integers, enumerations as
//! lowercase words. Every column snapshot redundantly carries the box
//! configuration so a column document is self-contained.
//!
//! Loading validates every enumerated string and decimal; a bad value fails
//! with `MalformedSnapshot` naming the field, never a panic.
//!
//! Round-trip law: `Chart::from_snapshot(chart.to_snapshot()) == chart`.

use crate::boxes::{BoxScale, BoxType, Boxes};
use crate::chart::Chart;
use crate::column::{Column, Direction, TimeSpan};
use crate::decimal;
use crate::errors::ChartError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Document form of a [`Column`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    /// First accepted observation, nanoseconds since epoch
    pub start_at: i64,
    /// Most recent accepted observation, nanoseconds since epoch
    pub last_entry: i64,
    pub box_size: String,
    pub reversal_boxes: u32,
    pub top: String,
    pub bottom: String,
    pub direction: String,
    pub box_type: String,
    pub column_scale: String,
    pub had_reversal: bool,
}

/// Document form of a [`Boxes`] configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxesSnapshot {
    pub box_size: String,
    pub box_type: String,
    pub box_scale: String,
}

/// Document form of a [`Chart`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSnapshot {
    pub symbol: String,
    pub boxes: BoxesSnapshot,
    pub first_date: i64,
    pub last_change_date: i64,
    pub last_check_date: i64,
    pub y_min: String,
    pub y_max: String,
    pub current_direction: String,
    pub columns: Vec<ColumnSnapshot>,
    pub current_column: ColumnSnapshot,
}

impl Chart {
    /// Transient document form of this chart.
    pub fn to_snapshot(&self) -> ChartSnapshot {
        ChartSnapshot {
            symbol: self.symbol().to_string(),
            boxes: BoxesSnapshot {
                box_size: self.boxes().box_size().to_string(),
                box_type: self.boxes().box_type().to_string(),
                box_scale: self.boxes().box_scale().to_string(),
            },
            first_date: self.first_date(),
            last_change_date: self.last_change_date(),
            last_check_date: self.last_checked_date(),
            y_min: self.y_min().to_string(),
            y_max: self.y_max().to_string(),
            current_direction: self.current_direction().to_string(),
            columns: self
                .columns()
                .iter()
                .map(|column| column_snapshot(self, column))
                .collect(),
            current_column: column_snapshot(self, self.current_column()),
        }
    }

    /// Reconstruct a chart from its document form, validating every
    /// enumerated and decimal field.
    pub fn from_snapshot(snapshot: &ChartSnapshot) -> Result<Self, ChartError> {
        let boxes = Boxes::new(
            parse_decimal_field("boxes.box_size", &snapshot.boxes.box_size)?,
            parse_box_type("boxes.box_type", &snapshot.boxes.box_type)?,
            parse_box_scale("boxes.box_scale", &snapshot.boxes.box_scale)?,
        )?;

        let columns = snapshot
            .columns
            .iter()
            .map(column_from_snapshot)
            .collect::<Result<Vec<_>, _>>()?;
        let current_column = column_from_snapshot(&snapshot.current_column)?;
        let reversal_boxes = snapshot.current_column.reversal_boxes;

        // A chart that never saw an observation stays unstamped, so the
        // next observation records its own time as first_date (epoch 0 in
        // the document is ambiguous between "unstamped" and a real
        // 1970 timestamp; the column state disambiguates)
        let first_date = if columns.is_empty() && current_column.is_empty() {
            None
        } else {
            Some(snapshot.first_date)
        };

        Ok(Chart::from_parts(
            boxes,
            snapshot.symbol.clone(),
            reversal_boxes,
            columns,
            current_column,
            parse_decimal_field("y_min", &snapshot.y_min)?,
            parse_decimal_field("y_max", &snapshot.y_max)?,
            first_date,
            snapshot.last_change_date,
            snapshot.last_check_date,
            parse_direction("current_direction", &snapshot.current_direction)?,
        ))
    }

    /// Serialize this chart as a JSON snapshot document.
    pub fn write_json(&self, writer: impl Write) -> Result<(), ChartError> {
        serde_json::to_writer(writer, &self.to_snapshot())?;
        Ok(())
    }

    /// Reconstruct a chart from a JSON snapshot document.
    pub fn read_json(reader: impl Read) -> Result<Self, ChartError> {
        let snapshot: ChartSnapshot = serde_json::from_reader(reader)?;
        Chart::from_snapshot(&snapshot)
    }
}

fn column_snapshot(chart: &Chart, column: &Column) -> ColumnSnapshot {
    let span = column.time_span();
    ColumnSnapshot {
        start_at: span.first,
        last_entry: span.last,
        box_size: chart.boxes().box_size().to_string(),
        reversal_boxes: column.reversal_boxes(),
        top: column.top().to_string(),
        bottom: column.bottom().to_string(),
        direction: column.direction().to_string(),
        box_type: chart.boxes().box_type().to_string(),
        column_scale: chart.boxes().box_scale().to_string(),
        had_reversal: column.had_reversal(),
    }
}

fn column_from_snapshot(snapshot: &ColumnSnapshot) -> Result<Column, ChartError> {
    // The redundant box fields make the document self-contained; validate
    // them even though the runtime column borrows the chart's Boxes.
    parse_decimal_field("box_size", &snapshot.box_size)?;
    parse_box_type("box_type", &snapshot.box_type)?;
    parse_box_scale("column_scale", &snapshot.column_scale)?;

    Ok(Column::from_parts(
        snapshot.reversal_boxes,
        parse_direction("direction", &snapshot.direction)?,
        parse_decimal_field("top", &snapshot.top)?,
        parse_decimal_field("bottom", &snapshot.bottom)?,
        snapshot.had_reversal,
        TimeSpan {
            first: snapshot.start_at,
            last: snapshot.last_entry,
        },
    ))
}

fn parse_decimal_field(field: &str, value: &str) -> Result<Decimal, ChartError> {
    decimal::parse(value).map_err(|_| ChartError::snapshot_field(field, value))
}

fn parse_direction(field: &str, value: &str) -> Result<Direction, ChartError> {
    match value {
        "up" => Ok(Direction::Up),
        "down" => Ok(Direction::Down),
        "unknown" => Ok(Direction::Unknown),
        other => Err(ChartError::snapshot_field(field, other)),
    }
}

fn parse_box_type(field: &str, value: &str) -> Result<BoxType, ChartError> {
    match value {
        "integral" => Ok(BoxType::Integral),
        "fractional" => Ok(BoxType::Fractional),
        other => Err(ChartError::snapshot_field(field, other)),
    }
}

fn parse_box_scale(field: &str, value: &str) -> Result<BoxScale, ChartError> {
    match value {
        "linear" => Ok(BoxScale::Linear),
        "percent" => Ok(BoxScale::Percent),
        other => Err(ChartError::snapshot_field(field, other)),
    }
}
