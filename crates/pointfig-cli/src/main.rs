//! Point & Figure chart collection shell
//!
//! Builds or updates one chart per run: optionally restores a snapshot,
//! optionally derives the box size from ATR over an OHLC history file,
//! folds a delimited observation file into the chart, and writes the
//! resulting snapshot JSON into the output directory under the chart's
//! canonical name.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pointfig_core::{BoxScale, BoxType, Chart, OhlcBar, UseAdjusted, compute_atr, decimal};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BoxTypeArg {
    Integral,
    Fractional,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BoxScaleArg {
    Linear,
    Percent,
}

impl From<BoxTypeArg> for BoxType {
    fn from(arg: BoxTypeArg) -> Self {
        match arg {
            BoxTypeArg::Integral => BoxType::Integral,
            BoxTypeArg::Fractional => BoxType::Fractional,
        }
    }
}

impl From<BoxScaleArg> for BoxScale {
    fn from(arg: BoxScaleArg) -> Self {
        match arg {
            BoxScaleArg::Linear => BoxScale::Linear,
            BoxScaleArg::Percent => BoxScale::Percent,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "pointfig", about = "Build and update Point & Figure charts")]
struct Cli {
    /// Ticker symbol the chart tracks
    #[arg(long)]
    symbol: String,

    /// Observation file: one `timestamp<delimiter>price` per line
    #[arg(long)]
    data: PathBuf,

    /// Existing snapshot to update instead of starting a fresh chart
    #[arg(long)]
    snapshot_in: Option<PathBuf>,

    /// Directory the snapshot JSON is written into
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Box size as a decimal (ratio for percent scale)
    #[arg(long, default_value = "1")]
    box_size: String,

    /// Boxes required to reverse into a new column
    #[arg(long, default_value_t = 3)]
    reversal_boxes: u32,

    #[arg(long, value_enum, default_value = "integral")]
    box_type: BoxTypeArg,

    #[arg(long, value_enum, default_value = "linear")]
    scale: BoxScaleArg,

    /// chrono format for the timestamp field
    #[arg(long, default_value = "%Y-%m-%d")]
    date_format: String,

    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// OHLC history CSV (descending by date); derives the box size via ATR
    #[arg(long)]
    atr_history: Option<PathBuf>,

    /// Days of true range averaged when deriving the box size
    #[arg(long, default_value_t = 14)]
    atr_period: usize,

    /// Use split/dividend-adjusted OHLC fields for ATR
    #[arg(long)]
    use_adjusted: bool,

    /// Log filter, e.g. `info` or `pointfig_core=debug`
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&cli.log_level)
                .context("invalid --log-level filter")?,
        )
        .init();

    let mut chart = open_chart(&cli)?;

    let data_file = File::open(&cli.data)
        .with_context(|| format!("cannot open observation file {}", cli.data.display()))?;
    let summary = chart
        .load_data(BufReader::new(data_file), &cli.date_format, cli.delimiter)
        .context("loading observations")?;

    tracing::info!(
        symbol = %chart.symbol(),
        accepted = summary.accepted,
        ignored = summary.ignored,
        reversals = summary.reversals,
        skipped = summary.skipped,
        columns = chart.number_of_columns(),
        "observations loaded"
    );

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("cannot create {}", cli.output_dir.display()))?;
    let output_path = cli.output_dir.join(chart.chart_name("json"));
    let output = File::create(&output_path)
        .with_context(|| format!("cannot create {}", output_path.display()))?;
    chart
        .write_json(output)
        .context("writing chart snapshot")?;

    tracing::info!(path = %output_path.display(), "snapshot written");
    println!("{chart}");
    Ok(())
}

fn open_chart(cli: &Cli) -> Result<Chart> {
    if let Some(snapshot_path) = &cli.snapshot_in {
        let file = File::open(snapshot_path)
            .with_context(|| format!("cannot open snapshot {}", snapshot_path.display()))?;
        let chart = Chart::read_json(BufReader::new(file)).context("reading snapshot")?;
        anyhow::ensure!(
            chart.symbol() == cli.symbol,
            "snapshot is for '{}', requested '{}'",
            chart.symbol(),
            cli.symbol
        );
        return Ok(chart);
    }

    let box_size = match &cli.atr_history {
        Some(history_path) => derive_box_size_from_atr(cli, history_path)?,
        None => decimal::parse(&cli.box_size).context("invalid --box-size")?,
    };

    Chart::new(
        cli.symbol.clone(),
        box_size,
        cli.reversal_boxes,
        cli.box_type.into(),
        cli.scale.into(),
    )
    .context("invalid chart configuration")
}

fn derive_box_size_from_atr(cli: &Cli, history_path: &PathBuf) -> Result<rust_decimal::Decimal> {
    let mut reader = csv::Reader::from_path(history_path)
        .with_context(|| format!("cannot open OHLC history {}", history_path.display()))?;
    let bars: Vec<OhlcBar> = reader
        .deserialize()
        .collect::<std::result::Result<_, _>>()
        .context("parsing OHLC history rows")?;

    let use_adjusted = if cli.use_adjusted {
        UseAdjusted::Yes
    } else {
        UseAdjusted::No
    };
    let atr = compute_atr(&bars, cli.atr_period, use_adjusted)
        .context("computing ATR for box size")?;

    tracing::info!(%atr, period = cli.atr_period, "box size derived from ATR");
    Ok(atr)
}
