//! Streaming ingest for Point & Figure charts
//!
//! The core chart is a synchronous, single-owner state machine; this crate
//! supplies the plumbing that real-time deployments put around it: a
//! bounded observation channel fed by an ingestor, a consumer task that
//! owns the chart, bounded fan-out of chart updates, and atomic counters
//! for observability. Memory stays bounded end to end: both channels have
//! fixed capacity and backpressure propagates to the producer.

pub mod feed;

pub use feed::{
    ChartFeed, ChartUpdate, ChartUpdateStream, FeedMetrics, MetricsSummary, StreamingConfig,
    StreamingError,
};
