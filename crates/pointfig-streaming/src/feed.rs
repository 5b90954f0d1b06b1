//! Bounded-memory chart feed
//!
//! Wires a synchronous [`Chart`] into a streaming deployment: an ingestor
//! task sends parsed observations into a bounded channel, a single
//! consumer task owns the chart and applies them in arrival order, and
//! downstream consumers receive a compact update for every observation
//! that changed the chart. Backpressure is real on both sides: the
//! ingestor blocks when the observation channel fills, and the feed blocks
//! when the update channel fills.
//!
//! The chart itself provides no synchronization; ownership by one consumer
//! task is the serialization.

use pointfig_core::{Chart, Direction, Observation, Status};
use rust_decimal::Decimal;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::time::Duration;

/// Channel sizing and timing for a [`ChartFeed`]
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// Capacity of the inbound observation channel
    pub observation_channel_capacity: usize,
    /// Capacity of the outbound update channel
    pub update_channel_capacity: usize,
    /// How long the consumer waits for an observation before re-checking
    /// channel state
    pub recv_timeout: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            observation_channel_capacity: 5_000,
            update_channel_capacity: 100,
            recv_timeout: Duration::from_millis(100),
        }
    }
}

/// Compact notification emitted for every non-ignored observation
#[derive(Debug, Clone, PartialEq)]
pub struct ChartUpdate {
    pub status: Status,
    pub direction: Direction,
    pub top: Decimal,
    pub bottom: Decimal,
    pub column_count: usize,
    pub time: i64,
}

/// Feed counters, shared with callers via [`ChartFeed::metrics`]
#[derive(Debug, Default)]
pub struct FeedMetrics {
    pub observations: AtomicU64,
    pub accepted: AtomicU64,
    pub ignored: AtomicU64,
    pub reversals: AtomicU64,
    pub backpressure_events: AtomicU64,
}

/// Point-in-time copy of the feed counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSummary {
    pub observations: u64,
    pub accepted: u64,
    pub ignored: u64,
    pub reversals: u64,
    pub backpressure_events: u64,
}

impl FeedMetrics {
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            observations: self.observations.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            reversals: self.reversals.load(Ordering::Relaxed),
            backpressure_events: self.backpressure_events.load(Ordering::Relaxed),
        }
    }
}

/// Streaming errors
#[derive(Debug, thiserror::Error)]
pub enum StreamingError {
    #[error("update channel closed")]
    ChannelClosed,
}

/// Single-chart streaming consumer.
pub struct ChartFeed {
    chart: Chart,
    observation_sender: Option<mpsc::Sender<Observation>>,
    observation_receiver: mpsc::Receiver<Observation>,
    update_sender: mpsc::Sender<ChartUpdate>,
    update_receiver: Option<mpsc::Receiver<ChartUpdate>>,
    config: StreamingConfig,
    metrics: Arc<FeedMetrics>,
}

impl ChartFeed {
    pub fn new(chart: Chart) -> Self {
        Self::with_config(chart, StreamingConfig::default())
    }

    pub fn with_config(chart: Chart, config: StreamingConfig) -> Self {
        let (observation_sender, observation_receiver) =
            mpsc::channel(config.observation_channel_capacity);
        let (update_sender, update_receiver) = mpsc::channel(config.update_channel_capacity);

        Self {
            chart,
            observation_sender: Some(observation_sender),
            observation_receiver,
            update_sender,
            update_receiver: Some(update_receiver),
            config,
            metrics: Arc::new(FeedMetrics::default()),
        }
    }

    /// Hand the observation sender to the ingestor side. One-shot.
    pub fn observation_sender(&mut self) -> Option<mpsc::Sender<Observation>> {
        self.observation_sender.take()
    }

    /// Hand the update receiver to a downstream consumer. One-shot.
    pub fn update_receiver(&mut self) -> Option<mpsc::Receiver<ChartUpdate>> {
        self.update_receiver.take()
    }

    pub fn metrics(&self) -> Arc<FeedMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    /// Consume observations until every sender is dropped, then drain and
    /// return. Observations are applied strictly in arrival order.
    pub async fn run(&mut self) -> Result<(), StreamingError> {
        loop {
            let observation = match tokio::time::timeout(
                self.config.recv_timeout,
                self.observation_receiver.recv(),
            )
            .await
            {
                Ok(Some(observation)) => observation,
                Ok(None) => {
                    // Ingestor hung up: the channel is drained, we are done
                    tracing::debug!(symbol = %self.chart.symbol(), "observation channel closed");
                    break;
                }
                Err(_) => continue,
            };

            self.metrics.observations.fetch_add(1, Ordering::Relaxed);
            let status = self.chart.add_value(observation.price, observation.time);

            let counter = match status {
                Status::Accepted => &self.metrics.accepted,
                Status::Ignored => &self.metrics.ignored,
                Status::Reversal => &self.metrics.reversals,
            };
            counter.fetch_add(1, Ordering::Relaxed);

            if status == Status::Ignored {
                continue;
            }

            let update = ChartUpdate {
                status,
                direction: self.chart.current_direction(),
                top: self.chart.current_column().top(),
                bottom: self.chart.current_column().bottom(),
                column_count: self.chart.number_of_columns(),
                time: observation.time,
            };
            self.send_update_with_backpressure(update).await?;
        }

        Ok(())
    }

    /// Recover the chart once the feed has finished.
    pub fn into_chart(self) -> Chart {
        self.chart
    }

    async fn send_update_with_backpressure(
        &self,
        update: ChartUpdate,
    ) -> Result<(), StreamingError> {
        match self.update_sender.try_send(update) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(update)) => {
                self.metrics
                    .backpressure_events
                    .fetch_add(1, Ordering::Relaxed);
                tracing::debug!("update channel full, waiting for capacity");
                self.update_sender
                    .send(update)
                    .await
                    .map_err(|_| StreamingError::ChannelClosed)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // No downstream listener: updates are advisory, keep feeding
                // the chart rather than failing the ingest path
                Ok(())
            }
        }
    }
}

/// `futures::Stream` adapter over the update channel
pub struct ChartUpdateStream {
    receiver: mpsc::Receiver<ChartUpdate>,
}

impl ChartUpdateStream {
    pub fn new(receiver: mpsc::Receiver<ChartUpdate>) -> Self {
        Self { receiver }
    }
}

impl futures::Stream for ChartUpdateStream {
    type Item = ChartUpdate;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointfig_core::{BoxScale, BoxType};
    use pointfig_core::test_utils;
    use rust_decimal_macros::dec;

    fn unit_chart(symbol: &str) -> Chart {
        Chart::new(symbol, dec!(1), 3, BoxType::Integral, BoxScale::Linear).unwrap()
    }

    #[tokio::test]
    async fn feed_matches_direct_construction() {
        let observations = test_utils::zigzag_walk(100, &[6, 5, 4, 6]);

        // Direct path
        let mut direct = unit_chart("PARITY");
        for observation in &observations {
            direct.add_value(observation.price, observation.time);
        }

        // Streamed path
        let mut feed = ChartFeed::new(unit_chart("PARITY"));
        let sender = feed.observation_sender().unwrap();
        drop(feed.update_receiver().unwrap()); // no downstream consumer
        let handle = tokio::spawn(async move {
            feed.run().await.unwrap();
            feed.into_chart()
        });

        for observation in observations {
            sender.send(observation).await.unwrap();
        }
        drop(sender);

        let streamed = handle.await.unwrap();
        assert_eq!(streamed, direct);
    }

    #[tokio::test]
    async fn updates_skip_ignored_observations() {
        let mut feed = ChartFeed::new(unit_chart("UPD"));
        let sender = feed.observation_sender().unwrap();
        let mut updates = feed.update_receiver().unwrap();
        let metrics = feed.metrics();

        let handle = tokio::spawn(async move {
            feed.run().await.unwrap();
        });

        // Seed, one ignored wiggle, one extension, one reversal
        for observation in [
            test_utils::obs("10", 0),
            test_utils::obs("10.4", 1),
            test_utils::obs("13", 2),
            test_utils::obs("10", 3),
        ] {
            sender.send(observation).await.unwrap();
        }
        drop(sender);
        handle.await.unwrap();

        let mut received = Vec::new();
        while let Ok(update) = updates.try_recv() {
            received.push(update);
        }

        assert_eq!(received.len(), 3);
        assert_eq!(received[0].status, Status::Accepted);
        assert_eq!(received[2].status, Status::Reversal);
        assert_eq!(received[2].column_count, 2);
        assert_eq!(received[2].direction, Direction::Down);

        let summary = metrics.summary();
        assert_eq!(summary.observations, 4);
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.ignored, 1);
        assert_eq!(summary.reversals, 1);
    }

    #[tokio::test]
    async fn run_drains_pending_observations_on_close() {
        let mut feed = ChartFeed::with_config(
            unit_chart("DRAIN"),
            StreamingConfig {
                observation_channel_capacity: 64,
                ..StreamingConfig::default()
            },
        );
        let sender = feed.observation_sender().unwrap();
        drop(feed.update_receiver().unwrap());

        // Queue everything before the consumer ever runs, then hang up
        for observation in test_utils::uptrend_walk(10, 20) {
            sender.send(observation).await.unwrap();
        }
        drop(sender);

        feed.run().await.unwrap();
        assert_eq!(feed.chart().current_column().top(), dec!(20));
        assert_eq!(feed.chart().current_column().bottom(), dec!(10));
    }

    #[tokio::test]
    async fn update_stream_yields_in_order() {
        use futures::StreamExt;

        let mut feed = ChartFeed::new(unit_chart("STREAM"));
        let sender = feed.observation_sender().unwrap();
        let updates = ChartUpdateStream::new(feed.update_receiver().unwrap());

        let handle = tokio::spawn(async move {
            feed.run().await.unwrap();
        });

        for observation in test_utils::uptrend_walk(10, 13) {
            sender.send(observation).await.unwrap();
        }
        drop(sender);
        handle.await.unwrap();

        let collected: Vec<ChartUpdate> = updates.collect().await;
        assert_eq!(collected.len(), 4);
        let tops: Vec<String> = collected.iter().map(|u| u.top.to_string()).collect();
        assert_eq!(tops, vec!["10", "11", "12", "13"]);
    }
}
