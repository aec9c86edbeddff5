use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::frame::DataFrame;

/// Default ring capacity in frames.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Default subscriber queue depth.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 1024;

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Frames kept before the oldest is evicted.
    pub capacity: usize,
    /// Per-subscriber queue depth; slow subscribers observe `Lagged`.
    pub subscriber_buffer: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

/// Summary of one channel over a window of frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelStats {
    pub sample_count: usize,
    pub mean: f64,
    pub peak_to_peak: f64,
    /// Rising zero-crossing rate; 0.0 when no periodic signal is detected.
    pub frequency_hz: f64,
}

/// Bounded FIFO of decoded frames with live fan-out.
///
/// Appends past capacity evict the oldest frame. Every appended frame is
/// also broadcast to subscribers.
#[derive(Debug)]
pub struct DataAggregator {
    frames: Mutex<VecDeque<DataFrame>>,
    capacity: usize,
    tx: broadcast::Sender<DataFrame>,
}

impl DataAggregator {
    pub fn new() -> Self {
        Self::with_config(AggregatorConfig::default())
    }

    pub fn with_config(config: AggregatorConfig) -> Self {
        let capacity = config.capacity.max(1);
        let (tx, _) = broadcast::channel(config.subscriber_buffer.max(1));
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity,
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<DataFrame>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Receive every frame appended from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DataFrame> {
        self.tx.subscribe()
    }

    /// Append a frame, evicting the oldest past capacity, and notify subscribers.
    pub fn append(&self, frame: DataFrame) {
        {
            let mut frames = self.lock();
            while frames.len() >= self.capacity {
                frames.pop_front();
            }
            frames.push_back(frame.clone());
        }
        // No subscribers is fine.
        let _ = self.tx.send(frame);
    }

    /// Up to `max_count` most recent frames, oldest first.
    pub fn recent(&self, max_count: usize) -> Vec<DataFrame> {
        let frames = self.lock();
        let skip = frames.len().saturating_sub(max_count);
        frames.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Statistics for `channel_id` over the `window` most recent frames.
    pub fn channel_stats(&self, channel_id: u16, window: usize) -> Option<ChannelStats> {
        channel_stats(&self.recent(window), channel_id)
    }
}

impl Default for DataAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for `channel_id` across `frames` (chronological order).
///
/// Returns `None` when the channel has no samples.
pub fn channel_stats(frames: &[DataFrame], channel_id: u16) -> Option<ChannelStats> {
    let samples: Vec<(u64, f64)> = frames
        .iter()
        .flat_map(|frame| {
            frame
                .channels
                .iter()
                .filter(move |c| c.channel_id == channel_id)
                .map(move |c| (frame.timestamp_us, c.value))
        })
        .collect();
    if samples.is_empty() {
        return None;
    }

    let (min, max, sum) = samples.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(min, max, sum), &(_, v)| (min.min(v), max.max(v), sum + v),
    );

    Some(ChannelStats {
        sample_count: samples.len(),
        mean: sum / samples.len() as f64,
        peak_to_peak: max - min,
        frequency_hz: zero_crossing_frequency(&samples),
    })
}

/// Estimate frequency from rising zero crossings (`prev <= 0 && cur > 0`).
fn zero_crossing_frequency(samples: &[(u64, f64)]) -> f64 {
    if samples.len() < 3 {
        return 0.0;
    }
    let crossings: Vec<u64> = samples
        .windows(2)
        .filter(|w| w[0].1 <= 0.0 && w[1].1 > 0.0)
        .map(|w| w[1].0)
        .collect();
    let (Some(&first), Some(&last)) = (crossings.first(), crossings.last()) else {
        return 0.0;
    };
    if crossings.len() < 2 || last <= first {
        return 0.0;
    }
    (crossings.len() - 1) as f64 * 1_000_000.0 / (last - first) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ChannelValue;

    fn frame(ts: u64, values: &[f64]) -> DataFrame {
        DataFrame::from_values(ts, values.iter().copied())
    }

    #[test]
    fn eviction_is_fifo() {
        let agg = DataAggregator::with_config(AggregatorConfig {
            capacity: 3,
            ..AggregatorConfig::default()
        });
        for ts in 0..5 {
            agg.append(frame(ts, &[ts as f64]));
        }
        assert_eq!(agg.len(), 3);
        let ts: Vec<u64> = agg.recent(10).iter().map(|f| f.timestamp_us).collect();
        assert_eq!(ts, vec![2, 3, 4]);
    }

    #[test]
    fn recent_returns_newest_in_order() {
        let agg = DataAggregator::new();
        for ts in 0..10 {
            agg.append(frame(ts, &[0.0]));
        }
        let ts: Vec<u64> = agg.recent(3).iter().map(|f| f.timestamp_us).collect();
        assert_eq!(ts, vec![7, 8, 9]);
        assert!(agg.recent(0).is_empty());
    }

    #[test]
    fn stats_mean_and_peak_to_peak() {
        let frames = vec![frame(0, &[1.0]), frame(1, &[3.0]), frame(2, &[-1.0])];
        let stats = channel_stats(&frames, 0).unwrap();
        assert_eq!(stats.sample_count, 3);
        assert!((stats.mean - 1.0).abs() < 1e-12);
        assert_eq!(stats.peak_to_peak, 4.0);
        assert_eq!(stats.frequency_hz, 0.0);
    }

    #[test]
    fn stats_for_missing_channel_is_none() {
        let frames = vec![frame(0, &[1.0])];
        assert!(channel_stats(&frames, 5).is_none());
        assert!(channel_stats(&[], 0).is_none());
    }

    #[test]
    fn stats_pick_matching_channel_only() {
        let frames = vec![
            DataFrame::new(0, vec![ChannelValue::new(2, 10.0), ChannelValue::new(3, 0.0)]),
            DataFrame::new(1, vec![ChannelValue::new(3, 5.0)]),
        ];
        let stats = channel_stats(&frames, 2).unwrap();
        assert_eq!(stats.sample_count, 1);
        assert_eq!(stats.mean, 10.0);
    }

    #[test]
    fn sine_frequency_within_tolerance() {
        let agg = DataAggregator::new();
        let rate_hz = 100.0;
        let signal_hz = 2.0;
        for i in 0..500u64 {
            let t = i as f64 / rate_hz;
            let value = (2.0 * std::f64::consts::PI * signal_hz * t).sin();
            agg.append(frame(i * 10_000, &[value]));
        }

        let stats = agg.channel_stats(0, 500).unwrap();
        assert_eq!(stats.sample_count, 500);
        assert!(
            (stats.frequency_hz - 2.0).abs() < 0.2,
            "estimated {}",
            stats.frequency_hz
        );
        assert!((stats.peak_to_peak - 2.0).abs() < 0.01);
    }

    #[test]
    fn single_crossing_reports_zero_frequency() {
        let frames: Vec<_> = [-1.0, -0.5, 0.5, 1.0]
            .iter()
            .enumerate()
            .map(|(i, &v)| frame(i as u64, &[v]))
            .collect();
        assert_eq!(channel_stats(&frames, 0).unwrap().frequency_hz, 0.0);
    }

    #[test]
    fn simultaneous_crossings_report_zero_frequency() {
        let frames = vec![
            frame(5, &[-1.0]),
            frame(5, &[1.0]),
            frame(5, &[-1.0]),
            frame(5, &[1.0]),
        ];
        assert_eq!(channel_stats(&frames, 0).unwrap().frequency_hz, 0.0);
    }

    #[tokio::test]
    async fn subscribers_receive_appends() {
        let agg = DataAggregator::new();
        let mut rx = agg.subscribe();
        agg.append(frame(42, &[1.0, 2.0]));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.timestamp_us, 42);
        assert_eq!(received.channels.len(), 2);
    }

    #[test]
    fn append_without_subscribers_is_fine() {
        let agg = DataAggregator::new();
        agg.append(frame(1, &[1.0]));
        agg.clear();
        assert!(agg.is_empty());
    }
}
