use std::time::{Duration, Instant};

use rforge_stream::DataFrame;
use tracing::debug;

/// Slowest accepted playback speed.
pub const MIN_SPEED: f64 = 0.01;
/// Fastest accepted playback speed.
pub const MAX_SPEED: f64 = 1000.0;

/// Wall-clock pacing of recorded frames.
///
/// Driven by an external timer: each [`tick`](Self::tick) returns the frames
/// whose timestamps have come due since the last one. Playback only moves
/// forward; a frame is never returned twice unless [`seek_start`](Self::seek_start)
/// rewinds.
#[derive(Debug)]
pub struct Playback {
    frames: Vec<DataFrame>,
    cursor: usize,
    speed: f64,
    /// Source time reached so far.
    position_us: u64,
    /// Wall instant and source time the clock runs from while playing.
    anchor: Option<(Instant, u64)>,
}

impl Playback {
    /// Prepare playback of `frames`, sorted by timestamp (stable).
    pub fn new(mut frames: Vec<DataFrame>) -> Self {
        frames.sort_by_key(|f| f.timestamp_us);
        let position_us = frames.first().map_or(0, |f| f.timestamp_us);
        Self {
            frames,
            cursor: 0,
            speed: 1.0,
            position_us,
            anchor: None,
        }
    }

    /// Start or resume the clock at `now`.
    pub fn start(&mut self, now: Instant) {
        if self.anchor.is_none() {
            self.anchor = Some((now, self.position_us));
            debug!(position_us = self.position_us, speed = self.speed, "playback started");
        }
    }

    /// Stop the clock, keeping the current position.
    pub fn pause(&mut self, now: Instant) {
        if self.anchor.is_some() {
            self.position_us = self.target(now);
            self.anchor = None;
        }
    }

    /// Change speed, re-anchoring at the current position so already
    /// elapsed time is not rescaled. Non-finite values are ignored.
    pub fn set_speed(&mut self, speed: f64, now: Instant) {
        if !speed.is_finite() {
            return;
        }
        if self.anchor.is_some() {
            self.position_us = self.target(now);
            self.anchor = Some((now, self.position_us));
        }
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
    }

    /// Rewind to the first frame. A running clock keeps running from `now`.
    pub fn seek_start(&mut self, now: Instant) {
        self.cursor = 0;
        self.position_us = self.frames.first().map_or(0, |f| f.timestamp_us);
        if self.anchor.is_some() {
            self.anchor = Some((now, self.position_us));
        }
    }

    /// Frames due at `now`, in order. Empty while paused.
    pub fn tick(&mut self, now: Instant) -> &[DataFrame] {
        if self.anchor.is_none() {
            return &[];
        }
        let target = self.target(now);
        self.position_us = target;

        let from = self.cursor;
        let due = self.frames[from..]
            .iter()
            .take_while(|f| f.timestamp_us <= target)
            .count();
        self.cursor += due;
        &self.frames[from..self.cursor]
    }

    /// Wall time until the next frame is due, if playing and not finished.
    pub fn next_due_in(&self, now: Instant) -> Option<Duration> {
        self.anchor?;
        let next = self.frames.get(self.cursor)?.timestamp_us;
        let ahead_us = next.saturating_sub(self.target(now));
        Some(Duration::from_secs_f64(ahead_us as f64 / self.speed / 1e6))
    }

    fn target(&self, now: Instant) -> u64 {
        match self.anchor {
            Some((at, ts)) => {
                let elapsed_us = now.saturating_duration_since(at).as_micros() as f64;
                ts.saturating_add((elapsed_us * self.speed) as u64)
            }
            None => self.position_us,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.frames.len()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn position_us(&self) -> u64 {
        self.position_us
    }

    /// Frames already emitted.
    pub fn emitted(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames_every_10ms(n: u64) -> Vec<DataFrame> {
        (0..n)
            .map(|i| DataFrame::from_values(1_000_000 + i * 10_000, [i as f64]))
            .collect()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn first_tick_emits_first_frame() {
        let mut playback = Playback::new(frames_every_10ms(5));
        let t0 = Instant::now();
        playback.start(t0);
        assert_eq!(playback.tick(t0).len(), 1);
    }

    #[test]
    fn ticks_emit_due_frames_once() {
        let mut playback = Playback::new(frames_every_10ms(10));
        let t0 = Instant::now();
        playback.start(t0);

        assert_eq!(playback.tick(t0 + ms(25)).len(), 3);
        assert!(playback.tick(t0 + ms(25)).is_empty());
        let next: Vec<f64> = playback
            .tick(t0 + ms(45))
            .iter()
            .map(|f| f.channels[0].value)
            .collect();
        assert_eq!(next, vec![3.0, 4.0]);
        assert_eq!(playback.emitted(), 5);

        assert_eq!(playback.tick(t0 + ms(1000)).len(), 5);
        assert!(playback.is_finished());
    }

    #[test]
    fn speed_scales_source_time() {
        let mut playback = Playback::new(frames_every_10ms(10));
        playback.set_speed(2.0, Instant::now());
        let t0 = Instant::now();
        playback.start(t0);
        assert_eq!(playback.tick(t0 + ms(20)).len(), 5);
    }

    #[test]
    fn set_speed_reanchors() {
        let mut playback = Playback::new(frames_every_10ms(20));
        let t0 = Instant::now();
        playback.start(t0);
        assert_eq!(playback.tick(t0 + ms(30)).len(), 4);

        playback.set_speed(4.0, t0 + ms(30));
        // 10 ms wall at 4x is 40 ms of source: frames at 40..70 ms.
        assert_eq!(playback.tick(t0 + ms(40)).len(), 4);
        assert_eq!(playback.position_us(), 1_070_000);
    }

    #[test]
    fn pause_freezes_position() {
        let mut playback = Playback::new(frames_every_10ms(10));
        let t0 = Instant::now();
        playback.start(t0);
        playback.tick(t0 + ms(15));
        playback.pause(t0 + ms(15));
        assert!(!playback.is_playing());
        assert!(playback.tick(t0 + ms(500)).is_empty());

        playback.start(t0 + ms(500));
        assert_eq!(playback.tick(t0 + ms(510)).len(), 1);
        assert_eq!(playback.emitted(), 3);
    }

    #[test]
    fn seek_start_rewinds() {
        let mut playback = Playback::new(frames_every_10ms(3));
        let t0 = Instant::now();
        playback.start(t0);
        playback.tick(t0 + ms(100));
        assert!(playback.is_finished());

        playback.seek_start(t0 + ms(100));
        assert!(!playback.is_finished());
        assert_eq!(playback.tick(t0 + ms(100)).len(), 1);
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let frames = vec![
            DataFrame::from_values(30, [3.0]),
            DataFrame::from_values(10, [1.0]),
            DataFrame::from_values(20, [2.0]),
        ];
        let mut playback = Playback::new(frames);
        let t0 = Instant::now();
        playback.start(t0);
        let values: Vec<f64> = playback
            .tick(t0 + ms(1))
            .iter()
            .map(|f| f.channels[0].value)
            .collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn next_due_in_accounts_for_speed() {
        let mut playback = Playback::new(frames_every_10ms(3));
        let t0 = Instant::now();
        assert_eq!(playback.next_due_in(t0), None);
        playback.set_speed(2.0, t0);
        playback.start(t0);
        playback.tick(t0);
        assert_eq!(playback.next_due_in(t0), Some(ms(5)));
    }

    #[test]
    fn speed_is_clamped() {
        let mut playback = Playback::new(Vec::new());
        playback.set_speed(0.0, Instant::now());
        assert_eq!(playback.speed(), MIN_SPEED);
        playback.set_speed(f64::NAN, Instant::now());
        assert_eq!(playback.speed(), MIN_SPEED);
        assert!(playback.is_finished());
    }
}
