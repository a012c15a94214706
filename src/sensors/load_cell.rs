//! Feed-stop detector on top of the HX711 scale.
//!
//! While the motor runs the bowl weight is sampled every
//! `feed_sample_interval_ms`.  Two signals are derived:
//!
//! - **weight spread**: `max − min` over the last `N` readings
//!   (`heapless::HistoryBuffer`, no heap),
//! - **smoothed rate**: EMA of `|Δw| / Δt` in g/s.
//!
//! Each signal has its own "stopped since" timer.  Feed is judged stopped
//! when both conditions hold at once, or when either has held on its own for
//! `stop_hold_time_ms`.  Until the window has been filled once after a reset
//! the verdict is always `false`.

use heapless::HistoryBuffer;
use log::{debug, info, warn};

use crate::app::ports::ScalePort;
use crate::config::{FeederConfig, WEIGHT_WINDOW_LEN};
use crate::error::SensorError;

pub struct LoadCell<const N: usize = WEIGHT_WINDOW_LEN> {
    window: HistoryBuffer<f32, N>,
    min_weight: f32,
    max_weight: f32,

    smoothed_rate: f32,
    previous_weight: f32,
    /// Time of the reading `previous_weight` came from.
    previous_ms: u32,
    /// Time of the last attempted sample (good or failed).
    last_attempt_ms: u32,
    started: bool,

    weight_stopped_since: Option<u32>,
    rate_stopped_since: Option<u32>,

    // Tunables
    sample_interval_ms: u32,
    alpha: f32,
    weight_threshold_g: f32,
    rate_threshold: f32,
    stop_hold_ms: u32,
    tare_samples: u8,
}

impl<const N: usize> LoadCell<N> {
    pub fn new(config: &FeederConfig) -> Self {
        Self {
            window: HistoryBuffer::new(),
            min_weight: 0.0,
            max_weight: 0.0,
            smoothed_rate: 0.0,
            previous_weight: 0.0,
            previous_ms: 0,
            last_attempt_ms: 0,
            started: false,
            weight_stopped_since: None,
            rate_stopped_since: None,
            sample_interval_ms: config.feed_sample_interval_ms,
            alpha: config.feed_rate_alpha,
            weight_threshold_g: config.weight_change_threshold_g,
            rate_threshold: config.feed_rate_threshold_g_per_s,
            stop_hold_ms: config.stop_hold_time_ms,
            tare_samples: config.scale_tare_samples,
        }
    }

    /// Advance the detector.  Returns `Ok(true)` when a sample was taken.
    ///
    /// The first call after [`reset`](Self::reset) tares the scale and
    /// records a baseline; no sample is counted.
    pub fn update(&mut self, now: u32, scale: &mut impl ScalePort) -> Result<bool, SensorError> {
        if !self.started {
            self.start_up(now, scale);
            return Ok(false);
        }
        if now.wrapping_sub(self.last_attempt_ms) < self.sample_interval_ms {
            return Ok(false);
        }
        self.last_attempt_ms = now;

        let reading = match scale.read_units() {
            Ok(w) if w.is_finite() => w,
            Ok(_) => return Err(SensorError::OutOfRange),
            Err(e) => return Err(e),
        };

        let dw = (reading - self.previous_weight).abs();
        let dt = now.wrapping_sub(self.previous_ms) as f32 / 1000.0;
        let rate = if dt > 0.0 { dw / dt } else { 0.0 };
        self.smoothed_rate = self.alpha * rate + (1.0 - self.alpha) * self.smoothed_rate;

        self.window.write(reading);
        let (min, max) = self
            .window
            .as_slice()
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &w| {
                (lo.min(w), hi.max(w))
            });
        self.min_weight = min;
        self.max_weight = max;

        debug!(
            "LoadCell: window={:?} spread={:.3}g rate={:.3}g/s",
            self.window.as_slice(),
            self.weight_spread(),
            self.smoothed_rate
        );

        self.previous_weight = reading;
        self.previous_ms = now;
        Ok(true)
    }

    fn start_up(&mut self, now: u32, scale: &mut impl ScalePort) {
        if let Err(e) = scale.tare(self.tare_samples) {
            warn!("LoadCell: tare failed ({e}), keeping previous offset");
        }
        self.previous_weight = match scale.read_units() {
            Ok(w) if w.is_finite() => w,
            _ => 0.0,
        };
        self.previous_ms = now;
        self.last_attempt_ms = now;
        self.started = true;
        info!("LoadCell: baseline {:.2} g", self.previous_weight);
    }

    /// Feed-stop verdict.  Mutates the hysteresis timers, so call it once
    /// per evaluation.
    pub fn should_stop(&mut self, now: u32) -> bool {
        if !self.window_full() {
            return false;
        }

        let weight_cond = self.weight_spread() < self.weight_threshold_g;
        let rate_cond = self.smoothed_rate < self.rate_threshold;

        let weight_stuck = Self::track(&mut self.weight_stopped_since, weight_cond, now, self.stop_hold_ms);
        let rate_stuck = Self::track(&mut self.rate_stopped_since, rate_cond, now, self.stop_hold_ms);

        if weight_cond {
            debug!("LoadCell: weight condition met");
        }
        if rate_cond {
            debug!("LoadCell: rate condition met");
        }

        (weight_cond && rate_cond) || weight_stuck || rate_stuck
    }

    /// Arm / clear one hysteresis timer and report whether it is stuck.
    fn track(since: &mut Option<u32>, cond: bool, now: u32, hold_ms: u32) -> bool {
        if !cond {
            *since = None;
            return false;
        }
        let t = *since.get_or_insert(now);
        now.wrapping_sub(t) >= hold_ms
    }

    /// Clear everything; the next [`update`](Self::update) re-tares.
    pub fn reset(&mut self) {
        self.window.clear();
        self.min_weight = 0.0;
        self.max_weight = 0.0;
        self.smoothed_rate = 0.0;
        self.previous_weight = 0.0;
        self.previous_ms = 0;
        self.last_attempt_ms = 0;
        self.started = false;
        self.weight_stopped_since = None;
        self.rate_stopped_since = None;
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn window_full(&self) -> bool {
        self.window.len() == N
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    pub fn smoothed_rate(&self) -> f32 {
        self.smoothed_rate
    }

    pub fn weight_spread(&self) -> f32 {
        self.max_weight - self.min_weight
    }
}
