//! Ramp Extraction from an External Clock
//!
//! Measures the period between rising clock edges, smooths it to reject
//! jitter, and rebuilds a continuous phase ramp running at a rational
//! multiple of the clock.
//!
//! # Phase reconstruction
//!
//! At control rate a "train phase" counts clock periods since the last
//! re-alignment. Every `ratio.subdivision` edges the train restarts at zero;
//! edges in between snap it to the number of pulses seen so far, so timing
//! errors never accumulate. The output ramp is `frac(train * multiplier)`.
//! The train stops at `subdivision` periods, which freezes the ramp when the
//! clock stops instead of running away at a stale tempo.
//!
//! At audio rate the clock is treated as a pitch source: only the frequency is
//! tracked and the ramp free-runs.

use crate::gate::GateFlag;
use crate::ratio::Ratio;
use crate::units::{sanitize_frequency, wrap};
use serde::{Deserialize, Serialize};

/// Clock rate assumed before any period has been measured, in Hz
const DEFAULT_CLOCK_HZ: f32 = 2.0;

/// Bounds of the per-edge smoothing coefficient
const MIN_TRACKING: f32 = 0.1;
const MAX_TRACKING: f32 = 0.5;

/// A gap this many times longer than the estimate means the clock stopped
const STALE_FACTOR: f32 = 4.0;

/// Shortest trackable period, in samples
const MIN_PERIOD: f32 = 2.0;

/// Longest trackable period, in seconds
const MAX_PERIOD_SECONDS: f32 = 60.0;

/// Smoothing time used when none is configured, in seconds
pub const DEFAULT_RECOVERY_TIME: f32 = 1.0 / 40.0;

/// Rebuilds a phase ramp from a stream of clock edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RampExtractor {
    sample_rate: f32,
    recovery_time: f32,
    max_period: f32,

    /// Samples since the last rising edge (`None` before the first edge)
    elapsed: Option<u32>,
    /// Smoothed period in samples, once one has been measured
    period: Option<f32>,
    /// Clock frequency in cycles per sample
    frequency: f32,
    /// Set when the next measurement must be adopted without smoothing
    resync: bool,

    train_phase: f32,
    max_train_phase: f32,
    reset_counter: u32,
    multiplier: f32,
    audio_phase: f32,
}

impl Default for RampExtractor {
    fn default() -> Self {
        let mut extractor = Self {
            sample_rate: 48000.0,
            recovery_time: DEFAULT_RECOVERY_TIME,
            max_period: 0.0,
            elapsed: None,
            period: None,
            frequency: 0.0,
            resync: true,
            train_phase: 0.0,
            max_train_phase: 1.0,
            reset_counter: 0,
            multiplier: 1.0,
            audio_phase: 0.0,
        };
        extractor.init(48000.0, DEFAULT_RECOVERY_TIME);
        extractor
    }
}

impl RampExtractor {
    pub fn new(sample_rate: f32, recovery_time: f32) -> Self {
        let mut extractor = Self::default();
        extractor.init(sample_rate, recovery_time);
        extractor
    }

    /// Configure the rate-dependent constants and clear all timing state.
    ///
    /// `recovery_time` (seconds) is the time constant of the period
    /// smoother: roughly how long a tempo change takes to settle.
    pub fn init(&mut self, sample_rate: f32, recovery_time: f32) {
        self.sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            48000.0
        };
        self.recovery_time = if recovery_time.is_finite() && recovery_time > 0.0 {
            recovery_time
        } else {
            DEFAULT_RECOVERY_TIME
        };
        self.max_period = MAX_PERIOD_SECONDS * self.sample_rate;
        self.reset();
    }

    /// Forget the measured period and phase.
    ///
    /// Call whenever a clock source is (re)connected so a period measured on
    /// the old signal is never applied to the new one.
    pub fn reset(&mut self) {
        self.elapsed = None;
        self.period = None;
        self.frequency = DEFAULT_CLOCK_HZ / self.sample_rate;
        self.resync = true;
        self.train_phase = 0.0;
        self.max_train_phase = 1.0;
        self.reset_counter = 0;
        self.multiplier = 1.0;
        self.audio_phase = 0.0;
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Smoothed clock period in samples, once at least two edges were seen
    pub fn period(&self) -> Option<f32> {
        self.period
    }

    /// Current clock frequency estimate in cycles per sample
    pub fn clock_frequency(&self) -> f32 {
        self.frequency
    }

    /// Per-edge smoothing coefficient for a measured period
    fn tracking_coefficient(&self, measured: f32) -> f32 {
        let seconds = measured / self.sample_rate;
        (1.0 - libm::expf(-seconds / self.recovery_time)).clamp(MIN_TRACKING, MAX_TRACKING)
    }

    /// Update the period estimate with the duration ending at this edge.
    ///
    /// Only the first long gap is discarded. If the next gap is long as well
    /// the clock really slowed down, and that measurement is adopted as is.
    fn measure(&mut self, measured: f32) {
        let stale = match self.period {
            Some(period) if !self.resync => measured > STALE_FACTOR * period,
            _ => false,
        };
        if stale {
            // The clock was stopped; this gap says nothing about the tempo
            self.resync = true;
            self.reset_counter = 0;
            return;
        }

        let period = match self.period {
            Some(period) if !self.resync => {
                period + self.tracking_coefficient(measured) * (measured - period)
            }
            _ => measured,
        };
        let period = period.clamp(MIN_PERIOD, self.max_period.max(MIN_PERIOD));
        self.period = Some(period);
        self.frequency = 1.0 / period;
        self.resync = false;
    }

    /// Process one block of clock flags into a phase ramp.
    ///
    /// Returns the output frequency (clock frequency times the ratio
    /// multiplier) in cycles per sample, never zero, negative or infinite.
    ///
    /// `ramp` and `flags` must have the same length.
    pub fn process(
        &mut self,
        is_audio_range: bool,
        allow_ar_mode: bool,
        ratio: Ratio,
        flags: &[GateFlag],
        ramp: &mut [f32],
    ) -> f32 {
        debug_assert_eq!(flags.len(), ramp.len());
        let subdivision = ratio.subdivision.max(1);
        let multiplier = if ratio.multiplier.is_finite() && ratio.multiplier > 0.0 {
            ratio.multiplier
        } else {
            1.0
        };

        for (&flag, out) in flags.iter().zip(ramp.iter_mut()) {
            if flag.is_rising() {
                if let Some(elapsed) = self.elapsed {
                    self.measure(elapsed as f32);
                }
                self.elapsed = Some(0);

                if allow_ar_mode {
                    self.train_phase = 0.0;
                    self.max_train_phase = 1.0;
                    self.reset_counter = 0;
                    self.multiplier = multiplier;
                } else if self.reset_counter == 0 {
                    self.reset_counter = subdivision;
                    self.train_phase = 0.0;
                    self.max_train_phase = subdivision as f32;
                    self.multiplier = multiplier;
                } else {
                    let pulses = (self.max_train_phase as u32).saturating_sub(self.reset_counter);
                    self.train_phase = pulses as f32;
                }
                self.reset_counter = self.reset_counter.saturating_sub(1);
            }

            if let Some(elapsed) = self.elapsed.as_mut() {
                *elapsed = elapsed.saturating_add(1);
            }

            *out = if self.period.is_none() {
                // Nothing measured yet: hold
                if is_audio_range {
                    self.audio_phase
                } else {
                    self.train_output(allow_ar_mode)
                }
            } else if is_audio_range && !allow_ar_mode {
                self.audio_phase = wrap(self.audio_phase + self.frequency * multiplier);
                self.audio_phase
            } else {
                let cap = if allow_ar_mode {
                    1.0 / self.multiplier
                } else {
                    self.max_train_phase
                };
                self.train_phase = (self.train_phase + self.frequency).min(cap);
                self.train_output(allow_ar_mode)
            };
        }

        sanitize_frequency(self.frequency * multiplier)
    }

    #[inline]
    fn train_output(&self, allow_ar_mode: bool) -> f32 {
        let phase = self.train_phase * self.multiplier;
        if allow_ar_mode {
            phase.clamp(0.0, 1.0)
        } else {
            wrap(phase)
        }
    }
}
