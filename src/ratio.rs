//! Clock Ratios and Hysteresis Quantization
//!
//! The clocked path locks the generator to a rational multiple of an external
//! clock. The multiple is picked from a fixed, ordered table by a quantizer
//! with a dead-band around each boundary, so a noisy control voltage sitting
//! near a boundary does not flip between two neighbouring ratios.

use serde::{Deserialize, Serialize};

/// Default dead-band, in table index units
pub const DEFAULT_HYSTERESIS: f32 = 0.25;

/// A frequency ratio relative to an external clock.
///
/// The generator runs at `multiplier` times the clock rate and is re-aligned
/// with the clock every `subdivision` clock pulses. For every entry of
/// [`RATIOS`], `multiplier * subdivision` is a whole number of cycles, so the
/// re-alignment lands on a cycle boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ratio {
    pub multiplier: f32,
    pub subdivision: u32,
}

impl Ratio {
    pub const fn new(multiplier: f32, subdivision: u32) -> Self {
        Self {
            multiplier,
            subdivision,
        }
    }

    pub const UNITY: Ratio = Ratio::new(1.0, 1);
}

impl Default for Ratio {
    fn default() -> Self {
        Self::UNITY
    }
}

/// Clock ratios, ordered from slowest to fastest.
///
/// Unity is listed twice so it owns a wider slice of the control range.
pub const RATIOS: [Ratio; 20] = [
    Ratio::new(0.0625, 16),
    Ratio::new(0.125, 8),
    Ratio::new(0.166_666_6, 6),
    Ratio::new(0.25, 4),
    Ratio::new(0.333_333_3, 3),
    Ratio::new(0.5, 2),
    Ratio::new(0.666_666_6, 3),
    Ratio::new(0.75, 4),
    Ratio::new(0.8, 5),
    Ratio::new(1.0, 1),
    Ratio::new(1.0, 1),
    Ratio::new(1.25, 4),
    Ratio::new(1.333_333_3, 3),
    Ratio::new(1.5, 2),
    Ratio::new(2.0, 1),
    Ratio::new(3.0, 1),
    Ratio::new(4.0, 1),
    Ratio::new(6.0, 1),
    Ratio::new(8.0, 1),
    Ratio::new(16.0, 1),
];

/// Map a transposition in semitones onto the `[0, 1]` ratio selector.
///
/// Roughly +/-48 semitones sweep the whole table, centred on unity.
#[inline]
pub fn ratio_selector(transposition: f32) -> f32 {
    0.5 + transposition * 0.0105
}

/// Quantizes a continuous value to a table index with hysteresis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HysteresisQuantizer {
    quantized: Option<usize>,
}

impl HysteresisQuantizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the current index; the next call rounds without bias.
    pub fn reset(&mut self) {
        self.quantized = None;
    }

    /// Last index returned, if any
    pub fn current(&self) -> Option<usize> {
        self.quantized
    }

    #[inline]
    pub fn process(&mut self, value: f32, num_steps: usize) -> usize {
        self.process_with(value, num_steps, DEFAULT_HYSTERESIS)
    }

    /// Quantize `value` in `[0, 1]` to an index in `[0, num_steps - 1]`.
    pub fn process_with(&mut self, value: f32, num_steps: usize, hysteresis: f32) -> usize {
        if num_steps == 0 {
            return 0;
        }
        let max_index = num_steps - 1;
        if value.is_nan() {
            return self.quantized.unwrap_or(0).min(max_index);
        }

        let scaled = value * max_index as f32;
        let feedback = match self.quantized {
            Some(q) if scaled > q as f32 => -hysteresis,
            Some(_) => hysteresis,
            None => 0.0,
        };
        let rounded = libm::floorf(scaled + feedback + 0.5);
        let index = if rounded <= 0.0 {
            0
        } else {
            (rounded as usize).min(max_index)
        };
        self.quantized = Some(index);
        index
    }

    /// Quantize `value` and return the matching table entry.
    ///
    /// # Panics
    ///
    /// Panics if `table` is empty.
    #[inline]
    pub fn lookup<'a, T>(&mut self, table: &'a [T], value: f32) -> &'a T {
        &table[self.process(value, table.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_ratio_table_realigns_on_whole_cycles() {
        for ratio in RATIOS {
            let cycles = ratio.multiplier * ratio.subdivision as f32;
            assert_abs_diff_eq!(cycles, libm::roundf(cycles), epsilon = 1e-4);
            assert!(ratio.subdivision >= 1);
        }
    }

    #[test]
    fn test_ratio_table_is_ordered() {
        for pair in RATIOS.windows(2) {
            assert!(pair[0].multiplier <= pair[1].multiplier);
        }
        assert_eq!(RATIOS[0].multiplier, 0.0625);
        assert_eq!(RATIOS[19].multiplier, 16.0);
    }

    #[test]
    fn test_quantizer_nearest_index() {
        let mut q = HysteresisQuantizer::new();
        assert_eq!(q.process(0.0, 20), 0);
        q.reset();
        assert_eq!(q.process(1.0, 20), 19);
        q.reset();
        // 0.5 * 19 = 9.5 rounds up without bias
        assert_eq!(q.process(0.5, 20), 10);
    }

    #[test]
    fn test_quantizer_hysteresis_holds_on_return() {
        let mut q = HysteresisQuantizer::new();
        let step = 1.0 / 19.0;

        assert_eq!(q.process(4.0 * step, 20), 4);
        // Just past the 4/5 boundary, inside the dead-band: stays at 4
        assert_eq!(q.process(4.6 * step, 20), 4);
        // Well past it: moves to 5
        assert_eq!(q.process(4.8 * step, 20), 5);
        // Back just below the boundary, inside the dead-band: stays at 5
        assert_eq!(q.process(4.4 * step, 20), 5);
        // Far enough back: returns to 4
        assert_eq!(q.process(4.2 * step, 20), 4);
    }

    #[test]
    fn test_quantizer_reset_removes_bias() {
        let mut q = HysteresisQuantizer::new();
        let step = 1.0 / 19.0;
        q.process(5.0 * step, 20);
        assert_eq!(q.process(4.4 * step, 20), 5);
        q.reset();
        assert_eq!(q.process(4.4 * step, 20), 4);
    }

    #[test]
    fn test_quantizer_clamps_and_survives_nan() {
        let mut q = HysteresisQuantizer::new();
        assert_eq!(q.process(-3.0, 20), 0);
        assert_eq!(q.process(7.0, 20), 19);
        assert_eq!(q.process(f32::NAN, 20), 19);
        assert_eq!(q.process(0.5, 0), 0);
    }

    #[test]
    fn test_lookup_unity_in_the_middle() {
        let mut q = HysteresisQuantizer::new();
        let ratio = q.lookup(&RATIOS, ratio_selector(0.0));
        assert_eq!(*ratio, Ratio::UNITY);

        q.reset();
        let ratio = q.lookup(&RATIOS, ratio_selector(48.0));
        assert_eq!(ratio.multiplier, 16.0);
    }
}
