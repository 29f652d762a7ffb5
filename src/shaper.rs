//! Ramp Transfer Curves
//!
//! A raw phase ramp becomes an audible shape in three stages:
//!
//! ```text
//! phase --slope--> triangle --shape--> curve --smoothness--> output
//! ```
//!
//! - **slope** sets the rise/fall asymmetry (saw down .. triangle .. saw up)
//! - **shape** morphs the curvature of both segments (expo .. linear .. log .. sine .. steep)
//! - **smoothness** low-pass filters corners below 0.5 and folds above 0.5

use serde::{Deserialize, Serialize};

/// Slope point limits; keep both segments at least this long
const MIN_PW: f32 = 0.001;
const MAX_PW: f32 = 1.0 - MIN_PW;

/// Curvature of the exponential and logarithmic families
const CURVE_AMOUNT: f32 = 4.0;

/// Number of curve families morphed by the shape control
const NUM_SHAPES: usize = 5;

/// Clamp a slope (pulse width) parameter to a usable slope point.
#[inline]
pub fn slope_point(slope: f32) -> f32 {
    slope.clamp(MIN_PW, MAX_PW)
}

/// Triangle transfer: rises 0→1 over `[0, pw)`, falls 1→0 over `[pw, 1]`.
#[inline]
pub fn slope(phase: f32, pw: f32) -> f32 {
    let pw = slope_point(pw);
    if phase < pw {
        (phase / pw).max(0.0)
    } else {
        (1.0 - (phase - pw) / (1.0 - pw)).clamp(0.0, 1.0)
    }
}

#[inline]
fn exponential(x: f32) -> f32 {
    (libm::expf(CURVE_AMOUNT * x) - 1.0) / (libm::expf(CURVE_AMOUNT) - 1.0)
}

#[inline]
fn logarithmic(x: f32) -> f32 {
    1.0 - exponential(1.0 - x)
}

#[inline]
fn raised_cosine(x: f32) -> f32 {
    0.5 - 0.5 * libm::cosf(core::f32::consts::PI * x)
}

#[inline]
fn steep(x: f32) -> f32 {
    // smoothstep applied twice
    let s = x * x * (3.0 - 2.0 * x);
    s * s * (3.0 - 2.0 * s)
}

#[inline]
fn family(index: usize, x: f32) -> f32 {
    match index {
        0 => exponential(x),
        1 => x,
        2 => logarithmic(x),
        3 => raised_cosine(x),
        _ => steep(x),
    }
}

/// Bend a `[0, 1]` value along the curve family selected by `shape`.
///
/// Adjacent families are crossfaded, and every family maps 0 to 0 and 1 to 1.
#[inline]
pub fn shape(x: f32, shape: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    let position = shape.clamp(0.0, 1.0) * (NUM_SHAPES - 1) as f32;
    let index = (libm::floorf(position) as usize).min(NUM_SHAPES - 2);
    let fraction = position - index as f32;
    let a = family(index, x);
    let b = family(index + 1, x);
    (a + (b - a) * fraction).clamp(0.0, 1.0)
}

/// Per-channel smoothing stage driven by the smoothness control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Smoother {
    state: f32,
    primed: bool,
}

impl Smoother {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
        self.primed = false;
    }

    /// Process one bipolar sample in `[-1, 1]`.
    ///
    /// `frequency` (cycles/sample) sets the filter cutoff so the amount of
    /// rounding looks the same at every pitch.
    #[inline]
    pub fn process(&mut self, input: f32, frequency: f32, smoothness: f32) -> f32 {
        if !self.primed {
            self.state = input;
            self.primed = true;
        }

        if smoothness < 0.5 {
            let amount = 1.0 - 2.0 * smoothness;
            // Cutoff from 64x the ramp frequency down to the ramp frequency
            let cutoff = frequency * libm::exp2f(6.0 * (1.0 - amount));
            let coefficient = (2.0 * core::f32::consts::PI * cutoff).min(1.0);
            self.state += coefficient * (input - self.state);
            input + (self.state - input) * amount
        } else {
            self.state = input;
            if smoothness > 0.5 {
                let amount = 2.0 * smoothness - 1.0;
                let gain = 1.0 + 3.0 * amount;
                let folded = libm::sinf(core::f32::consts::FRAC_PI_2 * input * gain);
                input + (folded - input) * amount
            } else {
                input
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_slope_triangle() {
        assert_abs_diff_eq!(slope(0.0, 0.5), 0.0);
        assert_abs_diff_eq!(slope(0.25, 0.5), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(slope(0.5, 0.5), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(slope(0.75, 0.5), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(slope(1.0, 0.5), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_slope_extremes_stay_finite() {
        for pw in [0.0, 1.0, -1.0, 2.0] {
            for i in 0..=100 {
                let y = slope(i as f32 / 100.0, pw);
                assert!(y.is_finite());
                assert!((0.0..=1.0).contains(&y));
            }
        }
        // slope 0 is a falling saw, slope 1 a rising saw
        assert!(slope(0.01, 0.0) > 0.98);
        assert!(slope(0.99, 1.0) > 0.98);
    }

    #[test]
    fn test_shape_endpoints() {
        for s in [0.0, 0.1, 0.25, 0.4, 0.5, 0.6, 0.75, 0.9, 1.0] {
            assert_abs_diff_eq!(shape(0.0, s), 0.0, epsilon = 1e-6);
            assert_abs_diff_eq!(shape(1.0, s), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_shape_families() {
        // exponential sags, linear is identity, logarithmic bulges
        assert!(shape(0.5, 0.0) < 0.2);
        assert_abs_diff_eq!(shape(0.5, 0.25), 0.5, epsilon = 1e-6);
        assert!(shape(0.5, 0.5) > 0.8);
        assert_abs_diff_eq!(shape(0.5, 0.75), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_shape_is_monotonic() {
        for s in [0.0, 0.3, 0.6, 1.0] {
            let mut last = 0.0;
            for i in 0..=64 {
                let y = shape(i as f32 / 64.0, s);
                assert!(y >= last - 1e-6);
                last = y;
            }
        }
    }

    #[test]
    fn test_smoother_bypass_at_half() {
        let mut smoother = Smoother::new();
        for x in [-1.0, -0.3, 0.0, 0.7, 1.0] {
            assert_eq!(smoother.process(x, 0.01, 0.5), x);
        }
    }

    #[test]
    fn test_smoother_low_pass_rounds_steps() {
        let mut smoother = Smoother::new();
        smoother.process(-1.0, 0.001, 0.0);
        let y = smoother.process(1.0, 0.001, 0.0);
        assert!(y < 0.0, "a full-strength low-pass must not jump, got {}", y);
    }

    #[test]
    fn test_smoother_fold_stays_bounded() {
        let mut smoother = Smoother::new();
        for i in 0..=100 {
            let x = -1.0 + 2.0 * i as f32 / 100.0;
            let y = smoother.process(x, 0.01, 1.0);
            assert!((-1.0..=1.0).contains(&y));
        }
    }
}
