//! Numeric helpers shared by the rendering core.
//!
//! Everything here is allocation-free and uses `libm` so the core builds
//! without `std`.

/// Lowest frequency the renderer accepts, in cycles per sample
pub const MIN_FREQUENCY: f32 = 1.0e-7;

/// Highest frequency the renderer accepts (Nyquist), in cycles per sample
pub const MAX_FREQUENCY: f32 = 0.5;

/// Convert a pitch offset in semitones to a frequency ratio.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    libm::exp2f(semitones / 12.0)
}

/// Clamp a frequency into `[MIN_FREQUENCY, MAX_FREQUENCY]`.
///
/// Zero, negative and non-finite values map to `MIN_FREQUENCY`.
#[inline]
pub fn sanitize_frequency(frequency: f32) -> f32 {
    if frequency.is_nan() || frequency < MIN_FREQUENCY {
        MIN_FREQUENCY
    } else if frequency > MAX_FREQUENCY {
        MAX_FREQUENCY
    } else {
        frequency
    }
}

/// Clamp a normalized parameter into `[0, 1]`, replacing NaN with `fallback`.
#[inline]
pub fn sanitize_unit(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Fractional part, always in `[0, 1)` (also for negative input).
#[inline]
pub fn wrap(phase: f32) -> f32 {
    let wrapped = phase - libm::floorf(phase);
    // floorf can round x - floor(x) up to exactly 1.0 for tiny negative x
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}

#[inline]
pub fn crossfade(a: f32, b: f32, amount: f32) -> f32 {
    a + (b - a) * amount
}

/// Linear interpolation of a control value across one block.
///
/// Borrows the stored value, ramps from it towards `new_value` over `size`
/// steps. The target is stored immediately so the next block starts there.
pub struct ParameterInterpolator<'a> {
    state: &'a mut f32,
    value: f32,
    increment: f32,
}

impl<'a> ParameterInterpolator<'a> {
    pub fn new(state: &'a mut f32, new_value: f32, size: usize) -> Self {
        let value = *state;
        let increment = if size == 0 {
            0.0
        } else {
            (new_value - value) / size as f32
        };
        *state = new_value;
        Self {
            state,
            value,
            increment,
        }
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        self.value += self.increment;
        self.value
    }

    /// Value reached when the block is done
    pub fn target(&self) -> f32 {
        *self.state
    }
}
