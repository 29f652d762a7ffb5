//! Gate Edge Detection
//!
//! Converts a boolean (or thresholded level) trigger/clock signal into a
//! per-sample stream of [`GateFlag`]s. Exactly one flag is carried between
//! blocks by the caller so that edges falling on a block boundary are seen.

use serde::{Deserialize, Serialize};

/// Level at or above which a trigger or clock input reads as high
pub const TRIGGER_THRESHOLD: f64 = 1.0;

/// State of a gate signal at one sample frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GateFlag {
    /// Low, and was low on the previous frame
    #[default]
    Low,
    /// High, and was high on the previous frame
    High,
    /// Went from low to high on this frame
    Rising,
    /// Went from high to low on this frame
    Falling,
}

impl GateFlag {
    /// Derive the flag for the current frame from the previous flag and the
    /// current boolean state.
    #[inline]
    pub fn extract(previous: GateFlag, current: bool) -> GateFlag {
        match (previous.is_high(), current) {
            (false, true) => GateFlag::Rising,
            (true, true) => GateFlag::High,
            (true, false) => GateFlag::Falling,
            (false, false) => GateFlag::Low,
        }
    }

    /// Same as [`GateFlag::extract`], comparing `level >= threshold`.
    #[inline]
    pub fn from_level(previous: GateFlag, level: f64, threshold: f64) -> GateFlag {
        GateFlag::extract(previous, level >= threshold)
    }

    /// True for `High` and `Rising`
    #[inline]
    pub fn is_high(self) -> bool {
        matches!(self, GateFlag::High | GateFlag::Rising)
    }

    #[inline]
    pub fn is_rising(self) -> bool {
        self == GateFlag::Rising
    }

    #[inline]
    pub fn is_falling(self) -> bool {
        self == GateFlag::Falling
    }
}

/// Fill `flags` from a buffer of levels, one flag per sample.
///
/// Returns the last flag written (or `previous` for an empty block), which
/// the caller carries into the next block.
pub fn extract_block(
    mut previous: GateFlag,
    levels: &[f64],
    threshold: f64,
    flags: &mut [GateFlag],
) -> GateFlag {
    for (flag, &level) in flags.iter_mut().zip(levels) {
        previous = GateFlag::from_level(previous, level, threshold);
        *flag = previous;
    }
    previous
}

/// Fill `flags` for a level that is constant over the whole block.
///
/// Only the first sample can carry an edge; the rest settle to high or low.
pub fn fill_constant(mut previous: GateFlag, current: bool, flags: &mut [GateFlag]) -> GateFlag {
    for flag in flags.iter_mut() {
        previous = GateFlag::extract(previous, current);
        *flag = previous;
    }
    previous
}
