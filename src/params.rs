//! Shared Parameters
//!
//! Host parameters are written by a control thread (UI, message dispatch,
//! automation) and read by the audio thread once per block. Every value is a
//! lock-free [`AtomicF64`]; fields are independent, so a block may see one
//! field updated and another not yet. For continuous audio controls that
//! one-block skew is inaudible.

use core::sync::atomic::{AtomicU64, Ordering};
use serde::{Deserialize, Serialize};

/// Atomic f64 for lock-free communication between threads
///
/// Uses AtomicU64 internally since there's no native AtomicF64.
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clone for AtomicF64 {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

/// Identifies one host parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterId {
    Range,
    Mode,
    Ramp,
    Frequency,
    Shape,
    Smoothness,
    Slope,
    Shift,
    Trigger,
    CvInput,
}

impl ParameterId {
    pub const ALL: [ParameterId; 10] = [
        ParameterId::Range,
        ParameterId::Mode,
        ParameterId::Ramp,
        ParameterId::Frequency,
        ParameterId::Shape,
        ParameterId::Smoothness,
        ParameterId::Slope,
        ParameterId::Shift,
        ParameterId::Trigger,
        ParameterId::CvInput,
    ];

    /// Message name the host uses for this parameter
    pub fn name(self) -> &'static str {
        match self {
            ParameterId::Range => "range",
            ParameterId::Mode => "mode",
            ParameterId::Ramp => "ramp",
            ParameterId::Frequency => "frequency",
            ParameterId::Shape => "shape",
            ParameterId::Smoothness => "smoothness",
            ParameterId::Slope => "slope",
            ParameterId::Shift => "shift",
            ParameterId::Trigger => "trigger",
            ParameterId::CvInput => "cvinput",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }

    pub fn default_value(self) -> f64 {
        let defaults = ParameterSnapshot::default();
        defaults.get(self)
    }
}

/// Plain copy of every parameter, taken once per block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSnapshot {
    /// Frequency register selector (0 low, 1 medium, 2 high)
    pub range: f64,
    /// Output mode selector (1 gates, 2 amplitude, 3 slope/phase, 4 frequency)
    pub mode: f64,
    /// Ramp mode selector (0 AD, 1 looping, 2 AR, 3 loop-sync)
    pub ramp: f64,
    /// Transposition in semitones
    pub frequency: f64,
    pub shape: f64,
    pub smoothness: f64,
    pub slope: f64,
    pub shift: f64,
    /// Trigger level, high at or above 1.0
    pub trigger: f64,
    /// Pitch modulation in semitones, added to `frequency`
    pub cv_input: f64,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            range: 1.0,
            mode: 1.0,
            ramp: 1.0,
            frequency: 0.0,
            shape: 0.0,
            smoothness: 0.5,
            slope: 0.5,
            shift: 0.5,
            trigger: 0.0,
            cv_input: 0.0,
        }
    }
}

impl ParameterSnapshot {
    pub fn get(&self, id: ParameterId) -> f64 {
        match id {
            ParameterId::Range => self.range,
            ParameterId::Mode => self.mode,
            ParameterId::Ramp => self.ramp,
            ParameterId::Frequency => self.frequency,
            ParameterId::Shape => self.shape,
            ParameterId::Smoothness => self.smoothness,
            ParameterId::Slope => self.slope,
            ParameterId::Shift => self.shift,
            ParameterId::Trigger => self.trigger,
            ParameterId::CvInput => self.cv_input,
        }
    }

    /// Discrete selectors are truncated toward zero; NaN reads as -1, which
    /// every selector maps to its default.
    pub(crate) fn selector(value: f64) -> i32 {
        if value.is_nan() {
            -1
        } else {
            value as i32
        }
    }
}

/// Host parameters shared between the control and audio threads.
///
/// Setters store the raw value; the engine sanitizes on read.
#[derive(Debug, Clone)]
pub struct Parameters {
    pub range: AtomicF64,
    pub mode: AtomicF64,
    pub ramp: AtomicF64,
    pub frequency: AtomicF64,
    pub shape: AtomicF64,
    pub smoothness: AtomicF64,
    pub slope: AtomicF64,
    pub shift: AtomicF64,
    pub trigger: AtomicF64,
    pub cv_input: AtomicF64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self::from_snapshot(&ParameterSnapshot::default())
    }
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &ParameterSnapshot) -> Self {
        Self {
            range: AtomicF64::new(snapshot.range),
            mode: AtomicF64::new(snapshot.mode),
            ramp: AtomicF64::new(snapshot.ramp),
            frequency: AtomicF64::new(snapshot.frequency),
            shape: AtomicF64::new(snapshot.shape),
            smoothness: AtomicF64::new(snapshot.smoothness),
            slope: AtomicF64::new(snapshot.slope),
            shift: AtomicF64::new(snapshot.shift),
            trigger: AtomicF64::new(snapshot.trigger),
            cv_input: AtomicF64::new(snapshot.cv_input),
        }
    }

    fn cell(&self, id: ParameterId) -> &AtomicF64 {
        match id {
            ParameterId::Range => &self.range,
            ParameterId::Mode => &self.mode,
            ParameterId::Ramp => &self.ramp,
            ParameterId::Frequency => &self.frequency,
            ParameterId::Shape => &self.shape,
            ParameterId::Smoothness => &self.smoothness,
            ParameterId::Slope => &self.slope,
            ParameterId::Shift => &self.shift,
            ParameterId::Trigger => &self.trigger,
            ParameterId::CvInput => &self.cv_input,
        }
    }

    pub fn get(&self, id: ParameterId) -> f64 {
        self.cell(id).get()
    }

    pub fn set(&self, id: ParameterId, value: f64) {
        self.cell(id).set(value);
    }

    /// Set a parameter by its message name. Returns false for unknown names.
    pub fn set_by_name(&self, name: &str, value: f64) -> bool {
        match ParameterId::from_name(name) {
            Some(id) => {
                self.set(id, value);
                true
            }
            None => false,
        }
    }

    /// Overwrite every parameter from a snapshot.
    pub fn apply(&self, snapshot: &ParameterSnapshot) {
        for id in ParameterId::ALL {
            self.set(id, snapshot.get(id));
        }
    }

    /// Read every parameter once.
    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            range: self.range.get(),
            mode: self.mode.get(),
            ramp: self.ramp.get(),
            frequency: self.frequency.get(),
            shape: self.shape.get(),
            smoothness: self.smoothness.get(),
            slope: self.slope.get(),
            shift: self.shift.get(),
            trigger: self.trigger.get(),
            cv_input: self.cv_input.get(),
        }
    }
}
