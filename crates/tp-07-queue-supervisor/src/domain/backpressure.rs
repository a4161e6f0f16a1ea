//! Depth-driven backpressure with hysteresis.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressureSignal {
    #[default]
    Clear,
    /// Producers should slow down or shed optional work.
    Engaged,
}

impl BackpressureSignal {
    pub fn is_engaged(self) -> bool {
        self == Self::Engaged
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Engaged => "engaged",
        }
    }
}

/// Turns depth samples into a [`BackpressureSignal`].
///
/// Engages at `high_water` and stays engaged until depth drops to
/// `low_water`, so a queue hovering around one threshold does not flap.
/// A `high_water` of 0 disables the gauge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackpressureGauge {
    high_water: usize,
    low_water: usize,
    signal: BackpressureSignal,
}

impl BackpressureGauge {
    pub fn new(high_water: usize, low_water: usize) -> Self {
        Self {
            high_water,
            low_water: low_water.min(high_water),
            signal: BackpressureSignal::Clear,
        }
    }

    pub fn signal(&self) -> BackpressureSignal {
        self.signal
    }

    /// Feed one depth sample. Returns the new signal when it changed.
    pub fn observe(&mut self, depth: usize) -> Option<BackpressureSignal> {
        if self.high_water == 0 {
            return None;
        }
        let next = match self.signal {
            BackpressureSignal::Clear if depth >= self.high_water => BackpressureSignal::Engaged,
            BackpressureSignal::Engaged if depth <= self.low_water => BackpressureSignal::Clear,
            current => current,
        };
        if next == self.signal {
            return None;
        }
        self.signal = next;
        Some(next)
    }
}
