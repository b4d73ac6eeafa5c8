use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Desired position for one time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
pub enum Signal {
    #[strum(to_string = "long")]
    Long,
    #[strum(to_string = "short")]
    Short,
    #[default]
    #[strum(to_string = "flat")]
    Flat,
}

impl Signal {
    #[inline]
    pub fn value(self) -> i8 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
            Self::Flat => 0,
        }
    }

    #[inline]
    pub fn as_f64(self) -> f64 {
        self.value() as f64
    }

    /// Long when `lhs < rhs`, Short when `lhs > rhs`, Flat on a tie.
    #[inline]
    pub(crate) fn from_ordering(lhs: f64, rhs: f64) -> Self {
        if lhs < rhs {
            Self::Long
        } else if lhs > rhs {
            Self::Short
        } else {
            Self::Flat
        }
    }
}

pub fn signal_values(signals: &[Signal]) -> Vec<i8> {
    signals.iter().map(|s| s.value()).collect()
}
