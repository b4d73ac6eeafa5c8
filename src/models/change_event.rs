use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Direction {
    /// Seed event at index 0
    #[strum(to_string = "initial")]
    Initial,
    #[strum(to_string = "up")]
    Up,
    #[strum(to_string = "down")]
    Down,
}

impl Direction {
    /// +1 for Up, -1 for Down, 0 for the seed event.
    #[inline]
    pub fn sign(self) -> i8 {
        match self {
            Self::Initial => 0,
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

/// One directional-change transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Position in the price series
    pub index: usize,
    /// Price at the transition
    pub price: f64,
    pub direction: Direction,
}

impl ChangeEvent {
    pub fn new(index: usize, price: f64, direction: Direction) -> Self {
        Self {
            index,
            price,
            direction,
        }
    }

    #[inline]
    pub fn is_initial(&self) -> bool {
        self.direction == Direction::Initial
    }
}
