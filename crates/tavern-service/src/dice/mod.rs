//! Dice expressions such as `1d20+1d4+2`.
//!
//! Expressions are evaluated server-side. The random source is the
//! [`DieRoller`] trait so tests can pin the faces.

mod expression;
mod roll;

pub use expression::{DiceError, DiceTerm, parse_expression};
pub use roll::{DiceGroup, DiceRoll, evaluate, evaluate_with};

use rand::Rng;

/// Source of die faces.
pub trait DieRoller {
    /// A face in `1..=sides`.
    fn roll(&mut self, sides: u32) -> u32;
}

/// Rolls with the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomRoller;

impl DieRoller for RandomRoller {
    fn roll(&mut self, sides: u32) -> u32 {
        rand::rng().random_range(1..=sides)
    }
}
