//! Evaluating parsed expressions.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::expression::{DiceError, DiceTerm, parse_expression};
use super::{DieRoller, RandomRoller};

/// Faces rolled for one `NdS` group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceGroup {
    /// `NdS` notation.
    pub notation: String,
    /// Whether the group is subtracted.
    pub negative: bool,
    /// Individual faces in roll order.
    pub rolls: Vec<u32>,
    /// Signed sum of `rolls`.
    pub subtotal: i64,
}

/// A fully evaluated roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRoll {
    /// Normalized expression (no whitespace, lowercase).
    pub expression: String,
    /// Dice groups in expression order.
    pub groups: Vec<DiceGroup>,
    /// Signed sum of every die.
    pub result: i64,
    /// Signed sum of flat terms.
    pub modifier: i64,
    /// `result + modifier`.
    pub total: i64,
    /// e.g. `1d20[15]+1d4[2]+2 = 19`.
    pub breakdown: String,
}

/// Evaluate with the thread-local RNG.
pub fn evaluate(raw: &str) -> Result<DiceRoll, DiceError> {
    evaluate_with(raw, &mut RandomRoller)
}

/// Evaluate with a caller-supplied roller.
pub fn evaluate_with<R: DieRoller + ?Sized>(
    raw: &str,
    roller: &mut R,
) -> Result<DiceRoll, DiceError> {
    let terms = parse_expression(raw)?;
    let overflow = || DiceError::InvalidExpression(raw.trim().to_string());

    let mut groups = Vec::new();
    let mut result = 0i64;
    let mut modifier = 0i64;
    let mut breakdown = String::new();

    for (i, term) in terms.iter().enumerate() {
        let negative = match *term {
            DiceTerm::Dice { negative, .. } => negative,
            DiceTerm::Flat(value) => value < 0,
        };
        if negative {
            breakdown.push('-');
        } else if i > 0 {
            breakdown.push('+');
        }

        match *term {
            DiceTerm::Dice {
                negative,
                count,
                sides,
            } => {
                let rolls: Vec<u32> = (0..count).map(|_| roller.roll(sides)).collect();
                let sum: i64 = rolls.iter().map(|&f| i64::from(f)).sum();
                let subtotal = if negative { -sum } else { sum };
                result = result.checked_add(subtotal).ok_or_else(overflow)?;

                let faces = rolls
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                let notation = format!("{count}d{sides}");
                let _ = write!(breakdown, "{notation}[{faces}]");

                groups.push(DiceGroup {
                    notation,
                    negative,
                    rolls,
                    subtotal,
                });
            }
            DiceTerm::Flat(value) => {
                modifier = modifier.checked_add(value).ok_or_else(overflow)?;
                let _ = write!(breakdown, "{}", value.unsigned_abs());
            }
        }
    }

    let total = result.checked_add(modifier).ok_or_else(overflow)?;
    let _ = write!(breakdown, " = {total}");

    Ok(DiceRoll {
        expression: raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase(),
        groups,
        result,
        modifier,
        total,
        breakdown,
    })
}
