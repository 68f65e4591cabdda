//! Parsing of dice expressions into signed terms.

use thiserror::Error;

use tavern_core::AppError;

/// Fewest dice in one group.
pub const MIN_DICE: u32 = 1;
/// Most dice in one group.
pub const MAX_DICE: u32 = 100;
/// Fewest sides on a die.
pub const MIN_SIDES: u32 = 2;
/// Most sides on a die.
pub const MAX_SIDES: u32 = 1000;

/// Dice expression errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    /// A dice group is outside the allowed count or side range.
    #[error("invalid dice range in '{0}': 1-100 dice with 2-1000 sides")]
    InvalidDiceRange(String),
    /// The expression does not match `NdS` / integer terms.
    #[error("invalid dice expression: '{0}'")]
    InvalidExpression(String),
}

impl From<DiceError> for AppError {
    fn from(err: DiceError) -> Self {
        AppError::validation(err.to_string())
    }
}

/// One signed term of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiceTerm {
    /// `count` dice with `sides` sides.
    Dice {
        negative: bool,
        count: u32,
        sides: u32,
    },
    /// A flat modifier, sign included.
    Flat(i64),
}

/// Split an expression into terms.
///
/// Whitespace is ignored and `D` is accepted for `d`. Every term is
/// separated by `+` or `-`; a leading sign is allowed.
pub fn parse_expression(raw: &str) -> Result<Vec<DiceTerm>, DiceError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let invalid = || DiceError::InvalidExpression(raw.trim().to_string());

    if cleaned.is_empty() {
        return Err(invalid());
    }

    let mut terms = Vec::new();
    let mut negative = false;
    let mut body = String::new();

    for (i, c) in cleaned.chars().enumerate() {
        match c {
            '+' | '-' => {
                if body.is_empty() {
                    // Only a leading sign may stand without a term before it.
                    if i != 0 {
                        return Err(invalid());
                    }
                } else {
                    terms.push(parse_term(&body, negative, raw)?);
                    body.clear();
                }
                negative = c == '-';
            }
            _ => body.push(c),
        }
    }

    if body.is_empty() {
        return Err(invalid());
    }
    terms.push(parse_term(&body, negative, raw)?);
    Ok(terms)
}

fn parse_term(body: &str, negative: bool, raw: &str) -> Result<DiceTerm, DiceError> {
    let invalid = || DiceError::InvalidExpression(raw.trim().to_string());
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if let Some((count, sides)) = body.split_once('d') {
        if !all_digits(count) || !all_digits(sides) {
            return Err(invalid());
        }
        let out_of_range = || DiceError::InvalidDiceRange(body.to_string());
        let count: u32 = count.parse().map_err(|_| out_of_range())?;
        let sides: u32 = sides.parse().map_err(|_| out_of_range())?;

        if !(MIN_DICE..=MAX_DICE).contains(&count) || !(MIN_SIDES..=MAX_SIDES).contains(&sides) {
            return Err(out_of_range());
        }
        return Ok(DiceTerm::Dice {
            negative,
            count,
            sides,
        });
    }

    if !all_digits(body) {
        return Err(invalid());
    }
    let value: i64 = body.parse().map_err(|_| invalid())?;
    Ok(DiceTerm::Flat(if negative { -value } else { value }))
}
