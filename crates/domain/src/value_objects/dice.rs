//! Dice expression value objects and parsing.
//!
//! Supports sums of dice terms and integer modifiers like "1d5+2",
//! "2d10+1d5-1", "d10". Rolling is performed through an injected die
//! closure so the domain layer stays free of RNG dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error when parsing a dice expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceParseError {
    /// The expression string is empty
    #[error("Empty dice expression")]
    Empty,
    /// Invalid format - expected terms like XdY or integers joined by +/-
    #[error("Invalid dice format: {0}")]
    InvalidFormat(String),
    /// Dice count must be at least 1
    #[error("Dice count must be at least 1")]
    InvalidDiceCount,
    /// Die size must be at least 2
    #[error("Die size must be at least 2")]
    InvalidDieSize,
}

/// One term of a dice expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiceTerm {
    /// `XdY`, negated when subtracted ("…-1d5")
    Dice {
        count: u32,
        size: u32,
        negated: bool,
    },
    /// A signed integer modifier
    Modifier(i32),
}

/// A parsed dice expression like "1d5+2" or "2d10+1d5".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    terms: Vec<DiceTerm>,
}

impl DiceExpression {
    /// A constant expression with no dice.
    pub fn constant(value: i32) -> Self {
        Self {
            terms: vec![DiceTerm::Modifier(value)],
        }
    }

    pub fn from_terms(terms: Vec<DiceTerm>) -> Result<Self, DiceParseError> {
        if terms.is_empty() {
            return Err(DiceParseError::Empty);
        }
        for term in &terms {
            if let DiceTerm::Dice { count, size, .. } = term {
                if *count == 0 {
                    return Err(DiceParseError::InvalidDiceCount);
                }
                if *size < 2 {
                    return Err(DiceParseError::InvalidDieSize);
                }
            }
        }
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[DiceTerm] {
        &self.terms
    }

    /// Whether the expression contains any dice term.
    pub fn has_dice(&self) -> bool {
        self.terms
            .iter()
            .any(|t| matches!(t, DiceTerm::Dice { .. }))
    }

    /// The constant value of a dice-free expression.
    pub fn constant_value(&self) -> Option<i32> {
        if self.has_dice() {
            return None;
        }
        Some(
            self.terms
                .iter()
                .map(|t| match t {
                    DiceTerm::Modifier(m) => *m,
                    DiceTerm::Dice { .. } => 0,
                })
                .sum(),
        )
    }

    /// Parse an expression like "1d5+2", "2d10-1", "d10+1d5".
    ///
    /// Shorthand "dY" means "1dY". Whitespace is ignored; parsing is
    /// case-insensitive. Parsed by hand to keep regex out of the domain layer.
    pub fn parse(input: &str) -> Result<Self, DiceParseError> {
        let input: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if input.is_empty() {
            return Err(DiceParseError::Empty);
        }

        let mut terms = Vec::new();
        let mut rest = input.as_str();

        loop {
            // Consume the sign, then take everything up to the next one
            let negated = if let Some(r) = rest.strip_prefix('-') {
                rest = r;
                true
            } else if let Some(r) = rest.strip_prefix('+') {
                rest = r;
                false
            } else {
                false
            };

            let end = rest.find(['+', '-']).unwrap_or(rest.len());
            if end == 0 {
                return Err(DiceParseError::InvalidFormat(format!(
                    "Dangling sign in '{}'",
                    input
                )));
            }
            terms.push(Self::parse_chunk(&rest[..end], negated)?);

            rest = &rest[end..];
            if rest.is_empty() {
                break;
            }
        }

        Self::from_terms(terms)
    }

    fn parse_chunk(chunk: &str, negated: bool) -> Result<DiceTerm, DiceParseError> {
        if let Some(d_pos) = chunk.find('d') {
            let count_str = &chunk[..d_pos];
            let count: u32 = if count_str.is_empty() {
                1 // "d10" means "1d10"
            } else {
                count_str.parse().map_err(|_| {
                    DiceParseError::InvalidFormat(format!("Invalid dice count: '{}'", count_str))
                })?
            };
            if count == 0 {
                return Err(DiceParseError::InvalidDiceCount);
            }

            let size_str = &chunk[d_pos + 1..];
            let size: u32 = size_str.parse().map_err(|_| {
                DiceParseError::InvalidFormat(format!("Invalid die size: '{}'", size_str))
            })?;
            if size < 2 {
                return Err(DiceParseError::InvalidDieSize);
            }

            Ok(DiceTerm::Dice {
                count,
                size,
                negated,
            })
        } else {
            let value: i32 = chunk.parse().map_err(|_| {
                DiceParseError::InvalidFormat(format!("Invalid term: '{}'", chunk))
            })?;
            Ok(DiceTerm::Modifier(if negated { -value } else { value }))
        }
    }

    /// Roll the expression. `die` receives a die size and returns one result
    /// in `1..=size`.
    pub fn roll_with(&self, die: &mut impl FnMut(u32) -> i32) -> RollBreakdown {
        let mut individual_rolls = Vec::new();
        let mut total = 0i32;
        for term in &self.terms {
            match term {
                DiceTerm::Dice {
                    count,
                    size,
                    negated,
                } => {
                    for _ in 0..*count {
                        let roll = die(*size);
                        individual_rolls.push(roll);
                        total += if *negated { -roll } else { roll };
                    }
                }
                DiceTerm::Modifier(m) => total += m,
            }
        }
        RollBreakdown {
            individual_rolls,
            total,
        }
    }

    /// Minimum possible result.
    pub fn min_roll(&self) -> i32 {
        self.terms
            .iter()
            .map(|t| match t {
                DiceTerm::Dice {
                    count,
                    size,
                    negated,
                } => {
                    if *negated {
                        -((*count as i32) * (*size as i32))
                    } else {
                        *count as i32
                    }
                }
                DiceTerm::Modifier(m) => *m,
            })
            .sum()
    }

    /// Maximum possible result.
    pub fn max_roll(&self) -> i32 {
        self.terms
            .iter()
            .map(|t| match t {
                DiceTerm::Dice {
                    count,
                    size,
                    negated,
                } => {
                    if *negated {
                        -(*count as i32)
                    } else {
                        (*count as i32) * (*size as i32)
                    }
                }
                DiceTerm::Modifier(m) => *m,
            })
            .sum()
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            match term {
                DiceTerm::Dice {
                    count,
                    size,
                    negated,
                } => {
                    if *negated {
                        write!(f, "-")?;
                    } else if i > 0 {
                        write!(f, "+")?;
                    }
                    write!(f, "{}d{}", count, size)?;
                }
                DiceTerm::Modifier(m) => {
                    if i == 0 {
                        write!(f, "{}", m)?;
                    } else if *m >= 0 {
                        write!(f, "+{}", m)?;
                    } else {
                        write!(f, "{}", m)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Result of rolling a dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollBreakdown {
    /// Individual die results, in roll order
    pub individual_rolls: Vec<i32>,
    /// Final total, modifiers included
    pub total: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Die closure that always returns the midpoint.
    fn fixed(value: i32) -> impl FnMut(u32) -> i32 {
        move |_| value
    }

    #[test]
    fn test_parse_simple() {
        let expr = DiceExpression::parse("1d10").unwrap();
        assert_eq!(
            expr.terms(),
            &[DiceTerm::Dice {
                count: 1,
                size: 10,
                negated: false
            }]
        );
    }

    #[test]
    fn test_parse_shorthand() {
        let expr = DiceExpression::parse("d10").unwrap();
        assert_eq!(
            expr.terms(),
            &[DiceTerm::Dice {
                count: 1,
                size: 10,
                negated: false
            }]
        );
    }

    #[test]
    fn test_parse_with_modifier() {
        let expr = DiceExpression::parse("1d5+2").unwrap();
        assert_eq!(expr.terms().len(), 2);
        assert_eq!(expr.terms()[1], DiceTerm::Modifier(2));
    }

    #[test]
    fn test_parse_negative_modifier() {
        let expr = DiceExpression::parse("2d10-3").unwrap();
        assert_eq!(expr.terms()[1], DiceTerm::Modifier(-3));
    }

    #[test]
    fn test_parse_multiple_dice_terms() {
        let expr = DiceExpression::parse("2d10+1d5+1").unwrap();
        assert_eq!(expr.terms().len(), 3);
        assert!(expr.has_dice());
    }

    #[test]
    fn test_parse_constant_only() {
        let expr = DiceExpression::parse("7").unwrap();
        assert!(!expr.has_dice());
        assert_eq!(expr.constant_value(), Some(7));
    }

    #[test]
    fn test_parse_whitespace_and_case() {
        let expr = DiceExpression::parse(" 1D5 + 2 ").unwrap();
        assert_eq!(expr.to_string(), "1d5+2");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            DiceExpression::parse(""),
            Err(DiceParseError::Empty)
        ));
        assert!(matches!(
            DiceExpression::parse("0d10"),
            Err(DiceParseError::InvalidDiceCount)
        ));
        assert!(matches!(
            DiceExpression::parse("1d1"),
            Err(DiceParseError::InvalidDieSize)
        ));
        assert!(matches!(
            DiceExpression::parse("1d10+"),
            Err(DiceParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            DiceExpression::parse("banana"),
            Err(DiceParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_roll_with_fixed_die() {
        let expr = DiceExpression::parse("1d5+2").unwrap();
        let result = expr.roll_with(&mut fixed(3));
        assert_eq!(result.total, 5);
        assert_eq!(result.individual_rolls, vec![3]);
    }

    #[test]
    fn test_roll_with_multiple_terms() {
        let expr = DiceExpression::parse("2d10+1").unwrap();
        let result = expr.roll_with(&mut fixed(4));
        assert_eq!(result.total, 9);
        assert_eq!(result.individual_rolls, vec![4, 4]);
    }

    #[test]
    fn test_roll_subtracted_dice() {
        let expr = DiceExpression::parse("2d10-1d5").unwrap();
        let result = expr.roll_with(&mut fixed(2));
        assert_eq!(result.total, 2);
    }

    #[test]
    fn test_min_max() {
        let expr = DiceExpression::parse("2d10+3").unwrap();
        assert_eq!(expr.min_roll(), 5);
        assert_eq!(expr.max_roll(), 23);
    }

    #[test]
    fn test_display_round_trip() {
        for input in ["1d10", "2d10+3", "1d5-2", "2d10+1d5+1"] {
            let expr = DiceExpression::parse(input).unwrap();
            assert_eq!(expr.to_string(), input);
        }
    }

    #[test]
    fn test_constant_expression() {
        let expr = DiceExpression::constant(4);
        assert_eq!(expr.constant_value(), Some(4));
        assert_eq!(expr.roll_with(&mut fixed(99)).total, 4);
    }
}
