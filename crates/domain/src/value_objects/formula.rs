//! Resource formula mini-language: flat literals, roll-lookup tables, and
//! dice expressions with characteristic-bonus tokens.
//!
//! The three shapes:
//! - `"5"` - flat integer, used as-is
//! - `"(1-4|=2),(5-7|=3),(8-10|=4)"` - d10 roll-lookup table
//! - `"1d5+2tb"` - dice terms plus characteristic-bonus tokens with an
//!   optional leading multiplier; bonuses are substituted from the actor
//!   before the remaining dice expression is rolled
//!
//! Tokenize -> parse -> evaluate, so the sub-language is unit-testable
//! without invoking real randomness.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;
use crate::value_objects::{Characteristic, DiceExpression, DiceTerm};

/// One row of a roll-lookup table: inclusive range and the value it yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRow {
    pub min: i32,
    pub max: i32,
    pub value: i32,
}

impl LookupRow {
    /// Returns the value of the first row whose inclusive range contains
    /// `roll`, or `None` when no range matches.
    pub fn match_roll(rows: &[LookupRow], roll: i32) -> Option<i32> {
        rows.iter()
            .find(|r| r.min <= roll && roll <= r.max)
            .map(|r| r.value)
    }
}

/// One term of a bonus-aware dice formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormulaTerm {
    Dice {
        count: u32,
        size: u32,
        negated: bool,
    },
    Modifier(i32),
    /// `2tb` - multiplier x characteristic bonus, taken live from the actor
    Bonus {
        multiplier: i32,
        characteristic: Characteristic,
        negated: bool,
    },
}

/// A parsed resource formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceFormula {
    /// Bare integer literal
    Flat(i32),
    /// d10 roll-lookup table
    Lookup(Vec<LookupRow>),
    /// Dice terms, modifiers, and characteristic-bonus tokens
    Dice(Vec<FormulaTerm>),
}

impl ResourceFormula {
    /// Parse a formula string into one of the three shapes.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DomainError::parse("Empty resource formula"));
        }

        if let Ok(value) = trimmed.parse::<i32>() {
            return Ok(Self::Flat(value));
        }

        if trimmed.contains("|=") {
            return Self::parse_lookup(trimmed).map(Self::Lookup);
        }

        Self::parse_dice(trimmed).map(Self::Dice)
    }

    /// `(min-max|=value), (min-max|=value), ...`
    fn parse_lookup(input: &str) -> Result<Vec<LookupRow>, DomainError> {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        let mut rows = Vec::new();
        for entry in compact.split(',') {
            let entry = entry
                .trim_start_matches('(')
                .trim_end_matches(')');
            let (range, value) = entry.split_once("|=").ok_or_else(|| {
                DomainError::parse(format!("Lookup entry missing '|=': '{}'", entry))
            })?;
            let (min, max) = range.split_once('-').ok_or_else(|| {
                DomainError::parse(format!("Lookup range missing '-': '{}'", range))
            })?;
            let min: i32 = min
                .parse()
                .map_err(|_| DomainError::parse(format!("Invalid lookup minimum: '{}'", min)))?;
            let max: i32 = max
                .parse()
                .map_err(|_| DomainError::parse(format!("Invalid lookup maximum: '{}'", max)))?;
            let value: i32 = value
                .parse()
                .map_err(|_| DomainError::parse(format!("Invalid lookup value: '{}'", value)))?;
            if min > max {
                return Err(DomainError::parse(format!(
                    "Lookup range is inverted: '{}-{}'",
                    min, max
                )));
            }
            rows.push(LookupRow { min, max, value });
        }
        if rows.is_empty() {
            return Err(DomainError::parse("Lookup table has no entries"));
        }
        Ok(rows)
    }

    fn parse_dice(input: &str) -> Result<Vec<FormulaTerm>, DomainError> {
        // Normalize long bonus tokens ("toughness-bonus") to their short
        // forms first - the embedded hyphens would otherwise be read as
        // subtraction.
        let mut normalized: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        for characteristic in Characteristic::all() {
            let long = characteristic.long_bonus_token();
            if normalized.contains(&long) {
                normalized = normalized.replace(&long, &characteristic.bonus_token());
            }
        }

        let mut terms = Vec::new();
        let mut rest = normalized.as_str();
        loop {
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
                return Err(DomainError::parse(format!(
                    "Dangling sign in formula '{}'",
                    input
                )));
            }
            terms.push(Self::parse_dice_chunk(&rest[..end], negated)?);

            rest = &rest[end..];
            if rest.is_empty() {
                break;
            }
        }
        Ok(terms)
    }

    fn parse_dice_chunk(chunk: &str, negated: bool) -> Result<FormulaTerm, DomainError> {
        if let Ok(value) = chunk.parse::<i32>() {
            return Ok(FormulaTerm::Modifier(if negated { -value } else { value }));
        }

        // "[mult]<token>" - leading digits are the multiplier
        let token_start = chunk
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(chunk.len());
        let (mult_str, token) = chunk.split_at(token_start);
        if let Some(characteristic) = Characteristic::from_bonus_token(token) {
            let multiplier: i32 = if mult_str.is_empty() {
                1
            } else {
                mult_str.parse().map_err(|_| {
                    DomainError::parse(format!("Invalid bonus multiplier: '{}'", mult_str))
                })?
            };
            return Ok(FormulaTerm::Bonus {
                multiplier,
                characteristic,
                negated,
            });
        }

        if chunk.contains('d') {
            let parsed = DiceExpression::parse(chunk)
                .map_err(|e| DomainError::parse(e.to_string()))?;
            if let Some(&DiceTerm::Dice { count, size, .. }) = parsed.terms().first() {
                return Ok(FormulaTerm::Dice {
                    count,
                    size,
                    negated,
                });
            }
        }

        Err(DomainError::parse(format!(
            "Unrecognized formula term: '{}'",
            chunk
        )))
    }

    /// The flat value, when the formula involves no randomness and no
    /// characteristic lookup. Drives unattended batch application.
    pub fn flat_value(&self) -> Option<i32> {
        match self {
            Self::Flat(value) => Some(*value),
            Self::Lookup(_) => None,
            Self::Dice(terms) => {
                let mut total = 0;
                for term in terms {
                    match term {
                        FormulaTerm::Modifier(m) => total += m,
                        _ => return None,
                    }
                }
                Some(total)
            }
        }
    }

    /// Whether evaluation needs a die roll.
    pub fn needs_roll(&self) -> bool {
        match self {
            Self::Flat(_) => false,
            Self::Lookup(_) => true,
            Self::Dice(terms) => terms
                .iter()
                .any(|t| matches!(t, FormulaTerm::Dice { .. })),
        }
    }

    /// Substitute characteristic bonuses and return the remaining pure dice
    /// expression, ready for the external random source.
    ///
    /// Only meaningful for `Flat` and `Dice` formulas; lookup tables are
    /// evaluated against a d10 roll instead.
    pub fn substitute(
        &self,
        bonus_of: &dyn Fn(Characteristic) -> i32,
    ) -> Result<DiceExpression, DomainError> {
        match self {
            Self::Flat(value) => Ok(DiceExpression::constant(*value)),
            Self::Lookup(_) => Err(DomainError::constraint(
                "Lookup tables are evaluated against a d10 roll, not substituted",
            )),
            Self::Dice(terms) => {
                let substituted: Vec<DiceTerm> = terms
                    .iter()
                    .map(|term| match term {
                        FormulaTerm::Dice {
                            count,
                            size,
                            negated,
                        } => DiceTerm::Dice {
                            count: *count,
                            size: *size,
                            negated: *negated,
                        },
                        FormulaTerm::Modifier(m) => DiceTerm::Modifier(*m),
                        FormulaTerm::Bonus {
                            multiplier,
                            characteristic,
                            negated,
                        } => {
                            let value = multiplier * bonus_of(*characteristic);
                            DiceTerm::Modifier(if *negated { -value } else { value })
                        }
                    })
                    .collect();
                DiceExpression::from_terms(substituted)
                    .map_err(|e| DomainError::parse(e.to_string()))
            }
        }
    }
}

impl fmt::Display for ResourceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat(value) => write!(f, "{}", value),
            Self::Lookup(rows) => {
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "({}-{}|={})", row.min, row.max, row.value)?;
                }
                Ok(())
            }
            Self::Dice(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    let negated = match term {
                        FormulaTerm::Dice { negated, .. } => *negated,
                        FormulaTerm::Bonus { negated, .. } => *negated,
                        FormulaTerm::Modifier(m) => *m < 0,
                    };
                    if negated {
                        write!(f, "-")?;
                    } else if i > 0 {
                        write!(f, "+")?;
                    }
                    match term {
                        FormulaTerm::Dice { count, size, .. } => {
                            write!(f, "{}d{}", count, size)?
                        }
                        FormulaTerm::Modifier(m) => write!(f, "{}", m.abs())?,
                        FormulaTerm::Bonus {
                            multiplier,
                            characteristic,
                            ..
                        } => {
                            if *multiplier != 1 {
                                write!(f, "{}", multiplier)?;
                            }
                            write!(f, "{}", characteristic.bonus_token())?;
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat() {
        assert_eq!(ResourceFormula::parse("5").unwrap(), ResourceFormula::Flat(5));
        assert_eq!(
            ResourceFormula::parse(" 12 ").unwrap(),
            ResourceFormula::Flat(12)
        );
    }

    #[test]
    fn test_parse_lookup_table() {
        let formula = ResourceFormula::parse("(1-4|=2),(5-7|=3),(8-10|=4)").unwrap();
        let ResourceFormula::Lookup(rows) = &formula else {
            panic!("expected lookup");
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], LookupRow { min: 5, max: 7, value: 3 });
    }

    #[test]
    fn test_lookup_match() {
        let rows = vec![
            LookupRow { min: 1, max: 4, value: 2 },
            LookupRow { min: 5, max: 7, value: 3 },
            LookupRow { min: 8, max: 10, value: 4 },
        ];
        assert_eq!(LookupRow::match_roll(&rows, 6), Some(3));
        assert_eq!(LookupRow::match_roll(&rows, 1), Some(2));
        assert_eq!(LookupRow::match_roll(&rows, 10), Some(4));
        assert_eq!(LookupRow::match_roll(&rows, 11), None);
    }

    #[test]
    fn test_parse_lookup_errors() {
        assert!(ResourceFormula::parse("(1-4|=x)").is_err());
        assert!(ResourceFormula::parse("(4-1|=2)").is_err());
        assert!(ResourceFormula::parse("(14|=2)").is_err());
    }

    #[test]
    fn test_parse_dice_with_short_bonus_token() {
        let formula = ResourceFormula::parse("1d5+2tb").unwrap();
        let ResourceFormula::Dice(terms) = &formula else {
            panic!("expected dice");
        };
        assert_eq!(terms.len(), 2);
        assert_eq!(
            terms[1],
            FormulaTerm::Bonus {
                multiplier: 2,
                characteristic: Characteristic::Toughness,
                negated: false
            }
        );
    }

    #[test]
    fn test_parse_dice_with_long_bonus_token() {
        let formula = ResourceFormula::parse("1d5 + toughness-bonus").unwrap();
        let ResourceFormula::Dice(terms) = &formula else {
            panic!("expected dice");
        };
        assert_eq!(
            terms[1],
            FormulaTerm::Bonus {
                multiplier: 1,
                characteristic: Characteristic::Toughness,
                negated: false
            }
        );
    }

    #[test]
    fn test_parse_hyphenated_long_token_is_not_subtraction() {
        let formula = ResourceFormula::parse("weapon-skill-bonus+1").unwrap();
        let ResourceFormula::Dice(terms) = &formula else {
            panic!("expected dice");
        };
        assert_eq!(
            terms[0],
            FormulaTerm::Bonus {
                multiplier: 1,
                characteristic: Characteristic::WeaponSkill,
                negated: false
            }
        );
        assert_eq!(terms[1], FormulaTerm::Modifier(1));
    }

    #[test]
    fn test_parse_unknown_token_is_error() {
        assert!(ResourceFormula::parse("1d5+luck-bonus").is_err());
        assert!(ResourceFormula::parse("1d5+xyzzy").is_err());
    }

    #[test]
    fn test_flat_value() {
        assert_eq!(ResourceFormula::parse("3").unwrap().flat_value(), Some(3));
        assert_eq!(ResourceFormula::parse("1d5").unwrap().flat_value(), None);
        assert_eq!(ResourceFormula::parse("2tb").unwrap().flat_value(), None);
        assert_eq!(
            ResourceFormula::parse("(1-10|=1)").unwrap().flat_value(),
            None
        );
    }

    #[test]
    fn test_needs_roll() {
        assert!(!ResourceFormula::parse("4").unwrap().needs_roll());
        assert!(ResourceFormula::parse("1d10").unwrap().needs_roll());
        assert!(ResourceFormula::parse("(1-10|=1)").unwrap().needs_roll());
        // Bonus-only formulas are actor-dependent but need no die
        assert!(!ResourceFormula::parse("2tb").unwrap().needs_roll());
    }

    #[test]
    fn test_substitute_bonuses() {
        let formula = ResourceFormula::parse("1d5+2tb").unwrap();
        let expr = formula.substitute(&|c| if c == Characteristic::Toughness { 3 } else { 0 });
        let expr = expr.unwrap();
        // 1d5 + (2 x 3)
        assert_eq!(expr.to_string(), "1d5+6");
    }

    #[test]
    fn test_substitute_lookup_is_constraint_error() {
        let formula = ResourceFormula::parse("(1-10|=2)").unwrap();
        assert!(matches!(
            formula.substitute(&|_| 0),
            Err(DomainError::Constraint(_))
        ));
    }

    #[test]
    fn test_display_round_trip() {
        for input in ["5", "(1-4|=2),(5-7|=3)", "1d5+2tb", "2d10+1"] {
            let formula = ResourceFormula::parse(input).unwrap();
            let rendered = formula.to_string();
            assert_eq!(ResourceFormula::parse(&rendered).unwrap(), formula);
        }
    }
}
