//! Dice rolling and notation parsing.
//!
//! Supports the strict `XdY+Z` notation used by combatant configuration,
//! plus advantage/disadvantage d20 rolls.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice notation parsing.
///
/// Malformed notation is a fatal configuration error: it signals bad input
/// data, not a recoverable condition.
#[derive(Debug, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
}

/// Advantage state for d20 rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Advantage {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl Advantage {
    /// Combine two advantage states (advantage + disadvantage = normal).
    pub fn combine(self, other: Advantage) -> Advantage {
        match (self, other) {
            (Advantage::Normal, x) | (x, Advantage::Normal) => x,
            (Advantage::Advantage, Advantage::Disadvantage) => Advantage::Normal,
            (Advantage::Disadvantage, Advantage::Advantage) => Advantage::Normal,
            (Advantage::Advantage, Advantage::Advantage) => Advantage::Advantage,
            (Advantage::Disadvantage, Advantage::Disadvantage) => Advantage::Disadvantage,
        }
    }

    /// Collapse an arbitrary set of sources. Any simultaneous advantage and
    /// disadvantage cancels to normal, regardless of how many sources of
    /// each are present.
    pub fn combine_all(sources: impl IntoIterator<Item = Advantage>) -> Advantage {
        let mut advantage = false;
        let mut disadvantage = false;
        for source in sources {
            match source {
                Advantage::Advantage => advantage = true,
                Advantage::Disadvantage => disadvantage = true,
                Advantage::Normal => {}
            }
        }
        match (advantage, disadvantage) {
            (true, false) => Advantage::Advantage,
            (false, true) => Advantage::Disadvantage,
            _ => Advantage::Normal,
        }
    }
}

/// A parsed dice expression (e.g., `2d6+3`).
///
/// Serializes as the notation string, so configuration files carry plain
/// `"2d6+3"` values and parsing happens during deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceNotation {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceNotation {
    /// Parse strict `XdY`, `XdY+Z`, or `XdY-Z` notation.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let s = notation.trim();
        let err = || DiceError::InvalidNotation(notation.to_string());

        let d_pos = s.find('d').ok_or_else(err)?;
        let count_str = &s[..d_pos];
        let rest = &s[d_pos + 1..];

        let (sides_str, modifier) = match rest.find(['+', '-']) {
            Some(sign_pos) => {
                let value: i32 = rest[sign_pos + 1..].parse().map_err(|_| err())?;
                let sign = if rest.as_bytes()[sign_pos] == b'+' { 1 } else { -1 };
                (&rest[..sign_pos], sign * value)
            }
            None => (rest, 0),
        };

        if count_str.is_empty() || sides_str.is_empty() {
            return Err(err());
        }
        let count: u32 = count_str.parse().map_err(|_| err())?;
        let sides: u32 = sides_str.parse().map_err(|_| err())?;
        if count == 0 || sides == 0 {
            return Err(err());
        }

        Ok(DiceNotation {
            count,
            sides,
            modifier,
        })
    }

    /// Roll the expression.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> i32 {
        self.roll_damage(false, rng)
    }

    /// Roll as damage. A critical hit doubles the number of dice rolled,
    /// never the flat modifier.
    pub fn roll_damage<R: Rng>(&self, critical: bool, rng: &mut R) -> i32 {
        let count = if critical { self.count * 2 } else { self.count };
        let dice: i32 = (0..count).map(|_| roll_die(self.sides, rng) as i32).sum();
        dice + self.modifier
    }

    /// Expected value of the expression.
    pub fn average(&self) -> f64 {
        self.count as f64 * (self.sides as f64 + 1.0) / 2.0 + self.modifier as f64
    }

    /// The same expression with extra dice of the same size added.
    pub fn with_extra_dice(&self, extra: u32) -> DiceNotation {
        DiceNotation {
            count: self.count + extra,
            ..*self
        }
    }

    /// The same expression with the dice count multiplied (cantrip scaling).
    pub fn with_count_multiplier(&self, multiplier: u32) -> DiceNotation {
        DiceNotation {
            count: self.count * multiplier,
            ..*self
        }
    }
}

impl FromStr for DiceNotation {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceNotation::parse(s)
    }
}

impl TryFrom<String> for DiceNotation {
    type Error = DiceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        DiceNotation::parse(&s)
    }
}

impl From<DiceNotation> for String {
    fn from(n: DiceNotation) -> String {
        n.to_string()
    }
}

impl fmt::Display for DiceNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier.cmp(&0) {
            std::cmp::Ordering::Greater => write!(f, "+{}", self.modifier),
            std::cmp::Ordering::Less => write!(f, "{}", self.modifier),
            std::cmp::Ordering::Equal => Ok(()),
        }
    }
}

/// Roll a single die, uniform in `[1, sides]`.
pub fn roll_die<R: Rng>(sides: u32, rng: &mut R) -> u32 {
    rng.gen_range(1..=sides)
}

/// Roll a d20 with advantage/disadvantage, returning the natural roll.
pub fn roll_d20<R: Rng>(advantage: Advantage, rng: &mut R) -> u32 {
    let first = roll_die(20, rng);
    match advantage {
        Advantage::Normal => first,
        Advantage::Advantage => first.max(roll_die(20, rng)),
        Advantage::Disadvantage => first.min(roll_die(20, rng)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_parse_simple() {
        let n = DiceNotation::parse("2d6+3").unwrap();
        assert_eq!(n.count, 2);
        assert_eq!(n.sides, 6);
        assert_eq!(n.modifier, 3);
    }

    #[test]
    fn test_parse_negative_modifier() {
        let n = DiceNotation::parse("1d8-1").unwrap();
        assert_eq!(n.modifier, -1);
    }

    #[test]
    fn test_parse_no_modifier() {
        let n = DiceNotation::parse("3d4").unwrap();
        assert_eq!(n.count, 3);
        assert_eq!(n.sides, 4);
        assert_eq!(n.modifier, 0);
    }

    #[test]
    fn test_parse_rejects_shorthand() {
        // The dice count is mandatory: "d20" is bad configuration.
        assert!(DiceNotation::parse("d20").is_err());
        assert!(DiceNotation::parse("2d").is_err());
        assert!(DiceNotation::parse("garbage").is_err());
        assert!(DiceNotation::parse("2d6+").is_err());
        assert!(DiceNotation::parse("0d6").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for s in ["2d6+3", "1d8-1", "3d4"] {
            assert_eq!(DiceNotation::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_roll_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let n = DiceNotation::parse("1d20").unwrap();
        for _ in 0..100 {
            let total = n.roll(&mut rng);
            assert!((1..=20).contains(&total));
        }
    }

    #[test]
    fn test_critical_doubles_dice_not_modifier() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let n = DiceNotation::parse("1d6+2").unwrap();
        let normal: i32 = (0..1000).map(|_| n.roll_damage(false, &mut rng)).sum();
        let critical: i32 = (0..1000).map(|_| n.roll_damage(true, &mut rng)).sum();
        assert!(critical > normal);
        // Critical range is 2..=12 plus the flat 2, never 2x the modifier.
        for _ in 0..100 {
            let total = n.roll_damage(true, &mut rng);
            assert!((4..=14).contains(&total));
        }
    }

    #[test]
    fn test_advantage_combine() {
        assert_eq!(
            Advantage::Normal.combine(Advantage::Advantage),
            Advantage::Advantage
        );
        assert_eq!(
            Advantage::Advantage.combine(Advantage::Disadvantage),
            Advantage::Normal
        );
        assert_eq!(
            Advantage::Disadvantage.combine(Advantage::Disadvantage),
            Advantage::Disadvantage
        );
    }

    #[test]
    fn test_combine_all_cancels() {
        let combined = Advantage::combine_all([
            Advantage::Advantage,
            Advantage::Normal,
            Advantage::Disadvantage,
            Advantage::Advantage,
        ]);
        assert_eq!(combined, Advantage::Normal);
    }

    #[test]
    fn test_d20_advantage_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            let roll = roll_d20(Advantage::Advantage, &mut rng);
            assert!((1..=20).contains(&roll));
        }
    }

    #[test]
    fn test_average() {
        let n = DiceNotation::parse("2d6+3").unwrap();
        assert!((n.average() - 10.0).abs() < f64::EPSILON);
    }
}
