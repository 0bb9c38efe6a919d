//! Version identifiers
//!
//! Firmware versions are named `<year>w<week><letter>` (e.g. `25w47a`).
//! [`VersionKey`] orders them numerically by year and week, then by the
//! trailing letters.

use std::cmp::Ordering;
use std::fmt;

/// Letter assumed when an identifier has none
const DEFAULT_LETTER: &str = "a";

/// Sort key derived from a version identifier
///
/// Identifiers that do not follow the naming scheme map to the minimal
/// key `(0, 0, "a")` and order before every well-formed identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionKey {
    well_formed: bool,
    pub year: u32,
    pub week: u32,
    pub letter: String,
}

impl VersionKey {
    pub fn minimal() -> Self {
        Self {
            well_formed: false,
            year: 0,
            week: 0,
            letter: DEFAULT_LETTER.to_string(),
        }
    }

    pub fn parse(identifier: &str) -> Self {
        Self::try_parse(identifier).unwrap_or_else(Self::minimal)
    }

    fn try_parse(identifier: &str) -> Option<Self> {
        let lower = identifier.to_lowercase();
        let mut parts = lower.split('w');
        let year_part = parts.next()?;
        // only the text between the first and second 'w' counts
        let week_part = parts.next()?;

        let year = year_part.trim().parse::<u32>().ok()?;
        let digits: String = week_part.chars().filter(|c| c.is_ascii_digit()).collect();
        let week = digits.parse::<u32>().ok()?;
        let letter: String = week_part.chars().filter(|c| c.is_alphabetic()).collect();

        Some(Self {
            well_formed: true,
            year,
            week,
            letter: if letter.is_empty() {
                DEFAULT_LETTER.to_string()
            } else {
                letter
            },
        })
    }

    pub fn is_well_formed(&self) -> bool {
        self.well_formed
    }
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.well_formed
            .cmp(&other.well_formed)
            .then(self.year.cmp(&other.year))
            .then(self.week.cmp(&other.week))
            .then_with(|| self.letter.cmp(&other.letter))
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.year, self.week, self.letter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> VersionKey {
        VersionKey::parse(s)
    }

    #[test]
    fn test_parse_components() {
        let k = key("25w47b");
        assert!(k.is_well_formed());
        assert_eq!((k.year, k.week, k.letter.as_str()), (25, 47, "b"));
    }

    #[test]
    fn test_letter_defaults_to_a() {
        assert_eq!(key("25w47").letter, "a");
        assert_eq!(key("25w47"), key("25w47a"));
    }

    #[test]
    fn test_uppercase_w_accepted() {
        assert_eq!(key("25W47A"), key("25w47a"));
    }

    #[test]
    fn test_numeric_not_lexical_ordering() {
        assert!(key("25w9a") < key("25w10a"));
        assert!(key("9w50a") < key("10w1a"));
        assert!(key("25w47a") < key("25w47b"));
        assert!(key("25w47b") < key("25w48a"));
        assert!(key("25w48a") < key("25w50a"));
    }

    #[test]
    fn test_malformed_sorts_first() {
        for bad in ["", "1.2.3", "release", "xw12", "25w", "v1"] {
            let k = key(bad);
            assert!(!k.is_well_formed(), "{bad} should be malformed");
            assert_eq!(k, VersionKey::minimal());
            assert!(k < key("0w0a"));
            assert!(k < key("25w1a"));
        }
    }

    #[test]
    fn test_only_first_segment_after_w_counts() {
        let k = key("25w4w7");
        assert_eq!((k.year, k.week), (25, 4));
    }

    #[test]
    fn test_display() {
        assert_eq!(key("25w47").to_string(), "(25, 47, a)");
    }
}
