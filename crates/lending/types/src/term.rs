use serde::{Deserialize, Serialize};

/// Loan duration in days.
///
/// The canonical product offers 7, 14, and 30 day terms, but any positive
/// day count is representable so that a backend-supplied rate table can
/// introduce new terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermDays(pub u32);

impl TermDays {
    pub const SEVEN: TermDays = TermDays(7);
    pub const FOURTEEN: TermDays = TermDays(14);
    pub const THIRTY: TermDays = TermDays(30);

    /// The terms with built-in policy rates.
    pub const CANONICAL: [TermDays; 3] = [Self::SEVEN, Self::FOURTEEN, Self::THIRTY];

    /// Longest term a rate table accepts (ten years).
    pub const MAX: TermDays = TermDays(3650);

    pub const fn new(days: u32) -> Self {
        Self(days)
    }

    pub const fn days(&self) -> u32 {
        self.0
    }

    pub fn is_canonical(&self) -> bool {
        Self::CANONICAL.contains(self)
    }

    /// Human label sent as the `duration` field of an application.
    pub fn label(&self) -> String {
        if self.0 == 1 {
            "1 day".to_string()
        } else {
            format!("{} days", self.0)
        }
    }
}

impl std::fmt::Display for TermDays {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}d", self.0)
    }
}

impl std::str::FromStr for TermDays {
    type Err = std::num::ParseIntError;

    /// Accepts `"14"` as well as the `"14d"` display form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_suffix('d').unwrap_or(trimmed);
        digits.parse::<u32>().map(TermDays)
    }
}

impl From<u32> for TermDays {
    fn from(days: u32) -> Self {
        Self(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_terms() {
        assert!(TermDays::SEVEN.is_canonical());
        assert!(TermDays::THIRTY.is_canonical());
        assert!(!TermDays::new(21).is_canonical());
    }

    #[test]
    fn display_and_parse() {
        assert_eq!(TermDays::FOURTEEN.to_string(), "14d");
        assert_eq!("14d".parse::<TermDays>().unwrap(), TermDays::FOURTEEN);
        assert_eq!(" 30 ".parse::<TermDays>().unwrap(), TermDays::THIRTY);
        assert!("two weeks".parse::<TermDays>().is_err());
    }

    #[test]
    fn label_matches_duration_field() {
        assert_eq!(TermDays::SEVEN.label(), "7 days");
        assert_eq!(TermDays::new(1).label(), "1 day");
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&TermDays::THIRTY).unwrap();
        assert_eq!(json, "30");
        let back: TermDays = serde_json::from_str("7").unwrap();
        assert_eq!(back, TermDays::SEVEN);
    }
}
