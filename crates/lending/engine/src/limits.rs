//! Level limits: bounds a requested principal and term by the user's level.

use tracing::debug;

use lending_types::{LendingError, LendingResult, LoanLevel, TermDays};

/// Validates requests against a [`LoanLevel`].
#[derive(Debug, Clone)]
pub struct LevelLimitValidator;

impl LevelLimitValidator {
    /// `Ok` iff `level.min_amount <= principal <= level.max_amount`.
    pub fn validate(principal: f64, level: &LoanLevel) -> LendingResult<()> {
        if level.min_amount <= principal && principal <= level.max_amount {
            return Ok(());
        }
        debug!(
            principal,
            min = level.min_amount,
            max = level.max_amount,
            level = level.level_number,
            "Principal outside level bounds"
        );
        Err(LendingError::OutOfRange {
            principal,
            min: level.min_amount,
            max: level.max_amount,
        })
    }

    /// The level must offer the term.
    pub fn validate_term(term: TermDays, level: &LoanLevel) -> LendingResult<()> {
        if level.offers_term(term) {
            Ok(())
        } else {
            Err(LendingError::TermNotAvailable {
                term,
                level: level.level_number,
            })
        }
    }

    /// Amount and term checks together, amount first.
    pub fn validate_request(principal: f64, term: TermDays, level: &LoanLevel) -> LendingResult<()> {
        Self::validate(principal, level)?;
        Self::validate_term(term, level)
    }

    /// Clamp a slider value into the level's bounds.
    pub fn clamp(principal: f64, level: &LoanLevel) -> f64 {
        if principal.is_nan() {
            return level.min_amount;
        }
        principal.max(level.min_amount).min(level.max_amount)
    }

    /// Highest level a user with `completed_loans` has unlocked.
    pub fn eligible_level(completed_loans: u32, levels: &[LoanLevel]) -> Option<&LoanLevel> {
        levels
            .iter()
            .filter(|level| level.min_loans_required <= completed_loans)
            .max_by_key(|level| level.level_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level() -> LoanLevel {
        LoanLevel::new(1, "Starter", 100.0, 5000.0)
    }

    #[test]
    fn within_bounds_inclusive() {
        assert!(LevelLimitValidator::validate(100.0, &level()).is_ok());
        assert!(LevelLimitValidator::validate(5000.0, &level()).is_ok());
        assert!(LevelLimitValidator::validate(2500.0, &level()).is_ok());
    }

    #[test]
    fn above_max_is_out_of_range() {
        let err = LevelLimitValidator::validate(6000.0, &level()).unwrap_err();
        assert_eq!(
            err,
            LendingError::OutOfRange {
                principal: 6000.0,
                min: 100.0,
                max: 5000.0
            }
        );
        assert_eq!(err.code(), "OUT_OF_RANGE");
    }

    #[test]
    fn below_min_and_nan_are_out_of_range() {
        assert!(LevelLimitValidator::validate(99.99, &level()).is_err());
        assert!(LevelLimitValidator::validate(f64::NAN, &level()).is_err());
    }

    #[test]
    fn term_availability() {
        let level = level().with_terms([TermDays::SEVEN, TermDays::FOURTEEN]);
        assert!(LevelLimitValidator::validate_term(TermDays::SEVEN, &level).is_ok());
        let err = LevelLimitValidator::validate_term(TermDays::THIRTY, &level).unwrap_err();
        assert_eq!(err.code(), "TERM_NOT_AVAILABLE");

        let err =
            LevelLimitValidator::validate_request(9000.0, TermDays::THIRTY, &level).unwrap_err();
        assert_eq!(err.code(), "OUT_OF_RANGE");
    }

    #[test]
    fn clamp_to_bounds() {
        assert_eq!(LevelLimitValidator::clamp(50.0, &level()), 100.0);
        assert_eq!(LevelLimitValidator::clamp(7000.0, &level()), 5000.0);
        assert_eq!(LevelLimitValidator::clamp(1200.0, &level()), 1200.0);
        assert_eq!(LevelLimitValidator::clamp(f64::NAN, &level()), 100.0);
    }

    #[test]
    fn eligible_level_progression() {
        let levels = vec![
            LoanLevel::new(1, "Bronze", 100.0, 500.0),
            LoanLevel::new(2, "Silver", 100.0, 2000.0).with_min_loans_required(2),
            LoanLevel::new(3, "Gold", 100.0, 5000.0).with_min_loans_required(5),
        ];
        assert_eq!(
            LevelLimitValidator::eligible_level(0, &levels).map(|l| l.level_number),
            Some(1)
        );
        assert_eq!(
            LevelLimitValidator::eligible_level(3, &levels).map(|l| l.level_number),
            Some(2)
        );
        assert_eq!(
            LevelLimitValidator::eligible_level(12, &levels).map(|l| l.level_number),
            Some(3)
        );
        assert!(LevelLimitValidator::eligible_level(0, &[]).is_none());
    }
}
