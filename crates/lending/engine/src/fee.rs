//! Fee calculator: principal × term × rate table → [`LoanQuote`].
//!
//! For entries carrying a target total (the canonical 7/14/30 day policy),
//! the service, admin, and commitment rates are scaled by
//!
//! ```text
//! factor = (target_total - interest) / (service + admin + commitment)
//! ```
//!
//! using the unscaled base rates, so that interest plus the three scaled
//! fees equals the target. Entries without a target are applied as-is.

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use lending_types::{
    LendingError, LendingResult, LoanQuote, RateTable, TermDays, TermRates,
};

/// Effective (service, admin, commitment) rates after target scaling.
pub fn scaled_fee_rates(rates: &TermRates) -> (f64, f64, f64) {
    let mut service = rates.service_fee_rate_pct;
    let mut admin = rates.admin_fee_rate_pct;
    let mut commitment = rates.commitment_fee_rate_pct;

    if let Some(target_total) = rates.target_total_pct {
        let base_sum = service + admin + commitment;
        if base_sum > 0.0 {
            let target_other = target_total - rates.interest_rate_pct;
            let factor = target_other / base_sum;
            service *= factor;
            admin *= factor;
            commitment *= factor;
        }
    }

    (service, admin, commitment)
}

/// Quote with the due date anchored at the current time.
pub fn compute_quote(principal: f64, term: TermDays, table: &RateTable) -> LendingResult<LoanQuote> {
    compute_quote_at(principal, term, table, Utc::now())
}

/// Quote with an explicit clock. Identical inputs give identical output.
pub fn compute_quote_at(
    principal: f64,
    term: TermDays,
    table: &RateTable,
    now: DateTime<Utc>,
) -> LendingResult<LoanQuote> {
    if !principal.is_finite() || principal <= 0.0 {
        return Err(LendingError::InvalidPrincipal(principal));
    }

    let rates = table.resolve(term)?;
    rates.validate(term)?;

    let (service_rate, admin_rate, commitment_rate) = scaled_fee_rates(&rates);

    let interest_amount = principal * rates.interest_rate_pct / 100.0;
    let service_fee = principal * service_rate / 100.0;
    let admin_fee = principal * admin_rate / 100.0 + rates.admin_fee_flat;
    let commitment_fee = principal * commitment_rate / 100.0;

    let total_fees = interest_amount + service_fee + admin_fee + commitment_fee;
    let total_repayment = principal + total_fees;
    let due_date = Duration::try_days(i64::from(term.days()))
        .and_then(|days| now.checked_add_signed(days))
        .ok_or_else(|| LendingError::InvalidRateTable {
            term,
            reason: format!("due date {} days after {} is out of range", term.days(), now),
        })?;

    trace!(
        principal,
        term = %term,
        total_fees,
        total_repayment,
        "Computed loan quote"
    );

    Ok(LoanQuote {
        principal,
        term,
        interest_rate_pct: rates.interest_rate_pct,
        service_fee_rate_pct: service_rate,
        admin_fee_rate_pct: admin_rate,
        commitment_fee_rate_pct: commitment_rate,
        interest_amount,
        service_fee,
        admin_fee,
        commitment_fee,
        total_fees,
        total_repayment,
        due_date,
    })
}

/// Quotes against a fixed rate table.
///
/// Holds the table supplied by configuration so presentation code can
/// requote on every slider move without threading the table through.
#[derive(Clone, Debug, Default)]
pub struct FeeCalculator {
    table: RateTable,
}

impl FeeCalculator {
    pub fn new(table: RateTable) -> Self {
        Self { table }
    }

    /// Calculator using only the built-in policy.
    pub fn canonical() -> Self {
        Self::new(RateTable::canonical())
    }

    pub fn table(&self) -> &RateTable {
        &self.table
    }

    pub fn quote(&self, principal: f64, term: TermDays) -> LendingResult<LoanQuote> {
        compute_quote(principal, term, &self.table)
    }

    pub fn quote_at(
        &self,
        principal: f64,
        term: TermDays,
        now: DateTime<Utc>,
    ) -> LendingResult<LoanQuote> {
        compute_quote_at(principal, term, &self.table, now)
    }

    /// One quote per term, for the side-by-side term picker.
    ///
    /// Terms that fail to resolve are skipped.
    pub fn quote_terms(
        &self,
        principal: f64,
        terms: &[TermDays],
        now: DateTime<Utc>,
    ) -> Vec<LoanQuote> {
        terms
            .iter()
            .filter_map(|term| self.quote_at(principal, *term, now).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn seven_day_example() {
        let quote = compute_quote_at(100.0, TermDays::SEVEN, &RateTable::canonical(), fixed_now())
            .unwrap();
        assert_eq!(quote.interest_amount, 1.0);
        assert!(approx(
            quote.service_fee + quote.admin_fee + quote.commitment_fee,
            21.0
        ));
        assert!(approx(quote.total_fees, 22.0));
        assert!(approx(quote.total_repayment, 122.0));
        assert_eq!(format!("{:.2}", quote.total_repayment), "122.00");
    }

    #[test]
    fn thirty_day_example() {
        let quote = compute_quote_at(500.0, TermDays::THIRTY, &RateTable::canonical(), fixed_now())
            .unwrap();
        assert_eq!(quote.interest_amount, 20.0);
        assert!(approx(quote.total_fees, 150.0));
        assert!(approx(quote.total_repayment, 650.0));
        assert!(approx(quote.total_fee_rate_pct(), 30.0));
    }

    #[test]
    fn fourteen_day_scaling_keeps_base_proportions() {
        let quote = compute_quote_at(1000.0, TermDays::FOURTEEN, &RateTable::new(), fixed_now())
            .unwrap();
        // factor = (26 - 2) / 36
        let factor = 24.0 / 36.0;
        assert!(approx(quote.service_fee_rate_pct, 20.0 * factor));
        assert!(approx(quote.admin_fee_rate_pct, 10.0 * factor));
        assert!(approx(quote.commitment_fee_rate_pct, 6.0 * factor));
        assert!(approx(quote.total_fee_rate_pct(), 26.0));
    }

    #[test]
    fn due_date_is_term_days_out() {
        let quote = compute_quote_at(250.0, TermDays::FOURTEEN, &RateTable::canonical(), fixed_now())
            .unwrap();
        assert_eq!(quote.due_date, fixed_now() + Duration::days(14));
    }

    #[test]
    fn repayment_is_principal_plus_fees() {
        let quote = compute_quote_at(333.33, TermDays::SEVEN, &RateTable::canonical(), fixed_now())
            .unwrap();
        assert_eq!(quote.total_repayment, quote.principal + quote.total_fees);
    }

    #[test]
    fn unscaled_entry_with_flat_admin_fee() {
        let table = RateTable::new()
            .with(
                TermDays::SEVEN,
                TermRates::unscaled(5.0, 2.0, 0.0, 1.0).with_admin_fee_flat(5.0),
            )
            .unwrap();
        let quote = compute_quote_at(1000.0, TermDays::SEVEN, &table, fixed_now()).unwrap();
        assert_eq!(quote.interest_amount, 50.0);
        assert_eq!(quote.service_fee, 20.0);
        assert_eq!(quote.admin_fee, 5.0);
        assert_eq!(quote.commitment_fee, 10.0);
        assert_eq!(quote.total_fees, 85.0);
        assert_eq!(quote.total_repayment, 1085.0);
    }

    #[test]
    fn rejects_bad_principal() {
        let table = RateTable::canonical();
        for p in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let err = compute_quote_at(p, TermDays::SEVEN, &table, fixed_now()).unwrap_err();
            assert_eq!(err.code(), "INVALID_PRINCIPAL");
        }
    }

    #[test]
    fn rejects_unsupported_term() {
        let err = compute_quote_at(100.0, TermDays::new(21), &RateTable::canonical(), fixed_now())
            .unwrap_err();
        assert_eq!(err, LendingError::UnsupportedTerm(TermDays::new(21)));
    }

    #[test]
    fn huge_term_is_an_error_not_a_panic() {
        // Deserialized tables skip the insert-time cap.
        let table: RateTable = serde_json::from_str(
            r#"{"200000000": {"interest_rate_pct": 5.0, "service_fee_rate_pct": 2.0,
                "admin_fee_rate_pct": 0.0, "commitment_fee_rate_pct": 1.0}}"#,
        )
        .unwrap();
        let err = compute_quote_at(100.0, TermDays::new(200_000_000), &table, fixed_now())
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_RATE_TABLE");

        let err = compute_quote_at(
            100.0,
            TermDays::SEVEN,
            &RateTable::canonical(),
            DateTime::<Utc>::MAX_UTC,
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_RATE_TABLE");
    }

    #[test]
    fn calculator_quotes_each_term() {
        let calc = FeeCalculator::canonical();
        let quotes = calc.quote_terms(
            200.0,
            &[TermDays::SEVEN, TermDays::new(21), TermDays::THIRTY],
            fixed_now(),
        );
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].term, TermDays::SEVEN);
        assert_eq!(quotes[1].term, TermDays::THIRTY);
    }

    #[test]
    fn scaled_rates_without_target_are_untouched() {
        let rates = TermRates::unscaled(3.0, 4.0, 5.0, 6.0);
        assert_eq!(scaled_fee_rates(&rates), (4.0, 5.0, 6.0));
    }
}
